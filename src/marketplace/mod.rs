pub mod commands;
pub mod model;

pub use commands::{create_bid, create_listing, send_message};
pub use model::{
    Bid, BidStatus, Category, Image, ImageUpload, Listing, ListingStatus, Message, NewBid,
    NewImage, NewListing, NewMessage, Profile,
};
