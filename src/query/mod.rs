pub mod handlers;
pub mod queries;

pub use handlers::{
    fetch_listing, fetch_listings, fetch_messages, fetch_user_bids, fetch_user_listings,
};
