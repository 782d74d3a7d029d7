use crate::backend::{Join, Query};
use crate::marketplace::model::{Category, ListingStatus};

pub const LISTINGS: &str = "listings";
pub const IMAGES: &str = "images";
pub const BIDS: &str = "bids";
pub const MESSAGES: &str = "messages";
pub const PROFILES: &str = "profiles";

fn seller() -> Join {
    Join::one("seller", PROFILES, "seller_id")
}

/// Oldest first, so the first image is the primary one
fn images() -> Join {
    Join::many("images", IMAGES, "listing_id").ordered("created_at", true)
}

fn bids() -> Join {
    Join::many("bids", BIDS, "listing_id")
}

/// Active listings with seller, images and bids, newest first
pub fn active_listings(category: Option<Category>) -> Query {
    let query = Query::table(LISTINGS)
        .join(seller())
        .join(images())
        .join(bids())
        .eq("status", ListingStatus::Active.as_str())
        .order("created_at", false);

    match category {
        Some(category) => query.eq("category", category),
        None => query,
    }
}

/// One listing; bids carry their bidder
pub fn listing_detail(listing_id: &str) -> Query {
    Query::table(LISTINGS)
        .join(seller())
        .join(images())
        .join(bids().with(Join::one("bidder", PROFILES, "bidder_id")))
        .eq("id", listing_id)
}

/// Conversation on a listing that involves the user, oldest first
pub fn listing_messages(listing_id: &str, user_id: &str) -> Query {
    Query::table(MESSAGES)
        .join(Join::one("sender", PROFILES, "sender_id"))
        .join(Join::one("receiver", PROFILES, "receiver_id"))
        .eq("listing_id", listing_id)
        .any_of([("sender_id", user_id), ("receiver_id", user_id)])
        .order("created_at", true)
}

/// Seller's own listings, any status
pub fn user_listings(user_id: &str) -> Query {
    Query::table(LISTINGS)
        .join(images())
        .join(bids())
        .eq("seller_id", user_id)
        .order("created_at", false)
}

/// Bidder's bids with the listing they target
pub fn user_bids(user_id: &str) -> Query {
    Query::table(BIDS)
        .join(Join::one("listing", LISTINGS, "listing_id"))
        .eq("bidder_id", user_id)
        .order("created_at", false)
}
