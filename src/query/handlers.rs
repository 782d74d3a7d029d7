// region:    --- Imports
use super::queries;
use crate::backend::{decode, decode_all, Backend};
use crate::error::MarketResult;
use crate::marketplace::model::{Bid, Category, Listing, Message};
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// Active listings, optionally narrowed to one category
pub async fn fetch_listings(
    backend: &Backend,
    category: Option<Category>,
) -> MarketResult<Vec<Listing>> {
    info!("{:<12} --> listings category: {:?}", "Query", category);
    let rows = backend
        .store()
        .select(&queries::active_listings(category))
        .await?;
    decode_all(rows)
}

/// Listing detail
pub async fn fetch_listing(backend: &Backend, listing_id: &str) -> MarketResult<Listing> {
    info!("{:<12} --> listing id: {}", "Query", listing_id);
    let row = backend
        .store()
        .select_one(&queries::listing_detail(listing_id))
        .await?;
    decode(row)
}

/// Messages on a listing to or from the user
pub async fn fetch_messages(
    backend: &Backend,
    listing_id: &str,
    user_id: &str,
) -> MarketResult<Vec<Message>> {
    info!(
        "{:<12} --> messages listing: {}, user: {}",
        "Query", listing_id, user_id
    );
    let rows = backend
        .store()
        .select(&queries::listing_messages(listing_id, user_id))
        .await?;
    decode_all(rows)
}

/// Listings posted by the user
pub async fn fetch_user_listings(backend: &Backend, user_id: &str) -> MarketResult<Vec<Listing>> {
    info!("{:<12} --> user listings: {}", "Query", user_id);
    let rows = backend
        .store()
        .select(&queries::user_listings(user_id))
        .await?;
    decode_all(rows)
}

/// Bids placed by the user
pub async fn fetch_user_bids(backend: &Backend, user_id: &str) -> MarketResult<Vec<Bid>> {
    info!("{:<12} --> user bids: {}", "Query", user_id);
    let rows = backend.store().select(&queries::user_bids(user_id)).await?;
    decode_all(rows)
}

// endregion: --- Query Handlers
