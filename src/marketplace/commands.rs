/// Mutations against the hosted store
/// 1. Post a listing (with images)
/// 2. Place a bid
/// 3. Message a seller
// region:    --- Imports
use super::model::{
    Bid, Image, ImageUpload, Listing, Message, NewBid, NewImage, NewListing, NewMessage,
};
use crate::backend::{decode, encode, Backend};
use crate::error::{MarketError, MarketResult};
use crate::query::queries::{BIDS, IMAGES, LISTINGS, MESSAGES};
use futures::future::join_all;
use tracing::{error, info, warn};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Commands

/// Image that could not be attached; `uploaded` is set when the blob landed
/// but its row did not.
struct FailedImage {
    uploaded: Option<String>,
    error: MarketError,
}

/// 1. Post a listing
///
/// Inserts the listing row, then uploads every image under
/// `<listing id>/<random name>` and records an image row for it. Uploads run
/// concurrently and all of them settle before this returns. If any image
/// fails, the listing, its image rows and the uploaded blobs are removed again
/// and the image error is returned; if that cleanup fails too the error is
/// [`MarketError::IncompleteListing`].
pub async fn create_listing(
    backend: &Backend,
    fields: NewListing,
    images: Vec<ImageUpload>,
) -> MarketResult<Listing> {
    info!(
        "{:<12} --> create listing: {:?} with {} image(s)",
        "Command",
        fields.title,
        images.len()
    );
    fields.validate()?;

    let row = backend.store().insert(LISTINGS, encode(&fields)?).await?;
    let mut listing: Listing = decode(row)?;

    let attempts = join_all(
        images
            .into_iter()
            .map(|image| attach_image(backend, &listing.id, image)),
    )
    .await;

    let mut attached = Vec::new();
    let mut uploaded = Vec::new();
    let mut failure = None;
    for attempt in attempts {
        match attempt {
            Ok(image) => {
                uploaded.push(image.url.clone());
                attached.push(image);
            }
            Err(failed) => {
                uploaded.extend(failed.uploaded);
                failure.get_or_insert(failed.error);
            }
        }
    }

    if let Some(error) = failure {
        error!(
            "{:<12} --> image attach failed for listing {}: {}",
            "Command", listing.id, error
        );
        return Err(roll_back_listing(backend, &listing.id, &uploaded, error).await);
    }

    info!(
        "{:<12} --> listing {} created with {} image(s)",
        "Command",
        listing.id,
        attached.len()
    );
    listing.images = Some(attached);
    Ok(listing)
}

async fn attach_image(
    backend: &Backend,
    listing_id: &str,
    image: ImageUpload,
) -> Result<Image, FailedImage> {
    let path = format!("{}/{}", listing_id, Uuid::new_v4().simple());
    let stored = backend
        .objects()
        .upload(&path, image.bytes, &image.content_type)
        .await
        .map_err(|error| FailedImage {
            uploaded: None,
            error,
        })?;

    let row = NewImage {
        listing_id: listing_id.to_string(),
        url: stored.clone(),
    };
    let inserted = match encode(&row) {
        Ok(value) => backend.store().insert(IMAGES, value).await,
        Err(e) => Err(e),
    };
    inserted
        .and_then(decode::<Image>)
        .map_err(|error| FailedImage {
            uploaded: Some(stored),
            error,
        })
}

/// Undo a half-created listing. Returns the error to surface.
async fn roll_back_listing(
    backend: &Backend,
    listing_id: &str,
    uploaded: &[String],
    cause: MarketError,
) -> MarketError {
    warn!("{:<12} --> rolling back listing {}", "Command", listing_id);

    let mut problems = Vec::new();
    if let Err(e) = backend.store().delete(IMAGES, "listing_id", listing_id).await {
        problems.push(format!("image rows: {}", e));
    }
    if let Err(e) = backend.objects().remove(uploaded).await {
        problems.push(format!("blobs: {}", e));
    }
    if let Err(e) = backend.store().delete(LISTINGS, "id", listing_id).await {
        problems.push(format!("listing row: {}", e));
    }

    if problems.is_empty() {
        return cause;
    }
    error!(
        "{:<12} --> rollback of listing {} incomplete: {:?}",
        "Command", listing_id, problems
    );
    MarketError::IncompleteListing {
        listing_id: listing_id.to_string(),
        reason: format!("{}; cleanup failed ({})", cause, problems.join(", ")),
    }
}

/// 2. Place a bid
pub async fn create_bid(backend: &Backend, bid: NewBid) -> MarketResult<Bid> {
    info!(
        "{:<12} --> bid {} on listing {} by {}",
        "Command", bid.amount, bid.listing_id, bid.bidder_id
    );
    let row = backend.store().insert(BIDS, encode(&bid)?).await?;
    decode(row)
}

/// 3. Message a seller
pub async fn send_message(backend: &Backend, message: NewMessage) -> MarketResult<Message> {
    info!(
        "{:<12} --> message on listing {} from {} to {}",
        "Command", message.listing_id, message.sender_id, message.receiver_id
    );
    let row = backend.store().insert(MESSAGES, encode(&message)?).await?;
    decode(row)
}

// endregion: --- Commands
