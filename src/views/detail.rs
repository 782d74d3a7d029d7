//! Listing detail page: shows one listing and lets a signed-in buyer bid on
//! it or message its seller.

// region:    --- Imports
use super::home::ListingCard;
use crate::backend::{Backend, User};
use crate::error::{MarketError, MarketResult};
use crate::marketplace::commands::{create_bid, send_message};
use crate::marketplace::model::{Bid, Listing, Message, NewBid, NewMessage};
use crate::query::fetch_listing;
use serde::Serialize;
use tracing::{error, info, warn};

// endregion: --- Imports

// region:    --- Phase & Notice

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailPhase {
    Loading,
    Loaded,
    BidSubmitting,
    MessageSubmitting,
    /// Terminal.
    NotFound,
}

/// User-facing outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Notice {
    Success(String),
    Error(String),
}

// endregion: --- Phase & Notice

/// Parses a bid amount typed by the user. Only finite, strictly positive
/// numbers pass; nothing is sent to the store otherwise.
pub fn parse_bid_amount(input: &str) -> MarketResult<f64> {
    let amount: f64 = input
        .trim()
        .parse()
        .map_err(|_| MarketError::Validation(format!("not a number: {:?}", input)))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(MarketError::Validation(format!(
            "bid must be a positive amount, got {:?}",
            input
        )));
    }
    Ok(amount)
}

// region:    --- Listing Detail

#[derive(Debug, Clone, Serialize)]
pub struct DetailSnapshot {
    pub phase: DetailPhase,
    pub listing: Option<ListingCard>,
    /// Bid and message forms are shown only when this is set.
    pub can_interact: bool,
    pub bid_input: String,
    pub message_input: String,
    pub notice: Option<Notice>,
}

#[derive(Debug)]
pub struct ListingDetail {
    listing_id: String,
    listing: Option<Listing>,
    phase: DetailPhase,
    notice: Option<Notice>,
    pub bid_input: String,
    pub message_input: String,
}

impl ListingDetail {
    pub fn new(listing_id: &str) -> Self {
        Self {
            listing_id: listing_id.to_string(),
            listing: None,
            phase: DetailPhase::Loading,
            notice: None,
            bid_input: String::new(),
            message_input: String::new(),
        }
    }

    pub fn phase(&self) -> DetailPhase {
        self.phase
    }

    pub fn listing(&self) -> Option<&Listing> {
        self.listing.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Initial fetch. Any failure is terminal.
    pub async fn load(&mut self, backend: &Backend) -> MarketResult<()> {
        if self.phase == DetailPhase::NotFound {
            return Err(MarketError::NotFound(format!("listing {}", self.listing_id)));
        }
        self.phase = DetailPhase::Loading;
        match fetch_listing(backend, &self.listing_id).await {
            Ok(listing) => {
                self.listing = Some(listing);
                self.phase = DetailPhase::Loaded;
                Ok(())
            }
            Err(e) => {
                error!("{:<12} --> error loading listing {}: {}", "Detail", self.listing_id, e);
                self.listing = None;
                self.phase = DetailPhase::NotFound;
                self.notice = Some(Notice::Error("Failed to load listing".to_string()));
                Err(e)
            }
        }
    }

    /// Signed in, not the seller, and the listing is on screen.
    pub fn can_interact(&self, user: Option<&User>) -> bool {
        match (user, &self.listing) {
            (Some(user), Some(listing)) => {
                self.phase == DetailPhase::Loaded && !listing.is_owned_by(&user.id)
            }
            _ => false,
        }
    }

    fn guard(&self, user: Option<&User>) -> MarketResult<(User, Listing)> {
        let user = user.ok_or(MarketError::Unauthenticated)?;
        let listing = match (&self.listing, self.phase) {
            (Some(listing), DetailPhase::Loaded) => listing,
            _ => {
                return Err(MarketError::NotPermitted(
                    "listing is not loaded".to_string(),
                ))
            }
        };
        if listing.is_owned_by(&user.id) {
            return Err(MarketError::NotPermitted(
                "sellers cannot bid on or message their own listing".to_string(),
            ));
        }
        Ok((user.clone(), listing.clone()))
    }

    /// Places a bid from `bid_input`; on success clears the input and
    /// re-fetches the listing so the new bid shows.
    pub async fn submit_bid(&mut self, backend: &Backend, user: Option<&User>) -> MarketResult<Bid> {
        let (user, listing) = self.guard(user)?;
        let amount = match parse_bid_amount(&self.bid_input) {
            Ok(amount) => amount,
            Err(e) => {
                self.notice = Some(Notice::Error("Please enter a valid bid amount".to_string()));
                return Err(e);
            }
        };

        self.phase = DetailPhase::BidSubmitting;
        let result = create_bid(backend, NewBid::new(&listing.id, &user.id, amount)).await;
        self.phase = DetailPhase::Loaded;

        match result {
            Ok(bid) => {
                info!("{:<12} --> bid {} placed on {}", "Detail", bid.id, listing.id);
                self.bid_input.clear();
                self.notice = Some(Notice::Success("Bid placed successfully".to_string()));
                self.refresh(backend).await;
                Ok(bid)
            }
            Err(e) => {
                error!("{:<12} --> error placing bid: {}", "Detail", e);
                self.notice = Some(Notice::Error("Failed to place bid".to_string()));
                Err(e)
            }
        }
    }

    /// Sends `message_input` to the seller; on success clears the input.
    pub async fn submit_message(
        &mut self,
        backend: &Backend,
        user: Option<&User>,
    ) -> MarketResult<Message> {
        let (user, listing) = self.guard(user)?;
        if self.message_input.trim().is_empty() {
            self.notice = Some(Notice::Error("Please enter a message".to_string()));
            return Err(MarketError::Validation("message is empty".to_string()));
        }

        self.phase = DetailPhase::MessageSubmitting;
        let message = NewMessage {
            sender_id: user.id.clone(),
            receiver_id: listing.seller_id.clone(),
            listing_id: listing.id.clone(),
            content: self.message_input.clone(),
        };
        let result = send_message(backend, message).await;
        self.phase = DetailPhase::Loaded;

        match result {
            Ok(message) => {
                self.message_input.clear();
                self.notice = Some(Notice::Success("Message sent successfully".to_string()));
                Ok(message)
            }
            Err(e) => {
                error!("{:<12} --> error sending message: {}", "Detail", e);
                self.notice = Some(Notice::Error("Failed to send message".to_string()));
                Err(e)
            }
        }
    }

    /// Re-fetch after a mutation; keeps the shown listing if it fails.
    async fn refresh(&mut self, backend: &Backend) {
        match fetch_listing(backend, &self.listing_id).await {
            Ok(listing) => self.listing = Some(listing),
            Err(e) => warn!("{:<12} --> refresh of {} failed: {}", "Detail", self.listing_id, e),
        }
    }

    pub fn snapshot(&self, backend: &Backend, user: Option<&User>) -> DetailSnapshot {
        DetailSnapshot {
            phase: self.phase,
            listing: self
                .listing
                .as_ref()
                .map(|listing| ListingCard::new(backend, listing)),
            can_interact: self.can_interact(user),
            bid_input: self.bid_input.clone(),
            message_input: self.message_input.clone(),
            notice: self.notice.clone(),
        }
    }
}

// endregion: --- Listing Detail

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bid_amount_rejects_bad_input() {
        for input in ["abc", "-5", "0", "", "NaN", "inf", "-0.0"] {
            assert!(
                matches!(parse_bid_amount(input), Err(MarketError::Validation(_))),
                "{:?} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_bid_amount_accepts_decimal() {
        assert_eq!(parse_bid_amount("12.50").unwrap(), 12.5);
        assert_eq!(parse_bid_amount(" 25 ").unwrap(), 25.0);
    }

    #[test]
    fn test_new_detail_starts_loading() {
        let detail = ListingDetail::new("l-1");
        assert_eq!(detail.phase(), DetailPhase::Loading);
        assert!(detail.listing().is_none());
        assert!(!detail.can_interact(None));
    }
}
