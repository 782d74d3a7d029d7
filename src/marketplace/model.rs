use crate::error::{MarketError, MarketResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// region:    --- Enums

/// Fixed set of listing categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Books,
    Electronics,
    Services,
    Tickets,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Books,
        Category::Electronics,
        Category::Services,
        Category::Tickets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Books => "Books",
            Category::Electronics => "Electronics",
            Category::Services => "Services",
            Category::Tickets => "Tickets",
        }
    }

    /// Search-form value: blank or `All` means no category.
    pub fn parse_filter(raw: Option<&str>) -> MarketResult<Option<Category>> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
            Some(value) => value.parse().map(Some),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MarketError::Validation(format!("unknown category: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Pending,
    Active,
    Sold,
    Rejected,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Active => "active",
            ListingStatus::Sold => "sold",
            ListingStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
}

// endregion: --- Enums

// region:    --- Entities

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Listing row; nested fields are filled only when the query embeds them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub category: Category,
    pub status: ListingStatus,
    pub seller_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Image>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bids: Option<Vec<Bid>>,
}

impl Listing {
    pub fn has_images(&self) -> bool {
        self.images.as_ref().is_some_and(|images| !images.is_empty())
    }

    /// First image as returned by the store; listing queries embed images oldest first.
    pub fn primary_image(&self) -> Option<&Image> {
        self.images.as_ref()?.first()
    }

    pub fn bids(&self) -> &[Bid] {
        self.bids.as_deref().unwrap_or_default()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.seller_id == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub listing_id: String,
    /// Storage path inside the listings bucket.
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: String,
    pub listing_id: String,
    pub bidder_id: String,
    pub amount: f64,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidder: Option<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing: Option<Box<Listing>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub listing_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Profile>,
}

// endregion: --- Entities

// region:    --- Inserts

/// Columns a seller supplies when posting a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewListing {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub category: Category,
    pub seller_id: String,
    /// New listings wait for moderation.
    #[serde(default = "pending_listing")]
    pub status: ListingStatus,
}

fn pending_listing() -> ListingStatus {
    ListingStatus::Pending
}

impl NewListing {
    pub fn validate(&self) -> MarketResult<()> {
        if self.title.trim().is_empty() {
            return Err(MarketError::Validation("title is required".to_string()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(MarketError::Validation(
                "price must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBid {
    pub listing_id: String,
    pub bidder_id: String,
    pub amount: f64,
    pub status: BidStatus,
}

impl NewBid {
    pub fn new(listing_id: &str, bidder_id: &str, amount: f64) -> Self {
        Self {
            listing_id: listing_id.to_string(),
            bidder_id: bidder_id.to_string(),
            amount,
            status: BidStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub listing_id: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewImage {
    pub listing_id: String,
    pub url: String,
}

/// Image bytes submitted with a new listing.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// endregion: --- Inserts

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn image(id: &str, secs: i64) -> Image {
        Image {
            id: id.to_string(),
            listing_id: "l-1".to_string(),
            url: format!("l-1/{}", id),
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_category_parse_filter() {
        assert_eq!(Category::parse_filter(None).unwrap(), None);
        assert_eq!(Category::parse_filter(Some("All")).unwrap(), None);
        assert_eq!(Category::parse_filter(Some("")).unwrap(), None);
        assert_eq!(
            Category::parse_filter(Some("books")).unwrap(),
            Some(Category::Books)
        );
        assert!(Category::parse_filter(Some("Furniture")).is_err());
    }

    #[test]
    fn test_listing_row_decodes_without_nested_fields() {
        let listing: Listing = serde_json::from_value(serde_json::json!({
            "id": "l-1",
            "title": "Calculus textbook",
            "description": null,
            "price": 20,
            "category": "Books",
            "status": "active",
            "seller_id": "u-1",
            "created_at": "2024-03-01T10:00:00+00:00"
        }))
        .unwrap();

        assert_eq!(listing.category, Category::Books);
        assert_eq!(listing.status, ListingStatus::Active);
        assert!(listing.images.is_none());
        assert!(!listing.has_images());
        assert!(listing.bids().is_empty());
    }

    #[test]
    fn test_primary_image_follows_store_order() {
        let listing = Listing {
            id: "l-1".to_string(),
            title: "Desk lamp".to_string(),
            description: None,
            price: 5.0,
            category: Category::Electronics,
            status: ListingStatus::Active,
            seller_id: "u-1".to_string(),
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
            seller: None,
            images: Some(vec![image("b", 20), image("a", 10), image("c", 30)]),
            bids: None,
        };

        assert_eq!(listing.primary_image().map(|i| i.id.as_str()), Some("b"));
        assert!(listing.is_owned_by("u-1"));
        assert!(!listing.is_owned_by("u-2"));
    }

    #[test]
    fn test_new_listing_validation() {
        let mut listing = NewListing {
            title: "Concert ticket".to_string(),
            description: None,
            price: 0.0,
            category: Category::Tickets,
            seller_id: "u-1".to_string(),
            status: ListingStatus::Pending,
        };
        assert!(listing.validate().is_ok());

        listing.price = -1.0;
        assert!(listing.validate().is_err());

        listing.price = 1.0;
        listing.title = "  ".to_string();
        assert!(listing.validate().is_err());
    }
}
