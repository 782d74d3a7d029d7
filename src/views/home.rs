//! Home page state: the loaded listing set, the category filter, the
//! featured carousel and per-category counts.
//!
//! Loads are tagged with a request token. Only the response to the most
//! recently issued load is applied; anything older is dropped when it lands.

// region:    --- Imports
use crate::backend::Backend;
use crate::error::MarketResult;
use crate::marketplace::model::{Category, Listing};
use crate::query::fetch_listings;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

// endregion: --- Imports

// region:    --- Featured Window

/// Listings with images shown in the carousel, at most.
pub const FEATURED_LIMIT: usize = 6;
/// Cards visible at once, and the rotation step.
pub const WINDOW_SIZE: usize = 3;

/// First `FEATURED_LIMIT` listings that have at least one image, in fetch order.
pub fn featured(listings: &[Listing]) -> Vec<&Listing> {
    listings
        .iter()
        .filter(|listing| listing.has_images())
        .take(FEATURED_LIMIT)
        .collect()
}

/// Start index of the visible carousel slice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeaturedWindow {
    offset: usize,
}

impl FeaturedWindow {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn advance(&mut self, len: usize) {
        self.offset = if self.offset + WINDOW_SIZE >= len {
            0
        } else {
            self.offset + WINDOW_SIZE
        };
    }

    pub fn retreat(&mut self, len: usize) {
        self.offset = if self.offset < WINDOW_SIZE {
            len.saturating_sub(WINDOW_SIZE)
        } else {
            self.offset - WINDOW_SIZE
        };
    }

    /// `[offset, offset + WINDOW_SIZE)` clamped to the slice.
    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset.min(items.len());
        let end = (self.offset + WINDOW_SIZE).min(items.len());
        &items[start..end]
    }
}

// endregion: --- Featured Window

// region:    --- Snapshot

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

/// Counts over the loaded set, so they follow whatever filter is active.
pub fn category_counts(listings: &[Listing]) -> Vec<CategoryCount> {
    Category::ALL
        .into_iter()
        .map(|category| CategoryCount {
            category,
            count: listings
                .iter()
                .filter(|listing| listing.category == category)
                .count(),
        })
        .collect()
}

/// Listing plus the public URL of its primary image.
#[derive(Debug, Clone, Serialize)]
pub struct ListingCard {
    #[serde(flatten)]
    pub listing: Listing,
    pub image_url: Option<String>,
}

impl ListingCard {
    pub fn new(backend: &Backend, listing: &Listing) -> Self {
        Self {
            image_url: listing
                .primary_image()
                .map(|image| backend.objects().public_url(&image.url)),
            listing: listing.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeSnapshot {
    pub listings: Vec<ListingCard>,
    pub featured: Vec<ListingCard>,
    pub featured_total: usize,
    pub featured_offset: usize,
    pub selected_category: Option<Category>,
    pub query: String,
    pub loading: bool,
    pub categories: Vec<CategoryCount>,
}

// endregion: --- Snapshot

// region:    --- Home View

/// Identifies one issued load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

#[derive(Debug, Default)]
struct HomeState {
    listings: Vec<Listing>,
    selected_category: Option<Category>,
    query: String,
    loading: bool,
    window: FeaturedWindow,
    latest: u64,
}

impl HomeState {
    fn featured_len(&self) -> usize {
        featured(&self.listings).len()
    }
}

#[derive(Debug, Default)]
pub struct HomeView {
    state: RwLock<HomeState>,
}

impl HomeView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-fetches listings for `category`. The free-text query is kept
    /// for display only. Returns `false` when a newer load superseded this one.
    pub async fn load(
        &self,
        backend: &Backend,
        category: Option<Category>,
        query: Option<String>,
    ) -> MarketResult<bool> {
        let token = self.begin().await;
        let result = fetch_listings(backend, category).await;
        self.finish(token, category, query, result).await
    }

    /// Issues a new token and marks the view as loading.
    pub async fn begin(&self) -> RequestToken {
        let mut state = self.state.write().await;
        state.latest += 1;
        state.loading = true;
        RequestToken(state.latest)
    }

    /// Applies a fetch result if `token` is still the latest one issued.
    pub async fn finish(
        &self,
        token: RequestToken,
        category: Option<Category>,
        query: Option<String>,
        result: MarketResult<Vec<Listing>>,
    ) -> MarketResult<bool> {
        let mut state = self.state.write().await;
        if token.0 != state.latest {
            debug!(
                "{:<12} --> dropping stale response {} (latest {})",
                "Home", token.0, state.latest
            );
            return Ok(false);
        }
        state.loading = false;

        let listings = result.map_err(|e| {
            warn!("{:<12} --> error loading listings: {}", "Home", e);
            e
        })?;
        info!(
            "{:<12} --> {} listing(s) loaded, category: {:?}",
            "Home",
            listings.len(),
            category
        );
        state.listings = listings;
        state.selected_category = category;
        state.query = query.unwrap_or_default();
        state.window = FeaturedWindow::default();
        Ok(true)
    }

    pub async fn advance_featured(&self) -> usize {
        let mut state = self.state.write().await;
        let len = state.featured_len();
        state.window.advance(len);
        state.window.offset()
    }

    pub async fn retreat_featured(&self) -> usize {
        let mut state = self.state.write().await;
        let len = state.featured_len();
        state.window.retreat(len);
        state.window.offset()
    }

    pub async fn featured_offset(&self) -> usize {
        self.state.read().await.window.offset()
    }

    pub async fn snapshot(&self, backend: &Backend) -> HomeSnapshot {
        let state = self.state.read().await;
        let featured_set: Vec<ListingCard> = featured(&state.listings)
            .into_iter()
            .map(|listing| ListingCard::new(backend, listing))
            .collect();

        HomeSnapshot {
            listings: state
                .listings
                .iter()
                .map(|listing| ListingCard::new(backend, listing))
                .collect(),
            featured: state.window.visible(&featured_set).to_vec(),
            featured_total: featured_set.len(),
            featured_offset: state.window.offset(),
            selected_category: state.selected_category,
            query: state.query.clone(),
            loading: state.loading,
            categories: category_counts(&state.listings),
        }
    }
}

// endregion: --- Home View

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_wraps_to_start() {
        let mut window = FeaturedWindow::default();
        window.advance(6);
        assert_eq!(window.offset(), 3);
        window.advance(6);
        assert_eq!(window.offset(), 0);

        window.advance(5);
        assert_eq!(window.offset(), 3);
        window.advance(5);
        assert_eq!(window.offset(), 0);
    }

    #[test]
    fn test_retreat_wraps_to_last_window() {
        let mut window = FeaturedWindow::default();
        window.retreat(5);
        assert_eq!(window.offset(), 2);
        window.retreat(5);
        assert_eq!(window.offset(), 2);

        let mut window = FeaturedWindow::default();
        window.retreat(6);
        assert_eq!(window.offset(), 3);
        window.retreat(6);
        assert_eq!(window.offset(), 0);
    }

    #[test]
    fn test_offset_stays_in_range_for_small_sets() {
        for len in 0..=7 {
            let mut window = FeaturedWindow::default();
            for step in 0..10 {
                if step % 3 == 0 {
                    window.retreat(len);
                } else {
                    window.advance(len);
                }
                assert!(window.offset() < len.max(1), "len {} offset {}", len, window.offset());
            }
        }
    }

    #[test]
    fn test_visible_clamps_tail() {
        let items = [1, 2, 3, 4, 5];
        let mut window = FeaturedWindow::default();
        assert_eq!(window.visible(&items), &[1, 2, 3]);
        window.advance(items.len());
        assert_eq!(window.visible(&items), &[4, 5]);
        assert!(FeaturedWindow::default().visible::<i32>(&[]).is_empty());
    }
}
