//! In-memory backends and fixtures for tests.

pub mod auth;
pub mod storage;
pub mod store;

pub use auth::MockAuth;
pub use storage::MemoryObjectStore;
pub use store::MemoryStore;

use crate::backend::Backend;
use crate::marketplace::model::{Category, ListingStatus};
use crate::query::queries::{IMAGES, LISTINGS, PROFILES};
use serde_json::{json, Value};
use std::sync::Arc;

/// Backend over in-memory stores, with handles to inspect them.
#[derive(Clone)]
pub struct MockBackend {
    pub backend: Backend,
    pub store: Arc<MemoryStore>,
    pub objects: Arc<MemoryObjectStore>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let backend = Backend::new(store.clone(), objects.clone());
        Self {
            backend,
            store,
            objects,
        }
    }

    pub async fn seed_profile(&self, user_id: &str, email: &str) -> Value {
        self.store
            .seed(
                PROFILES,
                json!({
                    "id": user_id,
                    "email": email,
                    "full_name": null,
                    "student_id": null,
                    "is_verified": true,
                }),
            )
            .await
    }

    /// Returns the new listing's id.
    pub async fn seed_listing(
        &self,
        seller_id: &str,
        title: &str,
        category: Category,
        status: ListingStatus,
        price: f64,
    ) -> String {
        let row = self
            .store
            .seed(
                LISTINGS,
                json!({
                    "title": title,
                    "description": null,
                    "price": price,
                    "category": category,
                    "status": status,
                    "seller_id": seller_id,
                }),
            )
            .await;
        row["id"].as_str().unwrap_or_default().to_string()
    }

    pub async fn seed_image(&self, listing_id: &str) -> Value {
        self.store
            .seed(
                IMAGES,
                json!({
                    "listing_id": listing_id,
                    "url": format!("{}/seeded", listing_id),
                }),
            )
            .await
    }
}
