//! Boundaries to the hosted backend: relational rows, blobs and identity.

pub mod auth;
pub mod storage;
pub mod store;

pub use auth::{AuthProvider, GoTrueAuth, Session, User};
pub use storage::{ObjectStore, RestObjectStore};
pub use store::{Filter, Join, Order, Query, RelationalStore, RestStore};

use crate::config::Config;
use crate::error::MarketResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// Handle to both stores, shared by every data-access call.
#[derive(Clone)]
pub struct Backend {
    store: Arc<dyn RelationalStore>,
    objects: Arc<dyn ObjectStore>,
}

impl Backend {
    pub fn new(store: Arc<dyn RelationalStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { store, objects }
    }

    /// HTTP-backed stores that authenticate as whoever holds the session.
    pub fn connect(
        config: &Config,
        http: reqwest::Client,
        sessions: watch::Receiver<Option<Session>>,
    ) -> Self {
        let store = RestStore::new(
            http.clone(),
            config.rest_url(),
            config.anon_key.clone(),
            sessions.clone(),
        );
        let objects = RestObjectStore::new(
            http,
            config.storage_url(),
            config.storage_bucket.clone(),
            config.anon_key.clone(),
            sessions,
        );
        Self::new(Arc::new(store), Arc::new(objects))
    }

    pub fn store(&self) -> &dyn RelationalStore {
        self.store.as_ref()
    }

    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }
}

pub fn encode<T: Serialize>(value: &T) -> MarketResult<Value> {
    Ok(serde_json::to_value(value)?)
}

pub fn decode<T: DeserializeOwned>(row: Value) -> MarketResult<T> {
    Ok(serde_json::from_value(row)?)
}

pub fn decode_all<T: DeserializeOwned>(rows: Vec<Value>) -> MarketResult<Vec<T>> {
    rows.into_iter().map(decode).collect()
}
