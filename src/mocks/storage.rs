use crate::backend::storage::public_url;
use crate::backend::ObjectStore;
use crate::error::{MarketError, MarketResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

pub const MOCK_STORAGE_URL: &str = "http://market.test/storage/v1";
pub const MOCK_BUCKET: &str = "listings";

#[derive(Default)]
struct Objects {
    blobs: HashMap<String, Vec<u8>>,
    attempts: usize,
    /// Uploads past this many attempts are rejected.
    fail_after: Option<usize>,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    inner: Mutex<Objects>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_uploads_after(&self, attempts: usize) {
        self.inner.lock().await.fail_after = Some(attempts);
    }

    pub async fn upload_attempts(&self) -> usize {
        self.inner.lock().await.attempts
    }

    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.inner.lock().await.blobs.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> MarketResult<String> {
        let mut objects = self.inner.lock().await;
        objects.attempts += 1;
        let attempts = objects.attempts;
        if objects.fail_after.is_some_and(|limit| attempts > limit) {
            return Err(MarketError::Store(format!("upload of {} rejected", path)));
        }
        objects.blobs.insert(path.to_string(), bytes);
        Ok(path.to_string())
    }

    async fn remove(&self, paths: &[String]) -> MarketResult<()> {
        let mut objects = self.inner.lock().await;
        for path in paths {
            objects.blobs.remove(path);
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        public_url(MOCK_STORAGE_URL, MOCK_BUCKET, path)
    }
}
