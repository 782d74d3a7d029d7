use super::auth::Session;
use super::store::check;
use crate::error::MarketResult;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::watch;
use tracing::debug;

/// Public URL of an object stored under `bucket`.
pub fn public_url(storage_url: &str, bucket: &str, path: &str) -> String {
    format!("{}/object/public/{}/{}", storage_url, bucket, path)
}

/// Blob side of the hosted backend.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` at `path` and returns the stored path.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> MarketResult<String>;

    async fn remove(&self, paths: &[String]) -> MarketResult<()>;

    fn public_url(&self, path: &str) -> String;
}

pub struct RestObjectStore {
    http: reqwest::Client,
    storage_url: String,
    bucket: String,
    anon_key: String,
    sessions: watch::Receiver<Option<Session>>,
}

impl RestObjectStore {
    pub fn new(
        http: reqwest::Client,
        storage_url: String,
        bucket: String,
        anon_key: String,
        sessions: watch::Receiver<Option<Session>>,
    ) -> Self {
        Self {
            http,
            storage_url,
            bucket,
            anon_key,
            sessions,
        }
    }

    fn bearer(&self) -> String {
        self.sessions
            .borrow()
            .as_ref()
            .map(|session| session.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }
}

#[async_trait]
impl ObjectStore for RestObjectStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> MarketResult<String> {
        debug!("{:<12} --> upload {} ({} bytes)", "ObjectStore", path, bytes.len());
        let response = self
            .http
            .post(format!("{}/object/{}/{}", self.storage_url, self.bucket, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check(response).await?;
        Ok(path.to_string())
    }

    async fn remove(&self, paths: &[String]) -> MarketResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        debug!("{:<12} --> remove {:?}", "ObjectStore", paths);
        let response = self
            .http
            .delete(format!("{}/object/{}", self.storage_url, self.bucket))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .json(&serde_json::json!({ "prefixes": paths }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        public_url(&self.storage_url, &self.bucket, path)
    }
}
