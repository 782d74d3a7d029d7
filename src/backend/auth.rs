use super::store::check;
use crate::error::{MarketError, MarketResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: User,
}

/// External identity provider. Session changes are published on a watch
/// channel; `sign_in`/`sign_out` only ever change state through it.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;

    async fn sign_in(&self, email: &str, password: &str) -> MarketResult<User>;

    async fn sign_out(&self) -> MarketResult<()>;
}

/// GoTrue (`/auth/v1`) client.
pub struct GoTrueAuth {
    http: reqwest::Client,
    auth_url: String,
    anon_key: String,
    sessions: watch::Sender<Option<Session>>,
}

impl GoTrueAuth {
    pub fn new(http: reqwest::Client, auth_url: String, anon_key: String) -> Self {
        let (sessions, _) = watch::channel(None);
        Self {
            http,
            auth_url,
            anon_key,
            sessions,
        }
    }
}

#[async_trait]
impl AuthProvider for GoTrueAuth {
    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.sessions.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> MarketResult<User> {
        info!("{:<12} --> sign in: {}", "Auth", email);
        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| MarketError::Auth(e.to_string()))?;
        let session = check(response)
            .await
            .map_err(|e| MarketError::Auth(e.to_string()))?
            .json::<Session>()
            .await
            .map_err(|e| MarketError::Auth(e.to_string()))?;

        let user = session.user.clone();
        self.sessions.send_replace(Some(session));
        Ok(user)
    }

    async fn sign_out(&self) -> MarketResult<()> {
        let Some(session) = self.sessions.send_replace(None) else {
            return Ok(());
        };
        info!("{:<12} --> sign out: {}", "Auth", session.user.id);

        let result = self
            .http
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await;
        match result {
            Ok(response) => {
                check(response)
                    .await
                    .map_err(|e| MarketError::Auth(e.to_string()))?;
                Ok(())
            }
            Err(e) => {
                warn!("{:<12} --> logout request failed: {}", "Auth", e);
                Err(MarketError::Auth(e.to_string()))
            }
        }
    }
}
