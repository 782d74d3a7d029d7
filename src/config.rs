use crate::error::{MarketError, MarketResult};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    /// Root URL of the hosted backend, e.g. `https://xyz.example.co`.
    pub backend_url: String,
    /// Public (anonymous) API key sent with every backend request.
    pub anon_key: String,
    pub storage_bucket: String,
    pub gateway_addr: String,
    pub featured_interval: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> MarketResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> MarketResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = required(&lookup, "MARKET_BACKEND_URL")?
            .trim_end_matches('/')
            .to_string();

        let featured_secs: u64 = optional(&lookup, "MARKET_FEATURED_INTERVAL_SECS", 5)?;
        if featured_secs == 0 {
            return Err(MarketError::Config(
                "MARKET_FEATURED_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }

        Ok(Config {
            backend_url,
            anon_key: required(&lookup, "MARKET_ANON_KEY")?,
            storage_bucket: optional(&lookup, "MARKET_STORAGE_BUCKET", "listings".to_string())?,
            gateway_addr: optional(&lookup, "MARKET_GATEWAY_ADDR", "0.0.0.0:3000".to_string())?,
            featured_interval: Duration::from_secs(featured_secs),
            request_timeout: Duration::from_secs(optional(
                &lookup,
                "MARKET_REQUEST_TIMEOUT_SECS",
                30,
            )?),
        })
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.backend_url)
    }

    pub fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.backend_url)
    }

    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.backend_url)
    }
}

fn required<F>(lookup: &F, key: &str) -> MarketResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| MarketError::Config(format!("{} must be set", key)))
}

fn optional<F, T>(lookup: &F, key: &str, default: T) -> MarketResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| MarketError::Config(format!("Invalid {}: {}", key, e))),
        None => {
            info!("{:<12} --> {} not set, using default: {}", "Config", key, default);
            Ok(default)
        }
    }
}
