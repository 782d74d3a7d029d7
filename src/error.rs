use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not permitted: {0}")]
    NotPermitted(String),

    #[error("Sign-in required")]
    Unauthenticated,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Auth error: {0}")]
    Auth(String),

    /// The listing row exists but creation could not be finished or undone.
    #[error("Listing {listing_id} left incomplete: {reason}")]
    IncompleteListing { listing_id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type MarketResult<T> = Result<T, MarketError>;

impl From<reqwest::Error> for MarketError {
    fn from(err: reqwest::Error) -> Self {
        MarketError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        MarketError::Store(format!("malformed row: {}", err))
    }
}

impl MarketError {
    pub fn status(&self) -> StatusCode {
        match self {
            MarketError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketError::Validation(_) => StatusCode::BAD_REQUEST,
            MarketError::NotPermitted(_) => StatusCode::FORBIDDEN,
            MarketError::Unauthenticated | MarketError::Auth(_) => StatusCode::UNAUTHORIZED,
            MarketError::Store(_) => StatusCode::BAD_GATEWAY,
            MarketError::IncompleteListing { .. } | MarketError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (self.status(), Json(body)).into_response()
    }
}
