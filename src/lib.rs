pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod marketplace;
pub mod query;
pub mod scheduler;
pub mod session;
pub mod views;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use backend::Backend;
pub use config::Config;
pub use error::{MarketError, MarketResult};
pub use session::SessionContext;
