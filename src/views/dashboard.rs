use crate::backend::{Backend, User};
use crate::error::{MarketError, MarketResult};
use crate::marketplace::model::{Bid, Listing};
use crate::query::{fetch_user_bids, fetch_user_listings};
use serde::Serialize;
use tracing::{error, info};

/// The signed-in user's own listings and bids.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub listings: Vec<Listing>,
    pub bids: Vec<Bid>,
}

/// Both fetches run together; either failing fails the dashboard.
pub async fn load_dashboard(backend: &Backend, user: Option<&User>) -> MarketResult<Dashboard> {
    let user = user.ok_or(MarketError::Unauthenticated)?;
    info!("{:<12} --> dashboard for {}", "Dashboard", user.id);

    let (listings, bids) = tokio::try_join!(
        fetch_user_listings(backend, &user.id),
        fetch_user_bids(backend, &user.id),
    )
    .map_err(|e| {
        error!("{:<12} --> error loading dashboard data: {}", "Dashboard", e);
        e
    })?;

    Ok(Dashboard { listings, bids })
}
