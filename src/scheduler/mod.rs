/// Featured carousel rotation
/// Advances the home view's featured window on a fixed period until stopped.
// region:    --- Imports
use crate::views::HomeView;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};
use tracing::{debug, info};

// endregion: --- Imports

// region:    --- Featured Rotator
pub struct FeaturedRotator {
    handle: JoinHandle<()>,
}

impl FeaturedRotator {
    /// Spawns the timer; the first step happens one `period` from now.
    pub fn start(home: Arc<HomeView>, period: Duration) -> Self {
        info!("{:<12} --> featured rotation every {:?}", "Scheduler", period);
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                let offset = home.advance_featured().await;
                debug!("{:<12} --> featured offset now {}", "Scheduler", offset);
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        info!("{:<12} --> featured rotation stopped", "Scheduler");
        self.handle.abort();
    }
}

impl Drop for FeaturedRotator {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
// endregion: --- Featured Rotator
