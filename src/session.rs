//! Process-wide view of who is signed in.
//!
//! Built once at start-up from an [`AuthProvider`] and shared by `Arc`.
//! Sign-in and sign-out go through the provider; the context only observes
//! the provider's session stream.

use crate::backend::{AuthProvider, Session, User};
use crate::error::{MarketError, MarketResult};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

pub struct SessionContext {
    provider: Arc<dyn AuthProvider>,
    sessions: watch::Receiver<Option<Session>>,
    watcher: JoinHandle<()>,
}

impl SessionContext {
    /// Subscribes to the provider's session stream.
    pub fn start(provider: Arc<dyn AuthProvider>) -> Self {
        let sessions = provider.subscribe();
        let mut changes = provider.subscribe();
        let watcher = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                match changes.borrow_and_update().as_ref() {
                    Some(session) => info!("{:<12} --> signed in: {}", "Session", session.user.id),
                    None => info!("{:<12} --> signed out", "Session"),
                }
            }
        });

        Self {
            provider,
            sessions,
            watcher,
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.sessions
            .borrow()
            .as_ref()
            .map(|session| session.user.clone())
    }

    pub fn require_user(&self) -> MarketResult<User> {
        self.current_user().ok_or(MarketError::Unauthenticated)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> MarketResult<User> {
        self.provider.sign_in(email, password).await
    }

    pub async fn sign_out(&self) -> MarketResult<()> {
        self.provider.sign_out().await
    }

    /// Stops observing the session stream.
    pub fn shutdown(&self) {
        self.watcher.abort();
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}
