use crate::backend::{AuthProvider, Session, User};
use crate::error::{MarketError, MarketResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::watch;

/// Auth provider with a fixed set of accounts.
pub struct MockAuth {
    accounts: HashMap<String, (String, User)>,
    sessions: watch::Sender<Option<Session>>,
}

impl Default for MockAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAuth {
    pub fn new() -> Self {
        let (sessions, _) = watch::channel(None);
        Self {
            accounts: HashMap::new(),
            sessions,
        }
    }

    pub fn with_account(mut self, email: &str, password: &str, user_id: &str) -> Self {
        let user = User {
            id: user_id.to_string(),
            email: Some(email.to_string()),
        };
        self.accounts
            .insert(email.to_string(), (password.to_string(), user));
        self
    }
}

fn session_for(user: User) -> Session {
    Session {
        access_token: format!("token-{}", user.id),
        refresh_token: None,
        expires_in: Some(3600),
        user,
    }
}

#[async_trait]
impl AuthProvider for MockAuth {
    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.sessions.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> MarketResult<User> {
        match self.accounts.get(email) {
            Some((expected, user)) if expected == password => {
                self.sessions.send_replace(Some(session_for(user.clone())));
                Ok(user.clone())
            }
            _ => Err(MarketError::Auth("invalid login credentials".to_string())),
        }
    }

    async fn sign_out(&self) -> MarketResult<()> {
        self.sessions.send_replace(None);
        Ok(())
    }
}
