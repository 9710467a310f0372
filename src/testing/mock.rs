//! Mock implementations of external dependencies

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StoreError;
use crate::models::Session;
use crate::session::store::SessionStore;

/// In-memory session store keyed by token
///
/// Counts lookups and refreshes so tests can assert when the store was (or was not)
/// consulted.
#[derive(Default)]
pub struct MockSessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    unavailable: bool,
    delay: Option<Duration>,
    lookups: AtomicUsize,
    refreshes: AtomicUsize,
}

impl MockSessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under its own token
    #[must_use]
    pub fn with_session(self, session: Session) -> Self {
        let token = session.token.clone();
        self.with_session_for(&token, session)
    }

    /// Register a session under an arbitrary token
    ///
    /// # Panics
    ///
    /// Panics if the session map lock is poisoned
    #[must_use]
    pub fn with_session_for(self, token: &str, session: Session) -> Self {
        self.sessions
            .lock()
            .unwrap()
            .insert(token.to_string(), session);
        self
    }

    /// Every call fails with `StoreError::Unavailable`
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Every call sleeps before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) -> Result<(), StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable {
            return Err(StoreError::Unavailable("mock store is down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn lookup(&self, token: &str) -> Result<Option<Session>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await?;
        Ok(self.sessions.lock().unwrap().get(token).cloned())
    }

    async fn refresh(&self, token: &str) -> Result<Option<Session>, StoreError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await?;

        let mut sessions = self.sessions.lock().unwrap();
        let Some(session) = sessions.get_mut(token) else {
            return Ok(None);
        };
        let now = Utc::now();
        if session.is_expired_at(now) {
            return Ok(None);
        }
        session.expires_at = session.expires_at.max(now) + chrono::Duration::hours(1);
        session.last_seen_at = now;
        Ok(Some(session.clone()))
    }
}
