//! Session validation
//!
//! Turns request headers into one of three outcomes. Every store failure mode (transport
//! error, timeout, malformed answer, unknown token, expiry) collapses into `Invalid`, so
//! callers never branch on raw errors and never fail open.

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::header::HeaderMap;
use chrono::Utc;

use crate::error::StoreError;
use crate::models::Session;
use crate::session::cookie::extract_session_token;
use crate::session::store::SessionStore;
use crate::utils::logging::token_fingerprint;

/// Result of validating the session presented with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Live, unexpired session confirmed by the store
    Valid(Session),
    /// No session token was presented
    Absent,
    /// A token was presented but does not denote a live session
    Invalid,
}

impl SessionOutcome {
    #[must_use]
    pub fn into_session(self) -> Option<Session> {
        match self {
            Self::Valid(session) => Some(session),
            Self::Absent | Self::Invalid => None,
        }
    }
}

/// Authoritative session check against the store
///
/// Read-only: never refreshes sessions or rewrites cookies.
#[derive(Clone)]
pub struct SessionValidator {
    store: Arc<dyn SessionStore>,
    timeout: Duration,
}

impl SessionValidator {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Validate the session cookie carried in `headers`
    pub async fn validate(&self, headers: &HeaderMap) -> SessionOutcome {
        match extract_session_token(headers) {
            Some(token) => self.validate_token(&token).await,
            None => SessionOutcome::Absent,
        }
    }

    /// Validate a bare token, e.g. one handed over by the credential verifier
    pub async fn validate_token(&self, token: &str) -> SessionOutcome {
        let fingerprint = token_fingerprint(token);

        // One bounded attempt; a timeout is never retried within the request
        let lookup = match tokio::time::timeout(self.timeout, self.store.lookup(token)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout),
        };

        match lookup {
            Ok(Some(session)) => Self::check_live(session, token, &fingerprint),
            Ok(None) => {
                log::debug!("Session store has no live session for token {fingerprint}");
                SessionOutcome::Invalid
            }
            Err(e) => {
                log::warn!("Session lookup failed for token {fingerprint}, failing closed: {e}");
                SessionOutcome::Invalid
            }
        }
    }

    /// Ask the store to extend the session behind `token`
    ///
    /// Same failure semantics as validation: anything but a live refreshed session is
    /// `Invalid`.
    pub async fn refresh_token(&self, token: &str) -> SessionOutcome {
        let fingerprint = token_fingerprint(token);

        let refreshed = match tokio::time::timeout(self.timeout, self.store.refresh(token)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout),
        };

        match refreshed {
            Ok(Some(session)) => Self::check_live(session, token, &fingerprint),
            Ok(None) => SessionOutcome::Invalid,
            Err(e) => {
                log::warn!("Session refresh failed for token {fingerprint}: {e}");
                SessionOutcome::Invalid
            }
        }
    }

    fn check_live(mut session: Session, token: &str, fingerprint: &str) -> SessionOutcome {
        if session.is_expired_at(Utc::now()) {
            log::debug!(
                "Session {} for token {fingerprint} expired at {}",
                session.id,
                session.expires_at
            );
            return SessionOutcome::Invalid;
        }
        if session.token.is_empty() {
            token.clone_into(&mut session.token);
        } else if session.token != token {
            log::warn!("Session store answered for a different token than {fingerprint}");
            return SessionOutcome::Invalid;
        }
        SessionOutcome::Valid(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::TestFixtures;
    use crate::testing::mock::MockSessionStore;
    use crate::testing::requests::headers_with_session;

    fn validator(store: MockSessionStore) -> (SessionValidator, Arc<MockSessionStore>) {
        let store = Arc::new(store);
        (
            SessionValidator::new(store.clone(), Duration::from_millis(100)),
            store,
        )
    }

    #[tokio::test]
    async fn test_absent_without_cookie() {
        let (validator, store) = validator(MockSessionStore::new());
        assert_eq!(
            validator.validate(&HeaderMap::new()).await,
            SessionOutcome::Absent
        );
        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn test_valid_live_session() {
        let session = TestFixtures::live_session("live-token");
        let (validator, _) = validator(MockSessionStore::new().with_session(session.clone()));

        let outcome = validator.validate(&headers_with_session("live-token")).await;
        assert_eq!(outcome, SessionOutcome::Valid(session));
    }

    #[tokio::test]
    async fn test_unknown_token_is_invalid() {
        let (validator, store) = validator(MockSessionStore::new());
        let outcome = validator.validate(&headers_with_session("nope")).await;
        assert_eq!(outcome, SessionOutcome::Invalid);
        assert_eq!(store.lookups(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_is_invalid() {
        let session = TestFixtures::expired_session("old-token");
        let (validator, _) = validator(MockSessionStore::new().with_session(session));
        assert_eq!(
            validator.validate(&headers_with_session("old-token")).await,
            SessionOutcome::Invalid
        );
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let session = TestFixtures::live_session("live-token");
        let (validator, _) =
            validator(MockSessionStore::new().with_session(session).unavailable());
        assert_eq!(
            validator.validate(&headers_with_session("live-token")).await,
            SessionOutcome::Invalid
        );
    }

    #[tokio::test]
    async fn test_store_timeout_fails_closed_without_retry() {
        let session = TestFixtures::live_session("live-token");
        let (validator, store) = validator(
            MockSessionStore::new()
                .with_session(session)
                .with_delay(Duration::from_millis(500)),
        );
        assert_eq!(
            validator.validate(&headers_with_session("live-token")).await,
            SessionOutcome::Invalid
        );
        assert_eq!(store.lookups(), 1);
    }

    #[tokio::test]
    async fn test_store_answering_for_other_token_is_invalid() {
        let mut session = TestFixtures::live_session("live-token");
        session.token = "someone-else".to_string();
        let (validator, _) = validator(MockSessionStore::new().with_session_for("live-token", session));
        assert_eq!(
            validator.validate_token("live-token").await,
            SessionOutcome::Invalid
        );
    }

    #[tokio::test]
    async fn test_refresh_extends_session() {
        let session = TestFixtures::live_session("live-token");
        let original_expiry = session.expires_at;
        let (validator, store) = validator(MockSessionStore::new().with_session(session));

        let refreshed = validator.refresh_token("live-token").await.into_session().unwrap();
        assert!(refreshed.expires_at > original_expiry);
        assert_eq!(store.refreshes(), 1);
    }
}
