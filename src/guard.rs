//! Route guard
//!
//! Every request is classified against a static route table, then decided:
//!
//! ```text
//! Unclassified -> Classified{Public | AuthOnly | Protected}
//!   Public    -> Continue
//!   AuthOnly  -> optimistic check (cookie present?) -> Redirect(home) | Continue
//!   Protected -> optimistic check (advisory) -> authoritative check
//!                -> Valid: Continue | Absent/Invalid: Redirect(login) or Reject(401) on API paths
//! ```
//!
//! AuthOnly pages never touch the store. A stale cookie costs one bounce to the home
//! page, whose own authoritative check rejects it and asks for the cookie to be cleared,
//! so the next visit to login passes the optimistic check.

use actix_web::http::header::HeaderMap;
use actix_web::http::StatusCode;

use crate::error::ConfigurationError;
use crate::models::Session;
use crate::session::cookie::extract_session_token;
use crate::session::validator::{SessionOutcome, SessionValidator};
use crate::settings::RouteSettings;

/// How a request path is guarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClassification {
    /// No session requirements
    Public,
    /// Login and signup: visitors that already hold a session are sent away
    AuthOnly,
    /// Requires an authoritative live session
    Protected,
}

/// Cheap, non-authoritative session test: cookie presence only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisticCheck {
    CookiePresent,
    CookieAbsent,
}

impl OptimisticCheck {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        if extract_session_token(headers).is_some() {
            Self::CookiePresent
        } else {
            Self::CookieAbsent
        }
    }
}

/// What the caller must do with the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Continue,
    RedirectTo(String),
    Reject(StatusCode),
}

/// Decision for one request
///
/// Not `Clone`: a decision is produced once and consumed once.
#[derive(Debug, PartialEq, Eq)]
pub struct GuardDecision {
    outcome: GuardOutcome,
    classification: RouteClassification,
    session: Option<Session>,
    clear_session: bool,
}

impl GuardDecision {
    fn new(classification: RouteClassification, outcome: GuardOutcome) -> Self {
        Self {
            outcome,
            classification,
            session: None,
            clear_session: false,
        }
    }

    fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    fn clearing_session(mut self) -> Self {
        self.clear_session = true;
        self
    }

    #[must_use]
    pub fn outcome(&self) -> &GuardOutcome {
        &self.outcome
    }

    /// Whether the presented session cookie was rejected and must be expired on the client
    ///
    /// Without this, a cookie the store no longer vouches for keeps the visitor bouncing
    /// away from the login page.
    #[must_use]
    pub fn clears_session(&self) -> bool {
        self.clear_session
    }

    /// Session confirmed by the authoritative check, if one ran and succeeded
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn into_parts(self) -> (GuardOutcome, Option<Session>) {
        (self.outcome, self.session)
    }
}

/// Static path-prefix table
///
/// The longest matching prefix wins; prefixes match on path-segment boundaries and
/// unmatched paths are `Public`.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<(String, RouteClassification)>,
    api_prefix: String,
    login_path: String,
    home_path: String,
}

impl RouteTable {
    /// Build the table from route settings
    ///
    /// # Errors
    ///
    /// Returns an error if a prefix does not start with `/`, or if the login or home page
    /// would redirect to itself
    pub fn from_settings(routes: &RouteSettings) -> Result<Self, ConfigurationError> {
        let mut entries = Vec::new();
        for (prefixes, classification) in [
            (&routes.public, RouteClassification::Public),
            (&routes.auth_only, RouteClassification::AuthOnly),
            (&routes.protected, RouteClassification::Protected),
        ] {
            for prefix in prefixes {
                entries.push((normalize_prefix(prefix)?, classification));
            }
        }

        let table = Self {
            entries,
            api_prefix: normalize_prefix(&routes.api_prefix)?,
            login_path: normalize_prefix(&routes.login_path)?,
            home_path: normalize_prefix(&routes.home_path)?,
        };

        if table.classify(&table.login_path) == RouteClassification::Protected {
            return Err(ConfigurationError::RedirectLoop(table.login_path));
        }
        if table.classify(&table.home_path) == RouteClassification::AuthOnly {
            return Err(ConfigurationError::RedirectLoop(table.home_path));
        }

        Ok(table)
    }

    /// Classify a request path
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClassification {
        self.entries
            .iter()
            .filter(|(prefix, _)| path_has_prefix(path, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(RouteClassification::Public, |(_, classification)| {
                *classification
            })
    }

    #[must_use]
    pub fn is_api(&self, path: &str) -> bool {
        path_has_prefix(path, &self.api_prefix)
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn home_path(&self) -> &str {
        &self.home_path
    }
}

fn normalize_prefix(prefix: &str) -> Result<String, ConfigurationError> {
    let trimmed = prefix.trim();
    if !trimmed.starts_with('/') {
        return Err(ConfigurationError::InvalidRoutePrefix(prefix.to_string()));
    }
    if trimmed.len() > 1 {
        Ok(trimmed.trim_end_matches('/').to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

fn path_has_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Decides, per request, whether it may reach protected content
#[derive(Clone)]
pub struct RouteGuard {
    routes: RouteTable,
    validator: SessionValidator,
}

impl RouteGuard {
    #[must_use]
    pub fn new(routes: RouteTable, validator: SessionValidator) -> Self {
        Self { routes, validator }
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    #[must_use]
    pub fn validator(&self) -> &SessionValidator {
        &self.validator
    }

    /// Decide a request from its path and headers
    ///
    /// `path` must already be canonical (see `utils::path::canonicalize_path`), so that the
    /// path classified is the path served. Never fails: store problems end in the
    /// unauthenticated branch.
    pub async fn evaluate(&self, path: &str, headers: &HeaderMap) -> GuardDecision {
        let classification = self.routes.classify(path);

        let decision = match classification {
            RouteClassification::Public => {
                GuardDecision::new(classification, GuardOutcome::Continue)
            }
            RouteClassification::AuthOnly => self.decide_auth_only(headers),
            RouteClassification::Protected => self.decide_protected(path, headers).await,
        };

        log::debug!(
            "Guard {path}: {:?} -> {:?}",
            decision.classification,
            decision.outcome
        );
        decision
    }

    fn decide_auth_only(&self, headers: &HeaderMap) -> GuardDecision {
        let outcome = match OptimisticCheck::from_headers(headers) {
            OptimisticCheck::CookiePresent => {
                GuardOutcome::RedirectTo(self.routes.home_path.clone())
            }
            OptimisticCheck::CookieAbsent => GuardOutcome::Continue,
        };
        GuardDecision::new(RouteClassification::AuthOnly, outcome)
    }

    async fn decide_protected(&self, path: &str, headers: &HeaderMap) -> GuardDecision {
        let optimistic = OptimisticCheck::from_headers(headers);
        log::trace!("Optimistic check for {path}: {optimistic:?}");

        match self.validator.validate(headers).await {
            SessionOutcome::Valid(session) => {
                GuardDecision::new(RouteClassification::Protected, GuardOutcome::Continue)
                    .with_session(session)
            }
            SessionOutcome::Absent => {
                GuardDecision::new(RouteClassification::Protected, self.unauthenticated(path))
            }
            SessionOutcome::Invalid => {
                GuardDecision::new(RouteClassification::Protected, self.unauthenticated(path))
                    .clearing_session()
            }
        }
    }

    fn unauthenticated(&self, path: &str) -> GuardOutcome {
        if self.routes.is_api(path) {
            GuardOutcome::Reject(StatusCode::UNAUTHORIZED)
        } else {
            GuardOutcome::RedirectTo(self.routes.login_path.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::TestFixtures;
    use crate::testing::mock::MockSessionStore;
    use crate::testing::requests::headers_with_session;
    use std::sync::Arc;
    use std::time::Duration;

    fn table() -> RouteTable {
        RouteTable::from_settings(&RouteSettings::default()).unwrap()
    }

    fn guard(store: MockSessionStore) -> (RouteGuard, Arc<MockSessionStore>) {
        let store = Arc::new(store);
        let validator = SessionValidator::new(store.clone(), Duration::from_millis(100));
        (RouteGuard::new(table(), validator), store)
    }

    #[test]
    fn test_classification() {
        let routes = table();
        assert_eq!(routes.classify("/login"), RouteClassification::AuthOnly);
        assert_eq!(routes.classify("/signup/verify"), RouteClassification::AuthOnly);
        assert_eq!(routes.classify("/dashboard"), RouteClassification::Protected);
        assert_eq!(
            routes.classify("/dashboard/reports/1"),
            RouteClassification::Protected
        );
        assert_eq!(routes.classify("/api/notifications"), RouteClassification::Protected);
        assert_eq!(routes.classify("/api/auth/session"), RouteClassification::Public);
        assert_eq!(routes.classify("/"), RouteClassification::Public);
        assert_eq!(routes.classify("/pricing"), RouteClassification::Public);
    }

    #[test]
    fn test_prefixes_match_on_segment_boundaries() {
        let routes = table();
        assert_eq!(routes.classify("/loginx"), RouteClassification::Public);
        assert_eq!(routes.classify("/dashboards"), RouteClassification::Public);
        assert_eq!(routes.classify("/apiary"), RouteClassification::Public);
        assert!(routes.is_api("/api"));
        assert!(!routes.is_api("/apiary"));
    }

    #[test]
    fn test_invalid_route_settings() {
        let mut settings = RouteSettings::default();
        settings.protected.push("dashboard".to_string());
        assert!(matches!(
            RouteTable::from_settings(&settings),
            Err(ConfigurationError::InvalidRoutePrefix(_))
        ));

        let mut settings = RouteSettings::default();
        settings.protected.push("/login".to_string());
        settings.auth_only.clear();
        assert!(matches!(
            RouteTable::from_settings(&settings),
            Err(ConfigurationError::RedirectLoop(_))
        ));
    }

    #[tokio::test]
    async fn test_public_route_never_touches_session() {
        let (guard, store) = guard(MockSessionStore::new().unavailable());
        let decision = guard
            .evaluate("/pricing", &headers_with_session("whatever"))
            .await;
        assert_eq!(decision.outcome(), &GuardOutcome::Continue);
        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn test_auth_only_uses_optimistic_check() {
        let (guard, store) = guard(MockSessionStore::new());

        let decision = guard.evaluate("/login", &HeaderMap::new()).await;
        assert_eq!(decision.outcome(), &GuardOutcome::Continue);

        // Stale cookie: still redirected, no store round trip
        let decision = guard.evaluate("/login", &headers_with_session("stale")).await;
        assert_eq!(decision.outcome(), &GuardOutcome::RedirectTo("/".to_string()));
        assert!(!decision.clears_session());
        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn test_protected_requires_authoritative_session() {
        let live = TestFixtures::live_session("live");
        let expired = TestFixtures::expired_session("expired");
        let (guard, _) = guard(
            MockSessionStore::new()
                .with_session(live.clone())
                .with_session(expired),
        );

        let decision = guard.evaluate("/dashboard", &HeaderMap::new()).await;
        assert_eq!(
            decision.outcome(),
            &GuardOutcome::RedirectTo("/login".to_string())
        );
        assert!(!decision.clears_session());

        let decision = guard
            .evaluate("/dashboard", &headers_with_session("expired"))
            .await;
        assert_eq!(
            decision.outcome(),
            &GuardOutcome::RedirectTo("/login".to_string())
        );
        assert!(decision.clears_session());

        let decision = guard
            .evaluate("/dashboard", &headers_with_session("live"))
            .await;
        assert_eq!(decision.outcome(), &GuardOutcome::Continue);
        assert_eq!(decision.session(), Some(&live));
        assert!(!decision.clears_session());
    }

    #[tokio::test]
    async fn test_protected_api_rejects_with_401() {
        let (guard, _) = guard(MockSessionStore::new());
        let decision = guard.evaluate("/api/notifications", &HeaderMap::new()).await;
        assert_eq!(
            decision.outcome(),
            &GuardOutcome::Reject(StatusCode::UNAUTHORIZED)
        );

        let decision = guard
            .evaluate("/api/notifications", &headers_with_session("revoked"))
            .await;
        assert_eq!(
            decision.outcome(),
            &GuardOutcome::Reject(StatusCode::UNAUTHORIZED)
        );
        assert!(decision.clears_session());
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let (guard, _) = guard(
            MockSessionStore::new()
                .with_session(TestFixtures::live_session("live"))
                .unavailable(),
        );
        let decision = guard
            .evaluate("/dashboard", &headers_with_session("live"))
            .await;
        assert_eq!(
            decision.outcome(),
            &GuardOutcome::RedirectTo("/login".to_string())
        );
        assert!(decision.session().is_none());
    }

    #[tokio::test]
    async fn test_repeated_evaluation_is_idempotent() {
        let (guard, _) = guard(
            MockSessionStore::new().with_session(TestFixtures::live_session("live")),
        );
        for (path, token) in [
            ("/dashboard", Some("live")),
            ("/dashboard", Some("unknown")),
            ("/dashboard", None),
            ("/login", Some("live")),
            ("/api/items", Some("unknown")),
        ] {
            let headers = token.map_or_else(HeaderMap::new, headers_with_session);
            let first = guard.evaluate(path, &headers).await;
            let second = guard.evaluate(path, &headers).await;
            assert_eq!(first, second, "{path} {token:?}");
        }
    }
}
