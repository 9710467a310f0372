//! Test fixtures providing pre-built test objects

use chrono::{Duration, Utc};

use crate::models::Session;
use crate::settings::{Environment, GatewaySettings};

use super::constants::{TEST_API_ORIGIN, TEST_APP_ORIGIN, TEST_FRONT_ORIGIN, TEST_USER_ID};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Session that stays live for another hour
    #[must_use]
    pub fn live_session(token: &str) -> Session {
        let now = Utc::now();
        Session {
            id: format!("session-{token}"),
            user_id: TEST_USER_ID.to_string(),
            token: token.to_string(),
            issued_at: now - Duration::minutes(5),
            expires_at: now + Duration::hours(1),
            last_seen_at: now,
        }
    }

    /// Session that expired an hour ago
    #[must_use]
    pub fn expired_session(token: &str) -> Session {
        let mut session = Self::live_session(token);
        session.issued_at = Utc::now() - Duration::hours(25);
        session.expires_at = Utc::now() - Duration::hours(1);
        session.last_seen_at = session.expires_at;
        session
    }

    /// Local development settings: loopback origins, no fixed cookie host
    #[must_use]
    pub fn settings() -> GatewaySettings {
        GatewaySettings::default()
    }

    /// Production settings for the `example.com` deployment
    #[must_use]
    pub fn production_settings() -> GatewaySettings {
        let mut settings = GatewaySettings::default();
        settings.application.environment = Environment::Production;
        settings.application.cookie_host = Some("api.example.com".to_string());
        settings.origins.front_url = Some(TEST_FRONT_ORIGIN.to_string());
        settings.origins.app_url = Some(TEST_APP_ORIGIN.to_string());
        settings.origins.api_url = Some(TEST_API_ORIGIN.to_string());
        settings
    }
}
