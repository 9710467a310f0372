//! Testing utilities for crossgate
//!
//! Compiled for unit tests and, behind the `testing` feature, for the integration tests.
//!
//! - [`fixtures`] - pre-built sessions and settings
//! - [`mock`] - an in-memory [`SessionStore`](crate::session::SessionStore)
//! - [`requests`] - request and header builders

pub mod fixtures;
pub mod mock;
pub mod requests;

pub use fixtures::TestFixtures;
pub use mock::MockSessionStore;
pub use requests::{headers_with_session, RequestBuilder};

/// Common test constants
pub mod constants {
    pub const TEST_USER_ID: &str = "user-42";

    pub const TEST_SESSION_TOKEN: &str = "test-session-token";

    pub const TEST_ROOT_DOMAIN: &str = "example.com";
    pub const TEST_FRONT_ORIGIN: &str = "https://www.example.com";
    pub const TEST_APP_ORIGIN: &str = "https://app.example.com";
    pub const TEST_API_ORIGIN: &str = "https://api.example.com";

    pub const TEST_USER_AGENT: &str =
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";
}
