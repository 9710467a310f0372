#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the crossgate application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app;
pub mod cors;
pub mod domain;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod session;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use app::{configure_services, GatewayComponents};
pub use cors::OriginAllowlist;
pub use domain::resolve_root_domain;
pub use error::{ConfigurationError, StoreError};
pub use guard::{GuardDecision, GuardOutcome, RouteClassification, RouteGuard};
pub use models::Session;
pub use session::{CookiePolicy, CookiePolicyBuilder, SessionOutcome, SessionValidator};
pub use settings::{Environment, GatewaySettings};
