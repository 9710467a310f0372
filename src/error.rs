//! Error types for the gateway
//!
//! Configuration problems are fatal and surface at startup. Session store problems are
//! recoverable and are folded into a `SessionOutcome` by the validator, so they never
//! reach a client.

use thiserror::Error;

/// Startup configuration failures
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown environment '{0}' (expected 'development' or 'production')")]
    UnknownEnvironment(String),

    #[error("invalid application origin '{value}': {reason}")]
    InvalidOrigin { value: String, reason: String },

    #[error("no application origins configured")]
    NoOrigins,

    #[error("invalid wildcard root domain '{0}'")]
    InvalidWildcardDomain(String),

    #[error("invalid session store URL '{0}'")]
    InvalidStoreUrl(String),

    #[error("invalid route prefix '{0}' (must start with '/')")]
    InvalidRoutePrefix(String),

    #[error("route '{0}' would redirect to itself")]
    RedirectLoop(String),

    #[error("failed to read settings file: {0}")]
    SettingsFile(String),
}

/// Failures talking to the external session store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    #[error("session store lookup timed out")]
    Timeout,

    #[error("malformed session store response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}
