// Centralized logging helpers; session tokens never appear in logs
use log::info;
use sha2::{Digest, Sha256};

use crate::cors::OriginAllowlist;
use crate::session::cookie::CookiePolicy;
use crate::settings::Environment;

/// Short, stable fingerprint of a session token for log correlation
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest[..6].iter().map(|b| format!("{b:02x}")).collect()
}

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log the resolved environment and its cookie policy
    pub fn log_cookie_policy(environment: Environment, policy: Option<&CookiePolicy>) {
        info!("Environment: {environment:?}");
        match policy {
            Some(policy) => info!(
                "Session cookie policy: domain={:?} secure={} same_site={:?}",
                policy.domain(),
                policy.secure(),
                policy.same_site()
            ),
            None => info!("Session cookie policy follows the request host"),
        }
    }

    /// Log the origin allowlist
    pub fn log_allowlist(allowlist: &OriginAllowlist) {
        info!("Allowed application origins: {:?}", allowlist.known_origins());
        if let Some(root) = allowlist.wildcard_root_domain() {
            info!("Wildcard origins: https://*.{root}");
        }
    }
}
