//! Root domain resolution for cookie scoping
//!
//! A cookie scoped to the root domain is sent to every cooperating sub-domain
//! (`www.example.com`, `app.example.com`, `api.example.com`). Loopback, IP literal and
//! single-label hosts never get a domain: the cookie stays host-only.
//!
//! Malformed input resolves to `None`. A missing domain only costs a second login on
//! another sub-domain, an overly broad one leaks the session.

use std::net::IpAddr;

/// Compute the domain a session cookie should be scoped to for `hostname`
///
/// Returns the last two labels of the hostname, without a leading dot.
///
/// ```
/// use crossgate::domain::resolve_root_domain;
///
/// assert_eq!(resolve_root_domain("app.boilerplate.example.com").as_deref(), Some("example.com"));
/// assert_eq!(resolve_root_domain("localhost"), None);
/// ```
#[must_use]
pub fn resolve_root_domain(hostname: &str) -> Option<String> {
    let host = hostname.trim().trim_start_matches('[').trim_end_matches(']');

    if host.is_empty() || host.eq_ignore_ascii_case("localhost") {
        return None;
    }

    // Any IP literal, loopback or not, cannot carry a domain attribute
    if host.parse::<IpAddr>().is_ok() {
        return None;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| !is_valid_label(label)) {
        return None;
    }

    let root = labels[labels.len() - 2..].join(".");
    Some(root.to_ascii_lowercase())
}

/// Strip an optional `:port` suffix (and IPv6 brackets) from a `Host` header value
#[must_use]
pub fn host_without_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

/// Whether `host` is a syntactically valid multi-label DNS name (not an IP literal)
#[must_use]
pub(crate) fn is_valid_domain(host: &str) -> bool {
    host.parse::<IpAddr>().is_err()
        && host.split('.').count() >= 2
        && host.split('.').all(is_valid_label)
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !label.starts_with('-')
        && !label.ends_with('-')
}
