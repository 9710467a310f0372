//! Origin allowlist and CORS headers for credentialed cross-origin requests
//!
//! Origins are compared on their normalised `scheme://host[:port]` form. In production an
//! optional wildcard root domain admits any `https` sub-domain, matched on the parsed
//! hostname with a dot boundary (`evil-example.com` is not a sub-domain of `example.com`).
//!
//! A disallowed origin is never answered with an error: its response simply carries no
//! CORS headers and the browser blocks it.

use actix_web::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use actix_web::HttpResponse;
use url::{Host, Url};

use crate::domain::is_valid_domain;
use crate::error::ConfigurationError;
use crate::settings::{Environment, GatewaySettings};

pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS, PATCH";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, Cookie, X-Requested-With, Accept";
pub const MAX_AGE_SECONDS: &str = "86400";

/// A normalised application origin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppOrigin(String);

impl AppOrigin {
    /// Parse an origin or application URL; any path, query or fragment is ignored
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an absolute http(s) URL with a host
    pub fn parse(value: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidOrigin {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(value.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host().is_none() {
            return Err(invalid("missing host"));
        }

        Ok(Self(url.origin().ascii_serialization()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AppOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decides which browser origins may call the API with credentials
#[derive(Debug, Clone)]
pub struct OriginAllowlist {
    known: Vec<AppOrigin>,
    wildcard_root_domain: Option<String>,
    environment: Environment,
}

impl OriginAllowlist {
    #[must_use]
    pub fn new(known: impl IntoIterator<Item = AppOrigin>, environment: Environment) -> Self {
        let mut origins: Vec<AppOrigin> = Vec::new();
        for origin in known {
            if !origins.contains(&origin) {
                origins.push(origin);
            }
        }
        Self {
            known: origins,
            wildcard_root_domain: None,
            environment,
        }
    }

    /// Admit `https://*.<root>` in production
    ///
    /// Accepts `example.com`, `.example.com` or `*.example.com`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not a valid multi-label domain
    pub fn with_wildcard_root_domain(mut self, root: &str) -> Result<Self, ConfigurationError> {
        let normalized = root
            .trim()
            .trim_start_matches("*.")
            .trim_start_matches('.')
            .to_ascii_lowercase();
        if !is_valid_domain(&normalized) {
            return Err(ConfigurationError::InvalidWildcardDomain(root.to_string()));
        }
        self.wildcard_root_domain = Some(normalized);
        Ok(self)
    }

    /// Build the allowlist from the configured application URLs
    ///
    /// # Errors
    ///
    /// Returns an error if any configured origin is malformed, no origin is configured,
    /// or the wildcard root domain is invalid
    pub fn from_settings(settings: &GatewaySettings) -> Result<Self, ConfigurationError> {
        let known = settings
            .get_known_origins()
            .iter()
            .map(|value| AppOrigin::parse(value))
            .collect::<Result<Vec<_>, _>>()?;
        if known.is_empty() {
            return Err(ConfigurationError::NoOrigins);
        }

        let allowlist = Self::new(known, settings.application.environment);
        match settings.origins.wildcard_root_domain.as_deref() {
            Some(root) => {
                if !settings.application.environment.is_production() {
                    log::info!("Wildcard origin domain '{root}' is ignored outside production");
                }
                allowlist.with_wildcard_root_domain(root)
            }
            None => Ok(allowlist),
        }
    }

    #[must_use]
    pub fn known_origins(&self) -> &[AppOrigin] {
        &self.known
    }

    #[must_use]
    pub fn wildcard_root_domain(&self) -> Option<&str> {
        self.wildcard_root_domain.as_deref()
    }

    /// Whether a request carrying this `Origin` header may proceed with CORS headers
    ///
    /// Requests without an `Origin` header (same-origin navigation, server-to-server)
    /// are always allowed.
    #[must_use]
    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => self.matches(origin),
        }
    }

    fn matches(&self, origin: &str) -> bool {
        let Ok(url) = Url::parse(origin.trim()) else {
            return false;
        };
        // Origin headers never carry credentials or a path
        if !url.username().is_empty() || url.password().is_some() {
            return false;
        }
        let Ok(candidate) = AppOrigin::parse(url.as_str()) else {
            return false;
        };

        if self.known.contains(&candidate) {
            return true;
        }

        self.matches_wildcard(&url)
    }

    fn matches_wildcard(&self, url: &Url) -> bool {
        let Some(root) = &self.wildcard_root_domain else {
            return false;
        };
        if !self.environment.is_production() || url.scheme() != "https" {
            return false;
        }
        match url.host() {
            Some(Host::Domain(host)) => {
                host.len() > root.len() + 1 && host.ends_with(root.as_str()) && {
                    let boundary = host.len() - root.len() - 1;
                    host.as_bytes()[boundary] == b'.'
                }
            }
            _ => false,
        }
    }

    /// CORS response headers for `origin`; empty unless the origin is present and allowed
    #[must_use]
    pub fn cors_headers(origin: Option<&str>, allowed: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let Some(origin) = origin.filter(|_| allowed) else {
            return headers;
        };
        let Ok(echoed) = HeaderValue::from_str(origin.trim()) else {
            return headers;
        };

        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, echoed);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(MAX_AGE_SECONDS),
        );
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        headers
    }

    /// Allow decision and headers for a request in one step
    #[must_use]
    pub fn headers_for(&self, origin: Option<&str>) -> HeaderMap {
        let allowed = self.is_allowed(origin);
        if !allowed {
            if let Some(origin) = origin {
                log::debug!("Origin '{origin}' is not allowed; omitting CORS headers");
            }
        }
        Self::cors_headers(origin, allowed)
    }
}

/// Copy computed CORS headers onto a response
pub fn apply_cors_headers(response: &mut HttpResponse, cors: &HeaderMap) {
    let headers = response.headers_mut();
    for (name, value) in cors {
        headers.insert(HeaderName::clone(name), value.clone());
    }
}

/// The request `Origin` header, if present and readable
#[must_use]
pub fn request_origin(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
}

/// Answer a CORS preflight: success, no body, whatever CORS headers were computed
#[must_use]
pub fn preflight_response(cors: &HeaderMap) -> HttpResponse {
    let mut response = HttpResponse::Ok().finish();
    apply_cors_headers(&mut response, cors);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;
    use actix_web::http::StatusCode;

    fn origins(values: &[&str]) -> Vec<AppOrigin> {
        values.iter().map(|v| AppOrigin::parse(v).unwrap()).collect()
    }

    fn production_with_wildcard() -> OriginAllowlist {
        OriginAllowlist::new(origins(&["https://example.com"]), Environment::Production)
            .with_wildcard_root_domain("example.com")
            .unwrap()
    }

    #[test]
    fn test_origin_normalisation() {
        assert_eq!(
            AppOrigin::parse("https://App.Example.com/dashboard?x=1")
                .unwrap()
                .as_str(),
            "https://app.example.com"
        );
        assert_eq!(
            AppOrigin::parse("https://example.com:443").unwrap().as_str(),
            "https://example.com"
        );
        assert_eq!(
            AppOrigin::parse("http://localhost:3000/").unwrap().as_str(),
            "http://localhost:3000"
        );
        assert!(AppOrigin::parse("example.com").is_err());
        assert!(AppOrigin::parse("ftp://example.com").is_err());
    }

    #[test]
    fn test_missing_origin_is_allowed() {
        let allowlist = OriginAllowlist::new(Vec::new(), Environment::Production);
        assert!(allowlist.is_allowed(None));
    }

    #[test]
    fn test_exact_match() {
        let allowlist = OriginAllowlist::new(
            origins(&["https://www.example.com", "http://localhost:3000"]),
            Environment::Development,
        );
        assert!(allowlist.is_allowed(Some("https://www.example.com")));
        assert!(allowlist.is_allowed(Some("http://localhost:3000")));
        assert!(!allowlist.is_allowed(Some("http://localhost:3001")));
        assert!(!allowlist.is_allowed(Some("http://www.example.com")));
    }

    #[test]
    fn test_lookalike_domains_are_rejected() {
        let allowlist = OriginAllowlist::new(origins(&["https://example.com"]), Environment::Production);
        assert!(!allowlist.is_allowed(Some("https://evil-example.com")));
        assert!(!allowlist.is_allowed(Some("https://example.com.evil.net")));

        let allowlist = production_with_wildcard();
        assert!(!allowlist.is_allowed(Some("https://evil-example.com")));
        assert!(!allowlist.is_allowed(Some("https://notexample.com")));
        assert!(!allowlist.is_allowed(Some("https://app.example.com.evil.net")));
    }

    #[test]
    fn test_wildcard_subdomains_in_production() {
        let allowlist = production_with_wildcard();
        assert!(allowlist.is_allowed(Some("https://app.example.com")));
        assert!(allowlist.is_allowed(Some("https://pr-42.preview.example.com")));
        // Bare root is only allowed because it is listed explicitly
        assert!(allowlist.is_allowed(Some("https://example.com")));
        // Wildcard requires https
        assert!(!allowlist.is_allowed(Some("http://app.example.com")));
    }

    #[test]
    fn test_bare_root_not_covered_by_wildcard() {
        let allowlist = OriginAllowlist::new(Vec::new(), Environment::Production)
            .with_wildcard_root_domain("*.example.com")
            .unwrap();
        assert!(!allowlist.is_allowed(Some("https://example.com")));
        assert!(allowlist.is_allowed(Some("https://app.example.com")));
    }

    #[test]
    fn test_wildcard_ignored_in_development() {
        let allowlist = OriginAllowlist::new(Vec::new(), Environment::Development)
            .with_wildcard_root_domain("example.com")
            .unwrap();
        assert!(!allowlist.is_allowed(Some("https://app.example.com")));
    }

    #[test]
    fn test_invalid_wildcard_root() {
        for root in ["com", "", "10.0.0.1", "*"] {
            assert!(
                OriginAllowlist::new(Vec::new(), Environment::Production)
                    .with_wildcard_root_domain(root)
                    .is_err(),
                "root {root}"
            );
        }
    }

    #[test]
    fn test_unparsable_origins_are_rejected() {
        let allowlist = production_with_wildcard();
        assert!(!allowlist.is_allowed(Some("null")));
        assert!(!allowlist.is_allowed(Some("")));
        assert!(!allowlist.is_allowed(Some("https://user:pw@app.example.com")));
    }

    #[test]
    fn test_cors_headers_echo_origin() {
        let headers = OriginAllowlist::cors_headers(Some("https://app.example.com"), true);
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example.com"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            ALLOW_METHODS
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            ALLOW_HEADERS
        );
        assert_eq!(headers.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "86400");
    }

    #[test]
    fn test_no_cors_headers_when_disallowed_or_absent() {
        assert!(OriginAllowlist::cors_headers(Some("https://evil.com"), false).is_empty());
        assert!(OriginAllowlist::cors_headers(None, true).is_empty());
    }

    #[test]
    fn test_from_settings() {
        let mut settings = GatewaySettings::default();
        settings.application.environment = Environment::Production;
        settings.origins.wildcard_root_domain = Some("example.com".to_string());
        let allowlist = OriginAllowlist::from_settings(&settings).unwrap();
        assert_eq!(allowlist.known_origins().len(), 3);
        assert_eq!(allowlist.wildcard_root_domain(), Some("example.com"));

        settings.origins.front_url = Some("not a url".to_string());
        assert!(matches!(
            OriginAllowlist::from_settings(&settings),
            Err(ConfigurationError::InvalidOrigin { .. })
        ));

        let mut settings = GatewaySettings::default();
        settings.origins.front_url = None;
        settings.origins.app_url = None;
        settings.origins.api_url = None;
        assert!(matches!(
            OriginAllowlist::from_settings(&settings),
            Err(ConfigurationError::NoOrigins)
        ));
    }

    #[test]
    fn test_preflight_response_has_no_body() {
        let cors = OriginAllowlist::cors_headers(Some("https://app.example.com"), true);
        let response = preflight_response(&cors);
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
        assert_eq!(response.into_body().size(), actix_web::body::BodySize::Sized(0));
    }
}
