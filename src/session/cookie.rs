//! Session cookie policy and wire format
//!
//! The attribute set of the session cookie is decided once per environment (and per
//! host when the cookie domain follows the request host). A policy with
//! `SameSite=None` is always `Secure`: browsers silently drop the cookie otherwise.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::http::header::{HeaderMap, COOKIE};

use crate::domain::resolve_root_domain;
use crate::settings::Environment;

/// Fixed, versioned name of the session cookie
pub const SESSION_COOKIE_NAME: &str = "crossgate_session_v1";

/// Full attribute set for the session cookie
///
/// Only `CookiePolicyBuilder` constructs policies, so an invalid `SameSite=None` without
/// `Secure` combination cannot exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    domain: Option<String>,
    secure: bool,
    same_site: SameSite,
}

impl CookiePolicy {
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Always true: the session token is never readable from scripts
    #[must_use]
    pub fn http_only(&self) -> bool {
        true
    }

    #[must_use]
    pub fn same_site(&self) -> SameSite {
        self.same_site
    }

    #[must_use]
    pub fn path(&self) -> &'static str {
        "/"
    }

    /// Build the session cookie carrying `token`
    #[must_use]
    pub fn session_cookie(&self, token: &str, max_age: CookieDuration) -> Cookie<'static> {
        self.base_cookie(token.to_owned()).max_age(max_age).finish()
    }

    /// Build an expired session cookie that clears the one issued under this policy
    ///
    /// Domain, path and `SameSite` must match the issuing cookie or the browser keeps it.
    #[must_use]
    pub fn expired_cookie(&self) -> Cookie<'static> {
        self.base_cookie(String::new())
            .max_age(CookieDuration::seconds(-1))
            .finish()
    }

    fn base_cookie(&self, value: String) -> actix_web::cookie::CookieBuilder<'static> {
        let builder = Cookie::build(SESSION_COOKIE_NAME, value)
            .path(self.path())
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site);

        match &self.domain {
            Some(domain) => builder.domain(domain.clone()),
            None => builder,
        }
    }
}

/// Produces `CookiePolicy` values for an environment
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicyBuilder {
    environment: Environment,
    cross_site: Option<bool>,
}

impl CookiePolicyBuilder {
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            cross_site: None,
        }
    }

    /// Override whether the cooperating surfaces call each other cross-site.
    ///
    /// Defaults to production deployments scoped to a root domain, where the surfaces
    /// span several origins. Host-only cookies and loopback development use `Lax`.
    #[must_use]
    pub fn cross_site(mut self, cross_site: bool) -> Self {
        self.cross_site = Some(cross_site);
        self
    }

    /// Build the policy for an already resolved root domain
    #[must_use]
    pub fn build(&self, root_domain: Option<&str>) -> CookiePolicy {
        let is_production = self.environment.is_production();
        let cross_site = self
            .cross_site
            .unwrap_or(is_production && root_domain.is_some());

        let same_site = if cross_site {
            SameSite::None
        } else {
            SameSite::Lax
        };

        // SameSite=None without Secure is refused by browsers
        let secure = is_production || same_site == SameSite::None;

        // Loopback development hosts break when a Domain attribute is present
        let domain = if is_production {
            root_domain.map(str::to_owned)
        } else {
            None
        };

        CookiePolicy {
            domain,
            secure,
            same_site,
        }
    }

    /// Resolve the root domain of `hostname` and build the policy for it
    #[must_use]
    pub fn build_for_host(&self, hostname: &str) -> CookiePolicy {
        self.build(resolve_root_domain(hostname).as_deref())
    }
}

/// Cookie factory for issuing and clearing the session cookie
///
/// Holds a policy fixed at startup when a cookie host is configured; otherwise the policy
/// follows the host of each request (preview deployments on changing hostnames).
#[derive(Debug, Clone)]
pub struct CookieFactory {
    builder: CookiePolicyBuilder,
    fixed_policy: Option<CookiePolicy>,
    fallback_max_age: CookieDuration,
}

impl CookieFactory {
    #[must_use]
    pub fn new(
        builder: CookiePolicyBuilder,
        cookie_host: Option<&str>,
        fallback_max_age_hours: u64,
    ) -> Self {
        Self {
            builder,
            fixed_policy: cookie_host.map(|host| builder.build_for_host(host)),
            fallback_max_age: CookieDuration::hours(
                i64::try_from(fallback_max_age_hours).unwrap_or(24),
            ),
        }
    }

    /// Policy fixed at startup, if a cookie host was configured
    #[must_use]
    pub fn fixed_policy(&self) -> Option<&CookiePolicy> {
        self.fixed_policy.as_ref()
    }

    /// Policy that applies to a request arriving for `request_host`
    #[must_use]
    pub fn policy_for(&self, request_host: &str) -> CookiePolicy {
        self.fixed_policy.clone().unwrap_or_else(|| {
            self.builder
                .build_for_host(crate::domain::host_without_port(request_host))
        })
    }

    /// Session cookie living for the remaining session lifetime
    #[must_use]
    pub fn create_session_cookie(
        &self,
        request_host: &str,
        token: &str,
        remaining: chrono::Duration,
    ) -> Cookie<'static> {
        let max_age = if remaining > chrono::Duration::zero() {
            CookieDuration::seconds(remaining.num_seconds())
        } else {
            self.fallback_max_age
        };
        self.policy_for(request_host).session_cookie(token, max_age)
    }

    #[must_use]
    pub fn create_expired_cookie(&self, request_host: &str) -> Cookie<'static> {
        self.policy_for(request_host).expired_cookie()
    }
}

/// Split one `name=value` pair of a `Cookie` header into its session token, if it is one
///
/// Whitespace around the name is ignored so that extraction and filtering agree on
/// which pairs carry the session.
fn session_cookie_value(pair: &str) -> Option<&str> {
    pair.split_once('=')
        .filter(|(name, _)| name.trim() == SESSION_COOKIE_NAME)
        .map(|(_, value)| value.trim().trim_matches('"'))
}

/// Extract the session token from the `Cookie` header(s) of a request
///
/// An empty value counts as no token.
#[must_use]
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookie_str| cookie_str.split(';'))
        .find_map(session_cookie_value)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Filter cookies, removing the session cookie before forwarding upstream
#[must_use]
pub fn filter_session_cookie(cookie_str: &str) -> Option<String> {
    let filtered_cookies: Vec<&str> = cookie_str
        .split(';')
        .filter_map(|cookie| {
            let trimmed = cookie.trim();
            if trimmed.is_empty() || session_cookie_value(trimmed).is_some() {
                None
            } else {
                Some(trimmed)
            }
        })
        .collect();

    if filtered_cookies.is_empty() {
        None
    } else {
        Some(filtered_cookies.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    const ENVIRONMENTS: [Environment; 2] = [Environment::Development, Environment::Production];

    #[test]
    fn test_same_site_none_is_always_secure() {
        // The input space is finite: walk all of it
        for environment in ENVIRONMENTS {
            for cross_site in [None, Some(false), Some(true)] {
                for root_domain in [None, Some("example.com")] {
                    let mut builder = CookiePolicyBuilder::new(environment);
                    if let Some(cross_site) = cross_site {
                        builder = builder.cross_site(cross_site);
                    }
                    let policy = builder.build(root_domain);

                    assert!(policy.http_only());
                    assert_eq!(policy.path(), "/");
                    if policy.same_site() == SameSite::None {
                        assert!(
                            policy.secure(),
                            "{environment:?} cross_site={cross_site:?} domain={root_domain:?}"
                        );
                    }
                    assert_ne!(policy.same_site(), SameSite::Strict);
                }
            }
        }
    }

    #[test]
    fn test_production_policy() {
        let policy = CookiePolicyBuilder::new(Environment::Production).build(Some("example.com"));
        assert!(policy.secure());
        assert_eq!(policy.same_site(), SameSite::None);
        assert_eq!(policy.domain(), Some("example.com"));
    }

    #[test]
    fn test_development_policy() {
        let policy = CookiePolicyBuilder::new(Environment::Development).build(Some("example.com"));
        assert!(!policy.secure());
        assert_eq!(policy.same_site(), SameSite::Lax);
        assert_eq!(policy.domain(), None);
    }

    #[test]
    fn test_cross_site_in_development_forces_secure() {
        let policy = CookiePolicyBuilder::new(Environment::Development)
            .cross_site(true)
            .build(None);
        assert_eq!(policy.same_site(), SameSite::None);
        assert!(policy.secure());
    }

    #[test]
    fn test_same_site_production_can_opt_into_lax() {
        let policy = CookiePolicyBuilder::new(Environment::Production)
            .cross_site(false)
            .build(Some("example.com"));
        assert_eq!(policy.same_site(), SameSite::Lax);
        assert!(policy.secure());
        assert_eq!(policy.domain(), Some("example.com"));
    }

    #[test]
    fn test_build_for_loopback_host_has_no_domain() {
        let policy = CookiePolicyBuilder::new(Environment::Production).build_for_host("localhost");
        assert_eq!(policy.domain(), None);
        // Host-only cookie: nothing spans origins, so Lax is enough
        assert_eq!(policy.same_site(), SameSite::Lax);
        assert!(policy.secure());
    }

    #[test]
    fn test_production_without_root_domain_is_lax() {
        let policy = CookiePolicyBuilder::new(Environment::Production).build(None);
        assert_eq!(policy.same_site(), SameSite::Lax);
        assert_eq!(policy.domain(), None);
        assert!(policy.secure());
    }

    #[test]
    fn test_session_cookie_wire_format() {
        let policy = CookiePolicyBuilder::new(Environment::Production).build(Some("example.com"));
        let cookie = policy.session_cookie("opaque-token", CookieDuration::hours(1));

        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(cookie.value(), "opaque-token");

        let header = cookie.to_string();
        assert!(header.starts_with("crossgate_session_v1=opaque-token"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));
        assert!(header.contains("SameSite=None"));
        assert!(header.contains("Domain=example.com"));
    }

    #[test]
    fn test_development_cookie_wire_format() {
        let policy = CookiePolicyBuilder::new(Environment::Development).build(None);
        let header = policy
            .session_cookie("opaque-token", CookieDuration::hours(1))
            .to_string();

        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Lax"));
        assert!(!header.contains("Secure"));
        assert!(!header.contains("Domain="));
    }

    #[test]
    fn test_expired_cookie_matches_policy() {
        let policy = CookiePolicyBuilder::new(Environment::Production).build(Some("example.com"));
        let cookie = policy.expired_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.domain(), Some("example.com"));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert!(cookie.max_age().unwrap().whole_seconds() < 0);
    }

    #[test]
    fn test_factory_follows_request_host() {
        let factory = CookieFactory::new(
            CookiePolicyBuilder::new(Environment::Production),
            None,
            24,
        );
        assert_eq!(
            factory.policy_for("app.preview.example.dev:8443").domain(),
            Some("example.dev")
        );
        assert_eq!(factory.policy_for("localhost:3000").domain(), None);
    }

    #[test]
    fn test_factory_fixed_cookie_host() {
        let factory = CookieFactory::new(
            CookiePolicyBuilder::new(Environment::Production),
            Some("app.example.com"),
            24,
        );
        assert_eq!(
            factory.policy_for("other.host.net").domain(),
            Some("example.com")
        );
    }

    #[test]
    fn test_factory_uses_remaining_lifetime() {
        let factory = CookieFactory::new(
            CookiePolicyBuilder::new(Environment::Development),
            None,
            24,
        );
        let cookie =
            factory.create_session_cookie("localhost", "tok", chrono::Duration::minutes(30));
        assert_eq!(cookie.max_age(), Some(CookieDuration::minutes(30)));

        let cookie = factory.create_session_cookie("localhost", "tok", chrono::Duration::zero());
        assert_eq!(cookie.max_age(), Some(CookieDuration::hours(24)));
    }

    #[test]
    fn test_extract_session_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_session_token(&headers), None);

        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; crossgate_session_v1=abc123; lang=en"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));

        headers.insert(COOKIE, HeaderValue::from_static("crossgate_session_v1="));
        assert_eq!(extract_session_token(&headers), None);

        // Older versions of the cookie are not accepted
        headers.insert(COOKIE, HeaderValue::from_static("crossgate_session_v0=abc123"));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn test_filter_session_cookie() {
        assert_eq!(filter_session_cookie("crossgate_session_v1=abc123"), None);
        assert_eq!(
            filter_session_cookie("other=value; crossgate_session_v1=abc123; another=value2"),
            Some("other=value; another=value2".to_string())
        );
        assert_eq!(
            filter_session_cookie("cookie1=value1; cookie2=value2"),
            Some("cookie1=value1; cookie2=value2".to_string())
        );
        assert_eq!(filter_session_cookie(""), None);
    }

    #[test]
    fn test_extraction_and_filtering_agree_on_padded_names() {
        let raw = "theme=dark; crossgate_session_v1 =padded";
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static(raw));

        assert_eq!(extract_session_token(&headers).as_deref(), Some("padded"));
        assert_eq!(filter_session_cookie(raw), Some("theme=dark".to_string()));
    }
}
