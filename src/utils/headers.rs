//! Header forwarding between the client and the upstream application

use actix_web::http::header::HOST;
use actix_web::{HttpRequest, HttpResponseBuilder};
use reqwest::RequestBuilder;

use crate::session::cookie::filter_session_cookie;

/// Identity headers set by the gateway after authoritative validation
pub const AUTH_USER_HEADER: &str = "X-Auth-Request-User";
pub const AUTH_SESSION_HEADER: &str = "X-Auth-Request-Session";

/// Whether the request prefers an HTML page over a JSON body
#[must_use]
pub fn is_browser_request(req: &HttpRequest) -> bool {
    req.headers()
        .get("accept")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| {
            accept.contains("text/html") || accept.contains("application/xhtml+xml")
        })
}

/// Host the client addressed, from `Host` (or the HTTP/2 authority)
///
/// `X-Forwarded-Host` and `Forwarded` are ignored: they are client-controlled here and
/// would let the caller pick the session cookie's domain.
#[must_use]
pub fn request_host(req: &HttpRequest) -> String {
    req.headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| req.uri().authority().map(actix_web::http::uri::Authority::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Check if a header is a hop-by-hop header that should not be forwarded
///
/// Based on RFC 2616 Section 13.5.1
#[must_use]
pub fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Identity headers are only trusted when the gateway sets them
fn is_identity_header(name: &str) -> bool {
    name.eq_ignore_ascii_case(AUTH_USER_HEADER) || name.eq_ignore_ascii_case(AUTH_SESSION_HEADER)
}

/// Header processing strategy for request forwarding
///
/// The gateway session cookie is always stripped; `Authorization` is passed through.
#[derive(Debug, Clone)]
pub struct RequestHeaderProcessor {
    /// Whether to filter hop-by-hop headers
    pub skip_hop_by_hop: bool,
}

impl Default for RequestHeaderProcessor {
    fn default() -> Self {
        Self {
            skip_hop_by_hop: true,
        }
    }
}

impl RequestHeaderProcessor {
    #[must_use]
    pub fn for_proxy() -> Self {
        Self::default()
    }

    /// Forward headers from an Actix `HttpRequest` to a reqwest `RequestBuilder`
    ///
    /// `Host` and `Content-Length` are left for reqwest to set. Client-supplied
    /// identity headers are always dropped.
    pub fn forward_request_headers(
        &self,
        req: &HttpRequest,
        mut request_builder: RequestBuilder,
    ) -> RequestBuilder {
        for (name, value) in req.headers() {
            let name_str = name.as_str().to_lowercase();

            if self.should_skip_header(&name_str) {
                continue;
            }

            if name_str == "cookie" {
                request_builder = Self::process_cookie_header(value, request_builder, name.as_str());
                continue;
            }

            if let Ok(value_str) = value.to_str() {
                request_builder = request_builder.header(name.as_str(), value_str);
            }
        }

        request_builder
    }

    fn should_skip_header(&self, name_str: &str) -> bool {
        if matches!(name_str, "host" | "content-length") || is_identity_header(name_str) {
            return true;
        }

        self.skip_hop_by_hop && is_hop_by_hop_header(name_str)
    }

    fn process_cookie_header(
        value: &actix_web::http::header::HeaderValue,
        mut request_builder: RequestBuilder,
        header_name: &str,
    ) -> RequestBuilder {
        if let Some(filtered_cookie) = value.to_str().ok().and_then(filter_session_cookie) {
            request_builder = request_builder.header(header_name, filtered_cookie);
        }
        request_builder
    }
}

/// Header processing strategy for response forwarding
#[derive(Debug, Clone)]
pub struct ResponseHeaderProcessor {
    /// Whether to filter hop-by-hop headers
    pub skip_hop_by_hop: bool,
}

impl Default for ResponseHeaderProcessor {
    fn default() -> Self {
        Self {
            skip_hop_by_hop: true,
        }
    }
}

impl ResponseHeaderProcessor {
    #[must_use]
    pub fn for_proxy() -> Self {
        Self::default()
    }

    /// Forward headers from a reqwest Response to an Actix `HttpResponseBuilder`
    ///
    /// Upstream CORS headers are dropped; the gateway owns the cross-origin policy.
    pub fn forward_response_headers(
        &self,
        upstream_response: &reqwest::Response,
        response_builder: &mut HttpResponseBuilder,
    ) {
        for (name, value) in upstream_response.headers() {
            let name_str = name.as_str().to_lowercase();

            if self.skip_hop_by_hop && is_hop_by_hop_header(&name_str) {
                continue;
            }
            if name_str.starts_with("access-control-") || name_str == "content-length" {
                continue;
            }

            if let Ok(value_str) = value.to_str() {
                response_builder.append_header((name.as_str(), value_str));
            }
        }
    }
}
