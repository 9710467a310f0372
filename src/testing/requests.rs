//! HTTP request builders for testing handlers

use actix_web::http::header::{HeaderMap, HeaderValue, COOKIE};
use actix_web::http::Method;
use actix_web::{test, HttpRequest};
use serde_json::Value;

use super::constants::TEST_USER_AGENT;
use crate::session::cookie::SESSION_COOKIE_NAME;

/// Header map carrying only a session cookie
///
/// # Panics
///
/// Panics if `token` is not a valid header value
#[must_use]
pub fn headers_with_session(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        COOKIE,
        HeaderValue::from_str(&format!("{SESSION_COOKIE_NAME}={token}")).unwrap(),
    );
    headers
}

/// Builder for test requests
pub struct RequestBuilder {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            uri: "/".to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.to_string();
        self
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set common browser headers
    #[must_use]
    pub fn browser_headers(self) -> Self {
        self.header("User-Agent", TEST_USER_AGENT).header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
    }

    /// Set common API headers
    #[must_use]
    pub fn api_headers(self) -> Self {
        self.header("Accept", "application/json")
            .header("Content-Type", "application/json")
    }

    /// Cross-origin request from `origin`
    #[must_use]
    pub fn origin(self, origin: &str) -> Self {
        self.header("Origin", origin)
    }

    #[must_use]
    pub fn host(self, host: &str) -> Self {
        self.header("Host", host)
    }

    /// Attach the gateway session cookie
    #[must_use]
    pub fn with_session_cookie(self, token: &str) -> Self {
        self.with_cookie_header(&format!("{SESSION_COOKIE_NAME}={token}"))
    }

    /// Add cookies from a cookie header string
    #[must_use]
    pub fn with_cookie_header(self, cookies: &str) -> Self {
        self.header("Cookie", cookies)
    }

    #[must_use]
    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Build an actix `TestRequest`, for `call_service`
    #[must_use]
    pub fn to_test_request(self) -> test::TestRequest {
        let mut req = test::TestRequest::default()
            .method(self.method)
            .uri(&self.uri);

        for (name, value) in self.headers {
            req = req.insert_header((name, value));
        }

        if let Some(body) = self.body {
            req = req.set_json(body);
        }

        req
    }

    #[must_use]
    pub fn build(self) -> HttpRequest {
        self.to_test_request().to_http_request()
    }
}

/// Quick builder functions for common request types
impl RequestBuilder {
    /// Browser-like GET request
    #[must_use]
    pub fn browser(uri: &str) -> HttpRequest {
        Self::new().uri(uri).browser_headers().build()
    }

    /// API GET request
    #[must_use]
    pub fn api(uri: &str) -> HttpRequest {
        Self::new().uri(uri).api_headers().build()
    }

    /// Request with cookies from a cookie header string
    #[must_use]
    pub fn with_cookies(cookies: &str) -> HttpRequest {
        Self::new().with_cookie_header(cookies).build()
    }
}
