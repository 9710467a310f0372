//! HTTP response construction
//!
//! Error bodies are shaped `{"error": ..., "error_description": ...}` and the common
//! ones are serialized once.

use actix_web::{cookie::Cookie, http::header, HttpResponse};
use serde_json::json;

static CACHED_RESPONSES: std::sync::LazyLock<CachedResponses> =
    std::sync::LazyLock::new(CachedResponses::new);

/// Pre-serialized JSON bodies for the errors the gateway returns most often
struct CachedResponses {
    unauthorized: String,
    invalid_session: String,
    invalid_request: String,
    bad_gateway: String,
}

impl CachedResponses {
    fn new() -> Self {
        Self {
            unauthorized: Self::create_json(
                "unauthorized",
                "Authentication is required to access this resource",
            ),
            invalid_session: Self::create_json(
                "invalid_session",
                "The session token is invalid or has expired",
            ),
            invalid_request: Self::create_json(
                "invalid_request",
                "The request is malformed or invalid",
            ),
            bad_gateway: Self::create_json("bad_gateway", "Failed to connect to upstream server"),
        }
    }

    fn create_json(error: &str, description: &str) -> String {
        json!({
            "error": error,
            "error_description": description
        })
        .to_string()
    }
}

fn json_body(mut builder: actix_web::HttpResponseBuilder, body: &str) -> HttpResponse {
    builder
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .body(body.to_owned())
}

/// Unified response builder
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// 401 for API callers without a live session
    #[must_use]
    pub fn unauthorized() -> HttpResponse {
        json_body(
            HttpResponse::Unauthorized(),
            &CACHED_RESPONSES.unauthorized,
        )
    }

    /// 401 for a session token the store does not vouch for
    #[must_use]
    pub fn invalid_session() -> HttpResponse {
        json_body(
            HttpResponse::Unauthorized(),
            &CACHED_RESPONSES.invalid_session,
        )
    }

    #[must_use]
    pub fn bad_request() -> HttpResponse {
        json_body(HttpResponse::BadRequest(), &CACHED_RESPONSES.invalid_request)
    }

    #[must_use]
    pub fn bad_gateway() -> HttpResponse {
        json_body(HttpResponse::BadGateway(), &CACHED_RESPONSES.bad_gateway)
    }

    /// Error with a custom code and message
    #[must_use]
    pub fn error(status: actix_web::http::StatusCode, code: &str, message: &str) -> HttpResponse {
        HttpResponse::build(status).json(json!({
            "error": code,
            "error_description": message
        }))
    }

    /// Create a redirect response (302 Found)
    #[must_use]
    pub fn redirect(location: &str) -> RedirectBuilder {
        RedirectBuilder::new(location)
    }

    /// 200 with a JSON body
    #[must_use]
    pub fn ok() -> JsonResponseBuilder {
        JsonResponseBuilder::default()
    }
}

/// Builder for redirect responses
pub struct RedirectBuilder {
    location: String,
    cookies: Vec<Cookie<'static>>,
}

impl RedirectBuilder {
    fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            cookies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    #[must_use]
    pub fn build(self) -> HttpResponse {
        let mut builder = HttpResponse::Found();
        for cookie in self.cookies {
            builder.cookie(cookie);
        }
        builder
            .insert_header((header::LOCATION, self.location))
            .finish()
    }
}

/// Builder for JSON success responses
#[derive(Default)]
pub struct JsonResponseBuilder {
    cookies: Vec<Cookie<'static>>,
}

impl JsonResponseBuilder {
    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    #[must_use]
    pub fn json<T: serde::Serialize>(self, data: &T) -> HttpResponse {
        let mut builder = HttpResponse::Ok();
        for cookie in self.cookies {
            builder.cookie(cookie);
        }
        builder.json(data)
    }
}

/// Convert an Actix method to a reqwest method
///
/// # Errors
///
/// Returns a 400 response if the method is not one the proxy forwards
pub fn convert_http_method(
    method: &actix_web::http::Method,
) -> Result<reqwest::Method, HttpResponse> {
    match method.as_str() {
        "GET" => Ok(reqwest::Method::GET),
        "POST" => Ok(reqwest::Method::POST),
        "PUT" => Ok(reqwest::Method::PUT),
        "DELETE" => Ok(reqwest::Method::DELETE),
        "PATCH" => Ok(reqwest::Method::PATCH),
        "HEAD" => Ok(reqwest::Method::HEAD),
        "OPTIONS" => Ok(reqwest::Method::OPTIONS),
        _ => Err(ResponseBuilder::error(
            actix_web::http::StatusCode::BAD_REQUEST,
            "unsupported_method",
            "HTTP method not supported",
        )),
    }
}

/// Join a request path (and optional query) onto an upstream base URL
///
/// # Errors
///
/// Returns a 502 response if the base URL cannot be parsed or the path cannot be joined
pub fn build_upstream_url(
    base_url: &str,
    request_path: &str,
    query: &str,
) -> Result<String, HttpResponse> {
    use log::{debug, warn};
    use url::Url;

    let base = Url::parse(base_url).map_err(|e| {
        warn!("Failed to parse upstream URL '{base_url}': {e}");
        ResponseBuilder::bad_gateway()
    })?;

    let clean_path = request_path.trim_start_matches('/');
    let mut final_url = base.join(clean_path).map_err(|e| {
        warn!("Failed to join '{base_url}' + '{clean_path}': {e}");
        ResponseBuilder::bad_gateway()
    })?;

    // Joining must never escape the configured upstream
    if final_url.origin() != base.origin() {
        warn!("Rejected upstream path escaping {base_url}: {request_path}");
        return Err(ResponseBuilder::bad_request());
    }

    if !query.is_empty() {
        final_url.set_query(Some(query));
    }

    debug!("Upstream URL: {final_url}");
    Ok(final_url.to_string())
}
