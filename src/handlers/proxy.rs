use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use reqwest::Client;

use crate::guard::RouteTable;
use crate::models::Session;
use crate::settings::GatewaySettings;
use crate::utils::headers::{
    RequestHeaderProcessor, ResponseHeaderProcessor, AUTH_SESSION_HEADER, AUTH_USER_HEADER,
};
use crate::utils::responses::{build_upstream_url, convert_http_method, ResponseBuilder};

/// HTTP client for making upstream requests
static CLIENT: std::sync::LazyLock<Client> = std::sync::LazyLock::new(Client::new);

/// Forward a request the guard let through to the upstream application
///
/// `path` is the canonical path the guard classified; it is what the upstream receives.
/// API paths go to `proxy.api_upstream_url` when configured, everything else to
/// `proxy.upstream_url`.
///
/// # Errors
///
/// Returns an error if reading the upstream response body fails
pub async fn forward_upstream(
    req: &HttpRequest,
    path: &str,
    body: &web::Bytes,
    settings: &GatewaySettings,
    routes: &RouteTable,
    session: Option<&Session>,
) -> ActixResult<HttpResponse> {
    let base_url = match (&settings.proxy.api_upstream_url, routes.is_api(path)) {
        (Some(api_upstream), true) => api_upstream.as_str(),
        _ => settings.proxy.upstream_url.as_str(),
    };

    match execute_upstream_request(req, path, body, base_url, session).await {
        Ok(upstream_response) => forward_response(upstream_response).await,
        Err(err_response) => Ok(err_response),
    }
}

async fn execute_upstream_request(
    req: &HttpRequest,
    path: &str,
    body: &web::Bytes,
    base_url: &str,
    session: Option<&Session>,
) -> Result<reqwest::Response, HttpResponse> {
    let upstream_url = build_upstream_url(base_url, path, req.query_string())?;
    let reqwest_method = convert_http_method(req.method())?;

    let mut request_builder = CLIENT.request(reqwest_method, &upstream_url);

    request_builder =
        RequestHeaderProcessor::for_proxy().forward_request_headers(req, request_builder);

    if let Some(session) = session {
        request_builder = request_builder
            .header(AUTH_USER_HEADER, session.user_id.as_str())
            .header(AUTH_SESSION_HEADER, session.id.as_str());
    }

    if !body.is_empty() {
        request_builder = request_builder.body(body.to_vec());
    }

    request_builder.send().await.map_err(|err| {
        log::warn!("Upstream request to {upstream_url} failed: {err}");
        ResponseBuilder::bad_gateway()
    })
}

async fn forward_response(upstream_response: reqwest::Response) -> ActixResult<HttpResponse> {
    let actix_status = actix_web::http::StatusCode::from_u16(upstream_response.status().as_u16())
        .unwrap_or(actix_web::http::StatusCode::BAD_GATEWAY);

    let mut response_builder = HttpResponse::build(actix_status);
    ResponseHeaderProcessor::for_proxy()
        .forward_response_headers(&upstream_response, &mut response_builder);

    let response_body = upstream_response.bytes().await.map_err(|err| {
        actix_web::error::ErrorBadGateway(format!("Failed to read upstream response: {err}"))
    })?;

    Ok(response_builder.body(response_body))
}
