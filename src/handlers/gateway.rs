use actix_web::http::{Method, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};

use crate::cors::{apply_cors_headers, preflight_response, request_origin, OriginAllowlist};
use crate::guard::{GuardOutcome, RouteGuard};
use crate::handlers::proxy::forward_upstream;
use crate::session::cookie::{extract_session_token, CookieFactory};
use crate::settings::GatewaySettings;
use crate::utils::headers::{is_browser_request, request_host};
use crate::utils::path::canonicalize_path;
use crate::utils::responses::ResponseBuilder;

/// Catch-all edge handler
///
/// Canonical path -> CORS (API paths only) -> preflight short-circuit -> route guard ->
/// upstream. The canonical path is both the one classified and the one forwarded.
///
/// # Errors
///
/// Returns an error if the upstream response body cannot be read
pub async fn gateway(
    req: HttpRequest,
    body: web::Bytes,
    allowlist: web::Data<OriginAllowlist>,
    guard: web::Data<RouteGuard>,
    cookies: web::Data<CookieFactory>,
    settings: web::Data<GatewaySettings>,
) -> ActixResult<HttpResponse> {
    let path = match canonicalize_path(req.path()) {
        Ok(path) => path,
        Err(rejection) => {
            log::debug!("Refused request path {}: {rejection:?}", req.path());
            return Ok(ResponseBuilder::bad_request());
        }
    };
    let routes = guard.routes();
    let is_api = routes.is_api(&path);

    let cors = if is_api {
        allowlist.headers_for(request_origin(req.headers()))
    } else {
        actix_web::http::header::HeaderMap::new()
    };

    if is_api && req.method() == Method::OPTIONS {
        return Ok(preflight_response(&cors));
    }

    let decision = guard.evaluate(&path, req.headers()).await;
    let mut clear_session = decision.clears_session();
    let (outcome, session) = decision.into_parts();

    let mut response = match outcome {
        GuardOutcome::Continue => {
            let upstream =
                forward_upstream(&req, &path, &body, &settings, routes, session.as_ref()).await?;

            // The upstream refused the identity we vouched for: send pages back to login
            if upstream.status() == StatusCode::UNAUTHORIZED && !is_api && is_browser_request(&req)
            {
                clear_session = extract_session_token(req.headers()).is_some();
                ResponseBuilder::redirect(routes.login_path()).build()
            } else {
                upstream
            }
        }
        GuardOutcome::RedirectTo(location) => ResponseBuilder::redirect(&location).build(),
        GuardOutcome::Reject(status) if status == StatusCode::UNAUTHORIZED => {
            ResponseBuilder::unauthorized()
        }
        GuardOutcome::Reject(status) => HttpResponse::build(status).finish(),
    };

    if clear_session {
        let expired = cookies.create_expired_cookie(&request_host(&req));
        if let Err(e) = response.add_cookie(&expired) {
            log::warn!("Failed to expire rejected session cookie: {e}");
        }
    }

    apply_cors_headers(&mut response, &cors);
    Ok(response)
}
