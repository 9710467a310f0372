//! Session cookie endpoints
//!
//! The only places this layer writes the session cookie. Each response carries CORS headers
//! for allowed origins so the front surface can call these with credentials.

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::cors::{apply_cors_headers, preflight_response, request_origin, OriginAllowlist};
use crate::guard::RouteGuard;
use crate::models::{Session, SessionInfo};
use crate::session::cookie::{extract_session_token, CookieFactory};
use crate::session::validator::SessionOutcome;
use crate::utils::headers::request_host;
use crate::utils::responses::ResponseBuilder;

/// Body of `POST /auth/session`
#[derive(Debug, Deserialize)]
pub struct IssueSessionRequest {
    /// Token issued by the credential verifier
    pub token: String,
}

fn with_cors(req: &HttpRequest, allowlist: &OriginAllowlist, mut response: HttpResponse) -> HttpResponse {
    apply_cors_headers(&mut response, &allowlist.headers_for(request_origin(req.headers())));
    response
}

fn session_response(req: &HttpRequest, cookies: &CookieFactory, session: &Session) -> HttpResponse {
    let cookie = cookies.create_session_cookie(
        &request_host(req),
        &session.token,
        session.remaining_at(Utc::now()),
    );
    ResponseBuilder::ok()
        .with_cookie(cookie)
        .json(&SessionInfo::from(session))
}

/// `OPTIONS /auth/*`
pub async fn auth_preflight(
    req: HttpRequest,
    allowlist: web::Data<OriginAllowlist>,
) -> HttpResponse {
    preflight_response(&allowlist.headers_for(request_origin(req.headers())))
}

/// `POST /auth/session`: exchange a verifier-issued token for the session cookie
pub async fn issue_session(
    req: HttpRequest,
    payload: web::Json<IssueSessionRequest>,
    allowlist: web::Data<OriginAllowlist>,
    guard: web::Data<RouteGuard>,
    cookies: web::Data<CookieFactory>,
) -> HttpResponse {
    let token = payload.token.trim();
    if token.is_empty() {
        return with_cors(
            &req,
            &allowlist,
            ResponseBuilder::error(StatusCode::BAD_REQUEST, "missing_token", "Missing session token"),
        );
    }

    let response = match guard.validator().validate_token(token).await {
        SessionOutcome::Valid(session) => {
            log::info!("Issued session cookie for user {}", session.user_id);
            session_response(&req, &cookies, &session)
        }
        SessionOutcome::Absent | SessionOutcome::Invalid => ResponseBuilder::invalid_session(),
    };
    with_cors(&req, &allowlist, response)
}

/// `POST /auth/session/refresh`: extend the presented session and re-issue the cookie
pub async fn refresh_session(
    req: HttpRequest,
    allowlist: web::Data<OriginAllowlist>,
    guard: web::Data<RouteGuard>,
    cookies: web::Data<CookieFactory>,
) -> HttpResponse {
    let Some(token) = extract_session_token(req.headers()) else {
        return with_cors(&req, &allowlist, ResponseBuilder::unauthorized());
    };

    let validator = guard.validator();
    let response = match validator.validate_token(&token).await {
        SessionOutcome::Valid(_) => match validator.refresh_token(&token).await {
            SessionOutcome::Valid(session) => session_response(&req, &cookies, &session),
            SessionOutcome::Absent | SessionOutcome::Invalid => ResponseBuilder::unauthorized(),
        },
        SessionOutcome::Absent | SessionOutcome::Invalid => ResponseBuilder::unauthorized(),
    };
    with_cors(&req, &allowlist, response)
}

/// `GET|POST /auth/sign_out`: clear the cookie and go to the login page
///
/// The store record is left alone; revoking it belongs to the credential verifier.
pub async fn sign_out(
    req: HttpRequest,
    allowlist: web::Data<OriginAllowlist>,
    guard: web::Data<RouteGuard>,
    cookies: web::Data<CookieFactory>,
) -> HttpResponse {
    let response = ResponseBuilder::redirect(guard.routes().login_path())
        .with_cookie(cookies.create_expired_cookie(&request_host(&req)))
        .build();
    with_cors(&req, &allowlist, response)
}
