use actix_web::{HttpResponse, Result};

use crate::models::HealthResponse;

/// Health check endpoint
///
/// # Errors
///
/// This function does not return errors, but the signature allows for future error handling
pub async fn health() -> Result<HttpResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        message: "pong".to_string(),
    };
    Ok(HttpResponse::Ok().json(response))
}
