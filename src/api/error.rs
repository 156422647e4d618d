//! API error envelopes
//!
//! Every user-visible failure is a JSON envelope `{ error, ... }` with a
//! status code from the fixed kind table. CORS headers are attached by the
//! outer middleware layer, so they are not repeated here.

use axum::Json;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::api::middleware::RATE_WINDOW_SECS;
use crate::payment::RequirementsDoc;

#[derive(Debug)]
pub enum ApiError {
    /// No payment proof presented; answers with the requirement document.
    PaymentMissing(Box<RequirementsDoc>),
    /// Payment proof rejected; carries the reason.
    PaymentInvalid(String),
    BadRequest(String),
    GraphUnavailable(String),
    RateLimited,
    NotFound,
    MethodNotAllowed,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::PaymentMissing(doc) => {
                (StatusCode::PAYMENT_REQUIRED, Json(*doc)).into_response()
            }
            ApiError::PaymentInvalid(reason) => (
                StatusCode::PAYMENT_REQUIRED,
                Json(json!({ "error": "Payment failed", "reason": reason })),
            )
                .into_response(),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::GraphUnavailable(detail) => {
                error!(detail = %detail, "Knowledge graph unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "knowledge graph unavailable" })),
                )
                    .into_response()
            }
            ApiError::RateLimited => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "error": "Rate limit exceeded",
                        "retry_after_seconds": RATE_WINDOW_SECS,
                    })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert("Retry-After", HeaderValue::from(RATE_WINDOW_SECS));
                response
            }
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
            }
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(json!({ "error": "Method not allowed" })),
            )
                .into_response(),
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal error" })),
                )
                    .into_response()
            }
        }
    }
}
