//! Error-response helpers shared by the handlers.
//!
//! Three body shapes, matching the frontend contract:
//! - validation failures: 400 `{"<field>": ["<message>"]}`
//! - today-view filter failures: 400 `{"error": "<message>"}`
//! - auth / missing-resource failures: 401/404 `{"detail": "<message>"}`

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::hours::HoursError;

/// Handler error type: status code plus JSON body (the tuple form
/// axum turns into a response).
pub type ApiError = (StatusCode, Json<Value>);

/// Message for a required field that was not sent.
pub const REQUIRED: &str = "Este campo es requerido.";

/// 400 with a single-field error map.
pub fn field_error(field: &str, message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ field: [message] })))
}

/// 400 with a bare `error` body (today-view filters).
pub fn query_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

/// 404 with the generic detail.
pub fn not_found() -> ApiError {
    not_found_detail("No encontrado.")
}

/// 404 with a specific detail message.
pub fn not_found_detail(detail: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": detail })))
}

/// 401 with a detail message.
pub fn unauthorized(detail: &str) -> ApiError {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail })))
}

/// 500 with an opaque detail; the underlying error goes to the log.
pub fn internal<E: std::fmt::Display>(err: E) -> ApiError {
    tracing::error!("request failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "Error interno del servidor." })),
    )
}

/// Field message for a rejected decimal-hours value.
pub fn hours_message(err: HoursError) -> &'static str {
    match err {
        HoursError::Invalid => "Se requiere un número válido.",
        HoursError::TooManyDecimals => "No puede haber más de 2 decimales.",
        HoursError::TooManyDigits => "No puede haber más de 4 dígitos en total.",
    }
}

/// Field message for a referenced id the caller does not own.
pub fn invalid_pk_message(id: uuid::Uuid) -> String {
    format!("Clave primaria \"{}\" inválida - objeto no existe.", id)
}
