use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Uniform `{ "error": ... }` payload shared by every workflow router.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (status, axum::Json(payload)).into_response()
}
