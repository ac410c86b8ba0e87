use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error taxonomy from spec §7, each carrying the HTTP status it renders as
/// and shaping a Kubernetes `Status` object on the wire (never a bare JSON
/// error body — client libraries parse this exact shape).
///
/// Mirrors the teacher's `ServerError`: a status, a user-facing message, and
/// an optional `anyhow::Error` source that is logged (not exposed) on 5xx.
#[derive(Debug)]
pub struct FacadeError {
    pub status: StatusCode,
    pub reason: &'static str,
    pub message: String,
    pub source: Option<anyhow::Error>,
}

impl FacadeError {
    pub fn new(status: StatusCode, reason: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            reason,
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NotFound", message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED, "MethodNotAllowed", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BadRequest", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "Conflict", message)
    }

    pub fn internal(source: anyhow::Error, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            reason: "InternalError",
            message: message.into(),
            source: Some(source),
        }
    }
}

impl IntoResponse for FacadeError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = self.status.as_u16(),
                reason = self.reason,
                message = %self.message,
                error = ?self.source,
                "facade request failed"
            );
        }

        let body = Json(json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": self.message,
            "reason": self.reason,
            "code": self.status.as_u16(),
        }));

        (self.status, body).into_response()
    }
}

pub type FacadeResult<T> = Result<T, FacadeError>;
