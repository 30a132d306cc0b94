use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::errors::PlanError;
use crate::wire::error_envelope;

/// Error surfaced to proxy clients as `{ "error": { "message" } }`.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request body or missing prompt (400)
    BadRequest(String),
    /// Anything but POST / OPTIONS (405)
    MethodNotAllowed,
    /// Failure while reaching upstream
    Plan(PlanError),
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        AppError::Plan(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string()),
            AppError::Plan(err) => {
                let status = match &err {
                    PlanError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    PlanError::Upstream { status, .. } => {
                        StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                    }
                    PlanError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                    PlanError::EmptyResponse | PlanError::InvalidPlanFormat => StatusCode::BAD_GATEWAY,
                    PlanError::MissingApiKey | PlanError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    tracing::error!(%status, "proxy request failed: {}", err);
                }
                (status, err.to_string())
            }
        };
        (status, Json(error_envelope(&message))).into_response()
    }
}
