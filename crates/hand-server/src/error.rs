use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hand_core::HandError;
use hand_engine::{CommandError, ConnectError, EngineError, GestureError};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Internal sentinel for explicit status codes
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
#[error("{0}")]
struct BadRequestError(String);

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }

    pub fn status(&self) -> StatusCode {
        if self.0.downcast_ref::<BadRequestError>().is_some() {
            return StatusCode::BAD_REQUEST;
        }
        if let Some(e) = self.0.downcast_ref::<HandError>() {
            return hand_status(e);
        }
        if let Some(e) = self.0.downcast_ref::<EngineError>() {
            return engine_status(e);
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn hand_status(e: &HandError) -> StatusCode {
    match e {
        HandError::GestureNotFound(_) | HandError::SequenceNotFound(_) | HandError::NotFound(_) => {
            StatusCode::NOT_FOUND
        }
        HandError::GestureExists(_)
        | HandError::InvalidActuatorKey(_)
        | HandError::InvalidLimit { .. }
        | HandError::MissingLimits
        | HandError::UnknownActuator(_)
        | HandError::GestureActuator { .. }
        | HandError::SequenceGesture { .. } => StatusCode::BAD_REQUEST,
        HandError::Io(_) | HandError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Status code for an engine failure. Shared with the connect route, which
/// answers with its own body shape.
pub fn engine_status(e: &EngineError) -> StatusCode {
    match e {
        EngineError::ShuttingDown | EngineError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::ExecutionNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Connect(e) => match e {
            ConnectError::PortNotFound { .. } => StatusCode::NOT_FOUND,
            ConnectError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            ConnectError::OpenFailed { .. }
            | ConnectError::BaudRateFailed { .. }
            | ConnectError::TorqueEnableFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        },
        EngineError::Command(e) => command_status(e),
        EngineError::Gesture(e) => match e {
            GestureError::NotFound(_) => StatusCode::NOT_FOUND,
            GestureError::MissingActuator(_) => StatusCode::BAD_REQUEST,
            GestureError::Command { source, .. } => command_status(source),
        },
    }
}

fn command_status(e: &CommandError) -> StatusCode {
    match e {
        CommandError::NotConnected => StatusCode::CONFLICT,
        CommandError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        CommandError::UnknownActuator(_) => StatusCode::BAD_REQUEST,
        CommandError::TransmitFailed { .. } | CommandError::ActuatorError { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "request failed: {:#}", self.0);
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
