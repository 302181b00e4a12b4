use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use hand_core::{ActuatorId, PositionRequest};
use hand_engine::{ConnectError, EngineError};
use serde::Deserialize;

use crate::error::{engine_status, AppError};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ConnectBody {
    device_name: String,
}

/// POST /connect — open the serial device and enable torque.
///
/// Answers `{status, message}` in both directions; failures also carry a
/// machine-readable `kind`.
pub async fn connect(
    State(app): State<AppState>,
    Json(body): Json<ConnectBody>,
) -> (StatusCode, Json<serde_json::Value>) {
    let device = body.device_name;
    match app.engine.connect(&device).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "connected",
                "message": format!("Connected to {device}"),
            })),
        ),
        Err(e) => {
            tracing::warn!(device = %device, "connect failed: {e}");
            let message = match &e {
                EngineError::Connect(ConnectError::PermissionDenied { path }) => {
                    permission_instructions(path, std::env::consts::OS)
                }
                other => other.to_string(),
            };
            (
                engine_status(&e),
                Json(serde_json::json!({
                    "status": "failed",
                    "message": message,
                    "kind": error_kind(&e),
                })),
            )
        }
    }
}

fn error_kind(e: &EngineError) -> &'static str {
    match e {
        EngineError::Connect(ConnectError::PortNotFound { .. }) => "port_not_found",
        EngineError::Connect(ConnectError::OpenFailed { .. }) => "open_failed",
        EngineError::Connect(ConnectError::BaudRateFailed { .. }) => "baud_rate_failed",
        EngineError::Connect(ConnectError::PermissionDenied { .. }) => "permission_denied",
        EngineError::Connect(ConnectError::TorqueEnableFailed { .. }) => "torque_enable_failed",
        EngineError::ShuttingDown | EngineError::Stopped => "shutting_down",
        _ => "internal",
    }
}

/// Remediation hint for a serial device the current user cannot open.
pub fn permission_instructions(device: &str, os: &str) -> String {
    let hint = match os {
        "linux" => format!(
            "Add your user to the 'dialout' group:\n  sudo usermod -a -G dialout $USER\n\
             then log out and back in. Alternatively change the port permissions:\n  \
             sudo chmod 666 {device}"
        ),
        "macos" => format!(
            "Ensure your user has access to serial ports, or change the port permissions:\n  \
             sudo chmod 666 {device}"
        ),
        "windows" => "Ensure no other program is using the port, or run the server as \
                      Administrator."
            .to_string(),
        _ => "Ensure your user has access to the serial port or run with elevated privileges."
            .to_string(),
    };
    format!("Permission denied for {device}. {hint}")
}

/// POST /disconnect — disable torque and release the device.
pub async fn disconnect(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    app.engine.disconnect().await?;
    Ok(Json(serde_json::json!({ "status": "disconnected" })))
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct UpdateBody {
    /// Slider values may arrive as floats; they are rounded before clamping.
    positions: BTreeMap<ActuatorId, f64>,
}

/// POST /update — clamp and write raw positions as one frame.
pub async fn update(
    State(app): State<AppState>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let request: PositionRequest = body
        .positions
        .into_iter()
        .map(|(id, value)| (id, value.round() as i64))
        .collect();
    let applied = app.engine.update_positions(request).await?;
    Ok(Json(serde_json::json!({ "positions": applied })))
}

/// POST /default — every actuator to its minimum; succeeds when disconnected.
pub async fn move_to_default(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    app.engine.move_to_default().await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

// ---------------------------------------------------------------------------
// Gestures
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ExecuteBody {
    gesture: String,
    #[serde(default)]
    thumb_clearance: bool,
}

/// POST /execute — queue a gesture and return its execution id immediately.
pub async fn execute(
    State(app): State<AppState>,
    Json(body): Json<ExecuteBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let ticket = app
        .engine
        .execute_gesture(&body.gesture, body.thumb_clearance)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "execution_id": ticket.id })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_instructions_name_the_device() {
        for os in ["linux", "macos", "windows", "freebsd"] {
            let text = permission_instructions("/dev/ttyUSB0", os);
            assert!(text.starts_with("Permission denied for /dev/ttyUSB0."));
        }
        assert!(permission_instructions("/dev/ttyUSB0", "linux").contains("dialout"));
        assert!(permission_instructions("COM3", "windows").contains("Administrator"));
    }

    #[test]
    fn error_kinds_are_stable() {
        let e = EngineError::from(ConnectError::PortNotFound {
            path: "x".into(),
            available: vec![],
        });
        assert_eq!(error_kind(&e), "port_not_found");
        assert_eq!(error_kind(&EngineError::ShuttingDown), "shutting_down");
    }
}
