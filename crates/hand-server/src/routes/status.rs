use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}

/// GET /current_positions — last confirmed position per actuator.
pub async fn current_positions(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(app.engine.snapshot_positions()))
}

/// GET /available_ports — serial devices present on this host.
pub async fn available_ports(State(app): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let ports = app.engine.available_ports().await?;
    Ok(Json(ports))
}

/// GET /status — connection state and whether commands are accepted.
pub async fn status(State(app): State<AppState>) -> Json<serde_json::Value> {
    let status = app.engine.connection_status();
    Json(serde_json::json!({
        "connected": status.connected,
        "device": status.device,
        "accepting": app.engine.is_accepting(),
    }))
}

/// GET /executions/{id}
pub async fn get_execution(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::bad_request(format!("invalid execution id: {id}")))?;
    let record = app.engine.execution(id)?;
    Ok(Json(serde_json::json!(record)))
}

/// GET /executions — recent executions, newest first.
pub async fn list_executions(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(app.engine.executions()))
}
