use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use hand_core::{ActuatorId, HandError, PositionRequest};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// GET /gestures — the whole document: limits, gestures, sequences, settings.
pub async fn get_document(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(app.store().document()))
}

#[derive(Deserialize)]
pub struct SaveBody {
    gesture: String,
    positions: BTreeMap<ActuatorId, f64>,
}

/// POST /save — clamp and store a gesture, replacing any with the same name.
pub async fn save_gesture(
    State(app): State<AppState>,
    Json(body): Json<SaveBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    app.ensure_accepting()?;
    let name = valid_name(body.gesture)?;
    let request: PositionRequest = body
        .positions
        .into_iter()
        .map(|(id, value)| (id, value.round() as i64))
        .collect();
    let store = app.store();
    let result = tokio::task::spawn_blocking(move || {
        let positions = store.save_gesture(&name, &request)?;
        tracing::info!(gesture = %name, "saved gesture");
        Ok::<_, HandError>(serde_json::json!({ "gesture": name, "positions": positions }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

#[derive(Deserialize)]
pub struct GestureBody {
    gesture: String,
}

/// POST /add_gesture — new gesture with every actuator at its minimum.
pub async fn add_gesture(
    State(app): State<AppState>,
    Json(body): Json<GestureBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    app.ensure_accepting()?;
    let name = valid_name(body.gesture)?;
    let store = app.store();
    let result = tokio::task::spawn_blocking(move || {
        let positions = store.add_gesture(&name)?;
        Ok::<_, HandError>(serde_json::json!({ "gesture": name, "positions": positions }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// POST /remove_gesture — delete a gesture and every sequence step using it.
pub async fn remove_gesture(
    State(app): State<AppState>,
    Json(body): Json<GestureBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    app.ensure_accepting()?;
    let store = app.store();
    let name = body.gesture;
    let result = tokio::task::spawn_blocking(move || {
        let removed_steps = store.remove_gesture(&name)?;
        tracing::info!(gesture = %name, removed_steps, "removed gesture");
        Ok::<_, HandError>(serde_json::json!({ "gesture": name, "removed_steps": removed_steps }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

fn valid_name(name: String) -> Result<String, AppError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("gesture name must not be empty"));
    }
    Ok(name)
}
