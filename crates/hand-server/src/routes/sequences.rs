use axum::extract::State;
use axum::Json;
use hand_core::{HandError, SequenceStep};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceBody {
    sequence_id: String,
    sequence: Vec<SequenceStep>,
}

/// POST /add_sequence and POST /update_sequence — create or replace.
pub async fn put_sequence(
    State(app): State<AppState>,
    Json(body): Json<SequenceBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    app.ensure_accepting()?;
    if body.sequence_id.trim().is_empty() {
        return Err(AppError::bad_request("sequenceId must not be empty"));
    }
    let store = app.store();
    let result = tokio::task::spawn_blocking(move || {
        let steps = body.sequence.len();
        store.put_sequence(&body.sequence_id, body.sequence)?;
        Ok::<_, HandError>(serde_json::json!({ "sequenceId": body.sequence_id, "steps": steps }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSequenceBody {
    sequence_id: String,
}

/// POST /delete_sequence
pub async fn delete_sequence(
    State(app): State<AppState>,
    Json(body): Json<DeleteSequenceBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    app.ensure_accepting()?;
    let store = app.store();
    let result = tokio::task::spawn_blocking(move || {
        store.delete_sequence(&body.sequence_id)?;
        Ok::<_, HandError>(serde_json::json!({ "sequenceId": body.sequence_id }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}
