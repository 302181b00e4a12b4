use axum::extract::State;
use axum::Json;
use hand_core::CalibrationFile;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

fn calibration_file(app: &AppState) -> Result<CalibrationFile, AppError> {
    app.calibration
        .clone()
        .ok_or_else(|| AppError::bad_request("calibration needs a file-backed gesture document"))
}

/// GET /load_calibration — stored calibration, `{"calibration": null}` if none.
pub async fn load(State(app): State<AppState>) -> Result<Json<Value>, AppError> {
    let file = calibration_file(&app)?;
    let result = tokio::task::spawn_blocking(move || file.load())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

#[derive(Deserialize)]
pub struct SaveBody {
    #[serde(default = "empty_object")]
    calibration: Value,
}

/// POST /save_calibration — replace the stored calibration blob.
pub async fn save(
    State(app): State<AppState>,
    Json(body): Json<SaveBody>,
) -> Result<Json<Value>, AppError> {
    app.ensure_accepting()?;
    let file = calibration_file(&app)?;
    let result = tokio::task::spawn_blocking(move || {
        let saved = file.save(body.calibration)?;
        tracing::info!(path = %file.path().display(), "saved hand calibration");
        Ok::<_, hand_core::HandError>(saved)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(result))
}
