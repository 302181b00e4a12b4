use axum::extract::State;
use axum::Json;
use hand_core::{HandError, Limits, Settings};

use crate::error::AppError;
use crate::state::AppState;

/// GET /servo_limits
pub async fn get_limits(State(app): State<AppState>) -> Json<Limits> {
    Json(app.store().limits())
}

/// POST /update_servo_limits — replace all limits. The body is the limits map
/// itself, keyed `servo_<id>`.
pub async fn update_limits(
    State(app): State<AppState>,
    Json(limits): Json<Limits>,
) -> Result<Json<Limits>, AppError> {
    app.ensure_accepting()?;
    let store = app.store();
    let result = tokio::task::spawn_blocking(move || {
        store.set_limits(limits)?;
        Ok::<_, HandError>(store.limits())
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    app.engine.limits_changed().await?;
    Ok(Json(result))
}

/// GET /settings
pub async fn get_settings(State(app): State<AppState>) -> Json<Settings> {
    Json(app.store().settings())
}

/// POST /update_settings — replace the settings object.
pub async fn update_settings(
    State(app): State<AppState>,
    Json(settings): Json<Settings>,
) -> Result<Json<Settings>, AppError> {
    app.ensure_accepting()?;
    let store = app.store();
    let result = tokio::task::spawn_blocking(move || {
        store.set_settings(settings)?;
        Ok::<_, HandError>(store.settings())
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}
