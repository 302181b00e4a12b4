pub mod error;
pub mod routes;
pub mod state;

use std::future::Future;

use axum::routing::{get, post};
use axum::Router;
use hand_engine::EngineHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(engine: EngineHandle) -> Router {
    let app_state = state::AppState::new(engine);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(routes::status::healthz))
        // Events (SSE)
        .route("/events", get(routes::events::sse_events))
        // Engine state
        .route("/status", get(routes::status::status))
        .route("/current_positions", get(routes::status::current_positions))
        .route("/available_ports", get(routes::status::available_ports))
        .route("/executions", get(routes::status::list_executions))
        .route("/executions/{id}", get(routes::status::get_execution))
        // Motion
        .route("/connect", post(routes::motion::connect))
        .route("/disconnect", post(routes::motion::disconnect))
        .route("/update", post(routes::motion::update))
        .route("/default", post(routes::motion::move_to_default))
        .route("/execute", post(routes::motion::execute))
        // Gestures
        .route("/gestures", get(routes::gestures::get_document))
        .route("/save", post(routes::gestures::save_gesture))
        .route("/add_gesture", post(routes::gestures::add_gesture))
        .route("/remove_gesture", post(routes::gestures::remove_gesture))
        // Sequences
        .route("/add_sequence", post(routes::sequences::put_sequence))
        .route("/update_sequence", post(routes::sequences::put_sequence))
        .route("/delete_sequence", post(routes::sequences::delete_sequence))
        // Limits and settings
        .route("/servo_limits", get(routes::settings::get_limits))
        .route("/update_servo_limits", post(routes::settings::update_limits))
        .route("/settings", get(routes::settings::get_settings))
        .route("/update_settings", post(routes::settings::update_settings))
        // Calibration
        .route("/load_calibration", get(routes::calibration::load))
        .route("/save_calibration", post(routes::calibration::save))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Serve on a pre-bound listener until `shutdown` resolves.
///
/// On shutdown the engine stops accepting commands at once, in-flight HTTP
/// requests drain, and then the engine disables torque and releases the
/// serial device.
pub async fn serve_on(
    engine: EngineHandle,
    listener: tokio::net::TcpListener,
    open_browser: bool,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(engine.clone());

    tracing::info!("hand server listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}");
        let _ = open::that(&url);
    }

    let signalled = engine.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("shutdown requested; refusing new commands");
            signalled.stop_accepting();
        })
        .await?;

    engine.shutdown().await?;
    tracing::info!("hand server stopped");
    Ok(())
}
