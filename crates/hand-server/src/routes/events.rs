use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use hand_engine::EngineEvent;

use crate::state::AppState;

/// GET /events — SSE stream of `positions`, `connection` and `execution`
/// events. Lagged receivers skip what they missed. The stream ends when the
/// engine starts shutting down so graceful shutdown is not held open.
pub async fn sse_events(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let rx = app.engine.subscribe();
    let stream = BroadcastStream::new(rx)
        .filter_map(|msg| msg.ok())
        .take_while(|event| !matches!(event, EngineEvent::ShuttingDown))
        .filter_map(|event| {
            let data = serde_json::to_string(&event).ok()?;
            Some(Ok::<Event, Infallible>(
                Event::default().event(event.kind()).data(data),
            ))
        });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
