use anyhow::Context;
use hand_core::GestureStore;
use hand_engine::{EngineConfig, EngineHandle, SerialTransport};
use std::path::Path;
use std::sync::Arc;

pub fn run(document: &Path, bind: &str, port: u16, open: bool) -> anyhow::Result<()> {
    let store = GestureStore::open(document)
        .with_context(|| format!("failed to load {}", document.display()))?;
    tracing::info!(
        document = %document.display(),
        actuators = store.limits().len(),
        gestures = store.gesture_names().len(),
        "loaded gesture document"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let engine = EngineHandle::spawn(store, Arc::new(SerialTransport), EngineConfig::default());
        let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
            .await
            .with_context(|| format!("failed to bind {bind}:{port}"))?;
        let actual_port = listener.local_addr()?.port();
        println!("Hand controller → http://localhost:{actual_port}");

        hand_server::serve_on(engine, listener, open, shutdown_signal()).await
    })
}

/// Resolves on ctrl-c, or on SIGTERM where the platform has it.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
