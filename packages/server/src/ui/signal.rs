//! Process signal handling.

use tokio::sync::oneshot;

use crate::usecase::LoopHandle;

/// Resolve when the server should stop accepting connections.
///
/// Either a termination signal arrives, in which case the event loop is told to shut
/// down, or the event loop has already stopped on its own (`StopServer`, auto restart).
pub async fn shutdown_signal(handle: LoopHandle, stopped: oneshot::Receiver<()>) {
    tokio::select! {
        _ = terminate() => {
            tracing::info!("Shutdown signal received, stopping event loop");
            handle.shutdown();
        }
        _ = stopped => {
            tracing::info!("Event loop stopped, shutting down HTTP server");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::error!("Failed to install SIGTERM handler: {}", e);
            return ctrl_c().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = ctrl_c() => {},
    }
}

#[cfg(not(unix))]
async fn terminate() {
    ctrl_c().await
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
