//! Server bootstrap: wires the event loop, the job queue and the Axum router.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{any, get, post},
};
use tokio::{net::TcpListener, sync::oneshot};
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::{
    config::AppConfig,
    error::ServerError,
    infrastructure::{InMemoryJobQueue, SocketBroker},
    ui::{
        handler::{enqueue_job, get_connections, get_topics, health_check, websocket_handler},
        signal::shutdown_signal,
        state::AppState,
    },
    usecase::EventLoop,
};

/// Build the router over an already running event loop.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", any(websocket_handler))
        .route("/api/health", get(health_check))
        .route("/api/connections", get(get_connections))
        .route("/api/topics", get(get_topics))
        .route("/api/jobs", post(enqueue_job))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}

/// Run the server until a shutdown signal arrives or the Manager stops itself.
pub async fn run(config: AppConfig) -> Result<(), ServerError> {
    let (queue, jobs) = InMemoryJobQueue::channel();
    let (event_loop, handle) = EventLoop::new(
        config.manager.clone(),
        Box::new(SocketBroker::new()),
        Box::new(queue),
    );

    let (stopped_tx, stopped_rx) = oneshot::channel();
    let loop_task = tokio::spawn(async move {
        event_loop.run().await;
        let _ = stopped_tx.send(());
    });

    let state = Arc::new(AppState {
        handle: handle.clone(),
        jobs,
        queue: config.manager.queue.clone(),
    });
    let app = create_router(state);

    let addr = config.server.addr();
    let listener = TcpListener::bind(addr.as_str())
        .await
        .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(handle.clone(), stopped_rx))
    .await?;

    // No-op when the loop already stopped itself
    handle.shutdown();
    if let Err(e) = loop_task.await {
        tracing::error!("Event loop task failed: {}", e);
    }

    tracing::info!("Server stopped");
    Ok(())
}
