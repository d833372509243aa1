//! WebSocket connection handlers.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};

use crate::{
    domain::{Connection, ConnectionIdFactory, Outgoing, Socket, Timestamp},
    ui::state::AppState,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

/// How the reader side of a socket ended
enum ReadEnd {
    Closed,
    Failed(String),
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();

    // Frames the Manager queues for this socket
    let (outgoing, mut rx) = Socket::channel();
    let id = ConnectionIdFactory::generate();
    let connection = Connection::new(id, outgoing, Timestamp::now()).with_ip_address(addr.ip().to_string());

    if !state.handle.opened(connection) {
        tracing::warn!("Event loop is gone, rejecting connection from {}", addr);
        let _ = sender.send(Message::Close(None)).await;
        return;
    }
    tracing::info!(connection = %id, "Socket opened from {}", addr);

    let handle = state.handle.clone();

    // Spawn a task to forward frames from this client to the event loop
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => return ReadEnd::Failed(e.to_string()),
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!(connection = %id, "Received text: {}", text);
                    if !handle.received(id, text.as_str()) {
                        break;
                    }
                }
                Message::Close(_) => {
                    tracing::info!(connection = %id, "Client requested close");
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                _ => {}
            }
        }
        ReadEnd::Closed
    });

    // Spawn a task to write the frames the Manager queued for this client
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                Outgoing::Text(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Outgoing::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // If any one of the tasks completes, abort the other
    let end = tokio::select! {
        end = &mut recv_task => {
            send_task.abort();
            end.unwrap_or(ReadEnd::Closed)
        }
        _ = &mut send_task => {
            recv_task.abort();
            ReadEnd::Closed
        }
    };

    match end {
        ReadEnd::Closed => {
            state.handle.closed(id);
        }
        ReadEnd::Failed(cause) => {
            tracing::warn!(connection = %id, "WebSocket error: {}", cause);
            state.handle.errored(id, cause);
        }
    }
}
