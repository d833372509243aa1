//! Transport boundary.
//!
//! The core never touches sockets directly. Each [`Connection`] carries a [`Socket`]
//! (the sending half of its writer channel) and a [`Broker`] turns payloads into
//! [`Outgoing`] frames for it.

use thiserror::Error;
use tokio::sync::mpsc;

use super::{ConnectionId, entity::Connection};

/// Frame queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Deliver raw bytes (a JSON text frame).
    Text(String),
    /// Close the socket after everything queued before it has been written.
    Close,
}

/// Handle to the writer side of one live socket.
#[derive(Debug, Clone)]
pub struct Socket {
    sender: mpsc::UnboundedSender<Outgoing>,
}

impl Socket {
    pub fn new(sender: mpsc::UnboundedSender<Outgoing>) -> Self {
        Self { sender }
    }

    /// Create a socket together with the receiver its writer task drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }

    /// Queue a frame. Returns `false` when the writer side is gone.
    pub fn push(&self, frame: Outgoing) -> bool {
        self.sender.send(frame).is_ok()
    }

    /// Whether the writer task has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Errors reported by the transport for a single connection
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The socket's writer task is no longer running
    #[error("Connection {0} is no longer writable")]
    Disconnected(ConnectionId),
}

/// Outbound half of the transport boundary.
#[cfg_attr(test, mockall::automock)]
pub trait Broker: Send {
    /// Send raw bytes to one connection.
    fn deliver(&self, connection: &Connection, payload: &str) -> Result<(), TransportError>;

    /// Send raw bytes to one connection and close it right after.
    fn deliver_and_close(&self, connection: &Connection, payload: &str)
    -> Result<(), TransportError>;

    /// Close the connection's socket without sending anything.
    fn close(&self, connection: &Connection);
}
