//! Shared state of the HTTP and WebSocket handlers.

use crate::{infrastructure::JobProducer, usecase::LoopHandle};

/// Shared application state
///
/// Handlers never touch the Manager directly; everything goes through the event loop.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Mailbox of the event loop that owns the Manager
    pub handle: LoopHandle,
    /// Producer side of the job queue the Manager polls
    pub jobs: JobProducer,
    /// Name of the queue the Manager polls
    pub queue: String,
}
