//! Hiroba: a publish/subscribe connection server.
//!
//! Long-lived WebSocket sessions are multiplexed over a single event loop that owns the
//! connection and topic registries, dispatches inbound messages to listeners as commands,
//! and runs timers and queued jobs between ticks.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::{AppConfig, Args};
pub use ui::run;
