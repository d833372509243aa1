//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{ConnectionId, QueueError, TopicId, ValueObjectError};

/// Errors raised while building or running a command
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    /// No command type is registered under this name
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Payload fields do not fit the command's arguments
    #[error("Invalid arguments for {command}: {reason}")]
    InvalidArguments { command: String, reason: String },

    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    #[error("Topic {0} not found")]
    TopicNotFound(TopicId),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Topic(#[from] ValueObjectError),
}

/// Errors returned by `Manager` operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ManagerError {
    /// Inbound payload is not a recognized client message
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    #[error("Topic {0} not found")]
    TopicNotFound(TopicId),

    #[error(transparent)]
    Command(#[from] CommandError),
}
