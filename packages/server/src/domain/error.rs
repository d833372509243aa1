//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// ConnectionId is not a valid UUID
    #[error("ConnectionId must be a valid UUID format (got: {0})")]
    ConnectionIdInvalid(String),

    /// TopicId is not a valid UUID
    #[error("TopicId must be a valid UUID format (got: {0})")]
    TopicIdInvalid(String),

    /// TopicName validation error
    #[error("TopicName cannot be empty")]
    TopicNameEmpty,

    /// TopicName too long error
    #[error("TopicName cannot exceed {max} characters (got {actual})")]
    TopicNameTooLong { max: usize, actual: usize },
}
