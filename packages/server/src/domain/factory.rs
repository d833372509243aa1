//! Domain factories for creating domain entities and value objects.

use uuid::Uuid;

use super::{ConnectionId, TopicId};

/// Factory for generating ConnectionId instances.
///
/// Keeps id generation separate from the parsing/validation logic in ConnectionId.
pub struct ConnectionIdFactory;

impl ConnectionIdFactory {
    /// Generate a new ConnectionId with a random UUID v4.
    pub fn generate() -> ConnectionId {
        ConnectionId::from_uuid(Uuid::new_v4())
    }
}

/// Factory for generating TopicId instances.
pub struct TopicIdFactory;

impl TopicIdFactory {
    /// Generate a new TopicId with a random UUID v4.
    pub fn generate() -> TopicId {
        TopicId::from_uuid(Uuid::new_v4())
    }
}
