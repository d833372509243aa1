//! Topic commands.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    domain::{ConnectionId, Message, ServerMessage, Topic, TopicId, TopicIdFactory, TopicName},
    usecase::{error::CommandError, manager::Manager},
};

use super::{CommandKind, Execute};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegisterTopic {
    #[serde(alias = "topic")]
    pub name: TopicName,
}

impl Execute for RegisterTopic {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError> {
        manager.register(Topic::new(TopicIdFactory::generate(), self.name));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UnregisterTopic {
    pub topic: TopicId,
}

impl Execute for UnregisterTopic {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError> {
        manager
            .unregister(&self.topic)
            .map(|_| ())
            .ok_or(CommandError::TopicNotFound(self.topic))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubscribeTopic {
    pub topic: TopicId,
    pub connection: ConnectionId,
}

impl Execute for SubscribeTopic {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError> {
        manager.subscribe(&self.topic, &self.connection);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UnsubscribeTopic {
    pub topic: TopicId,
    pub connection: ConnectionId,
}

impl Execute for UnsubscribeTopic {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError> {
        manager.unsubscribe(&self.topic, &self.connection);
        Ok(())
    }
}

/// Broadcast a payload to the subscribers of the given topics.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublishToTopics {
    pub connection: ConnectionId,
    pub topics: Vec<TopicId>,
    #[serde(default)]
    pub payload: Value,
}

impl Execute for PublishToTopics {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError> {
        // An empty list would widen the broadcast to every connection
        if self.topics.is_empty() {
            return Err(CommandError::InvalidArguments {
                command: CommandKind::PublishToTopics.to_string(),
                reason: "no target topics".to_string(),
            });
        }
        let published = ServerMessage::published(self.connection, self.topics.clone(), self.payload);
        manager.broadcast(Message::new(published).to_topics(self.topics));
        Ok(())
    }
}
