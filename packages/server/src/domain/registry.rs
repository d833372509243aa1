//! In-memory entity registries.
//!
//! Plain collections keyed by identity. They are owned and mutated only by the
//! Manager, so none of them needs interior locking. Removal of an absent entity is a
//! no-op everywhere.

use std::collections::BTreeSet;

use serde::Serialize;

use super::{
    entity::{Connection, Notification, Topic},
    value_object::{ConnectionId, SessionType, TopicId},
};

/// All currently open sessions, in the order they were opened.
#[derive(Debug, Default)]
pub struct Connections {
    items: Vec<Connection>,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection.
    ///
    /// Returns `false` and leaves the registry untouched when the id is already present.
    pub fn add(&mut self, connection: Connection) -> bool {
        if self.contains(&connection.id()) {
            return false;
        }
        self.items.push(connection);
        true
    }

    /// Remove a connection by id, returning it if it was present.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Connection> {
        let index = self.items.iter().position(|c| &c.id() == id)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.items.iter().find(|c| &c.id() == id)
    }

    pub fn get_mut(&mut self, id: &ConnectionId) -> Option<&mut Connection> {
        self.items.iter_mut().find(|c| &c.id() == id)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        self.items.iter().map(Connection::id).collect()
    }

    /// Connections of the given session type.
    pub fn of_type(&self, session_type: SessionType) -> Vec<&Connection> {
        self.items
            .iter()
            .filter(|c| c.session_type() == session_type)
            .collect()
    }

    /// Connections subscribed to at least one of the given topics.
    pub fn in_topics(&self, topics: &[TopicId]) -> Vec<&Connection> {
        self.items
            .iter()
            .filter(|c| topics.iter().any(|topic| c.is_subscribed(topic)))
            .collect()
    }
}

impl Serialize for Connections {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

/// All registered topics, in registration order.
#[derive(Debug, Default)]
pub struct Topics {
    items: Vec<Topic>,
}

impl Topics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a topic. Returns `false` if a topic with the same id exists.
    pub fn add(&mut self, topic: Topic) -> bool {
        if self.contains(&topic.id()) {
            return false;
        }
        self.items.push(topic);
        true
    }

    /// Remove a topic, first unsubscribing every subscriber from it.
    ///
    /// Both sides of the relation are updated: each subscribed connection loses the
    /// topic from its subscription set and the removed topic is returned with an empty
    /// subscriber set.
    pub fn remove(&mut self, id: &TopicId, connections: &mut Connections) -> Option<Topic> {
        let index = self.items.iter().position(|t| &t.id() == id)?;
        let mut topic = self.items.remove(index);
        for subscriber in topic.clear_subscriptions() {
            if let Some(connection) = connections.get_mut(&subscriber) {
                connection.unsubscribe(id);
            }
        }
        Some(topic)
    }

    pub fn get(&self, id: &TopicId) -> Option<&Topic> {
        self.items.iter().find(|t| &t.id() == id)
    }

    pub fn get_mut(&mut self, id: &TopicId) -> Option<&mut Topic> {
        self.items.iter_mut().find(|t| &t.id() == id)
    }

    pub fn contains(&self, id: &TopicId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.items.iter()
    }

    /// Topics whose ids are in the given set, in registration order.
    pub fn subset<'a>(&'a self, ids: &'a BTreeSet<TopicId>) -> impl Iterator<Item = &'a Topic> {
        self.items.iter().filter(move |t| ids.contains(&t.id()))
    }
}

impl Serialize for Topics {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

/// A connection's inbox, keyed by sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notifications {
    items: Vec<Notification>,
}

impl Notifications {
    /// Insert a notification, replacing any earlier one from the same sender.
    pub fn put(&mut self, notification: Notification) {
        match self
            .items
            .iter_mut()
            .find(|n| n.sender() == notification.sender())
        {
            Some(existing) => *existing = notification,
            None => self.items.push(notification),
        }
    }

    pub fn get(&self, sender: &ConnectionId) -> Option<&Notification> {
        self.items.iter().find(|n| &n.sender() == sender)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }
}

impl Serialize for Notifications {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}
