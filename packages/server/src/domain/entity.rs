//! Core domain models: connections, topics and notifications.

use std::collections::BTreeSet;

use serde::Serialize;

use super::{
    broker::Socket,
    registry::Notifications,
    value_object::{ConnectionId, SessionType, Timestamp, TopicId, TopicName},
};

/// One live client session.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    /// Connection identifier, immutable once assigned
    #[serde(rename = "uuid")]
    id: ConnectionId,
    /// Current session type
    #[serde(rename = "type")]
    session_type: SessionType,
    /// Whether the session authenticated with the shared secret
    admin: bool,
    /// Display name
    name: Option<String>,
    email: Option<String>,
    ip_address: Option<String>,
    /// Timestamp when the socket was opened
    #[serde(rename = "timestamp")]
    opened_at: Timestamp,
    /// Topics this connection is subscribed to
    subscriptions: BTreeSet<TopicId>,
    #[serde(skip)]
    notifications: Notifications,
    #[serde(skip)]
    socket: Socket,
}

impl Connection {
    /// Create an anonymous, non-admin connection with no subscriptions.
    pub fn new(id: ConnectionId, socket: Socket, opened_at: Timestamp) -> Self {
        Self {
            id,
            session_type: SessionType::default(),
            admin: false,
            name: None,
            email: None,
            ip_address: None,
            opened_at,
            subscriptions: BTreeSet::new(),
            notifications: Notifications::default(),
            socket,
        }
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn set_session_type(&mut self, session_type: SessionType) {
        self.session_type = session_type;
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn set_admin(&mut self, admin: bool) {
        self.admin = admin;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn opened_at(&self) -> Timestamp {
        self.opened_at
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn subscriptions(&self) -> &BTreeSet<TopicId> {
        &self.subscriptions
    }

    pub fn is_subscribed(&self, topic: &TopicId) -> bool {
        self.subscriptions.contains(topic)
    }

    /// Record a subscription on the connection side only.
    ///
    /// The topic side must be updated in the same step; see `Manager::subscribe`.
    pub fn subscribe(&mut self, topic: TopicId) {
        self.subscriptions.insert(topic);
    }

    pub fn unsubscribe(&mut self, topic: &TopicId) {
        self.subscriptions.remove(topic);
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut Notifications {
        &mut self.notifications
    }
}

/// A named publish channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topic {
    /// Topic identifier, assigned at creation
    #[serde(rename = "uuid")]
    id: TopicId,
    name: TopicName,
    /// Connections subscribed to the topic
    subscriptions: BTreeSet<ConnectionId>,
}

impl Topic {
    pub fn new(id: TopicId, name: TopicName) -> Self {
        Self {
            id,
            name,
            subscriptions: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> TopicId {
        self.id
    }

    pub fn name(&self) -> &TopicName {
        &self.name
    }

    pub fn subscriptions(&self) -> &BTreeSet<ConnectionId> {
        &self.subscriptions
    }

    pub fn has_subscriber(&self, connection: &ConnectionId) -> bool {
        self.subscriptions.contains(connection)
    }

    pub fn subscribe(&mut self, connection: ConnectionId) {
        self.subscriptions.insert(connection);
    }

    pub fn unsubscribe(&mut self, connection: &ConnectionId) {
        self.subscriptions.remove(connection);
    }

    /// Drop every subscriber, returning who was subscribed.
    pub fn clear_subscriptions(&mut self) -> BTreeSet<ConnectionId> {
        std::mem::take(&mut self.subscriptions)
    }
}

/// A per-connection inbox entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    sender: ConnectionId,
    timestamp: Timestamp,
}

impl Notification {
    pub fn new(sender: ConnectionId, timestamp: Timestamp) -> Self {
        Self { sender, timestamp }
    }

    pub fn sender(&self) -> ConnectionId {
        self.sender
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}
