//! Wire messages.
//!
//! [`ClientMessage`] is what connections send in; every inbound message carries its own
//! authorization policy. [`ServerMessage`] is what the server sends out; it is wrapped in a
//! [`Message`] (optional target topics) and stamped into an [`Envelope`] right before it
//! leaves through the broker.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{
    entity::{Connection, Topic},
    registry::{Connections, Notifications},
    value_object::{ConnectionId, SessionType, TopicId, TopicName},
};

/// Authorization strategy of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Always authorized.
    None,
    /// Authorized for admins, or when the message's subject is the sender itself.
    Client,
    /// Authorized for admins only.
    Admin,
}

impl Protection {
    /// Decide whether `sender` may send a message with the given subject.
    pub fn allows(&self, sender: &Connection, subject: Option<ConnectionId>) -> bool {
        match self {
            Self::None => true,
            Self::Client => sender.is_admin() || subject == Some(sender.id()),
            Self::Admin => sender.is_admin(),
        }
    }
}

/// Type tag of an inbound message, used as the listener binding key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Authenticate,
    JoinAsPlayer,
    JoinAsSpectator,
    DisconnectAll,
    DisconnectPlayers,
    DisconnectSpectators,
    StopServer,
    NotifyConnection,
    DismissNotifications,
    RegisterTopic,
    UnregisterTopic,
    Subscribe,
    Unsubscribe,
    Publish,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authenticate => "Authenticate",
            Self::JoinAsPlayer => "JoinAsPlayer",
            Self::JoinAsSpectator => "JoinAsSpectator",
            Self::DisconnectAll => "DisconnectAll",
            Self::DisconnectPlayers => "DisconnectPlayers",
            Self::DisconnectSpectators => "DisconnectSpectators",
            Self::StopServer => "StopServer",
            Self::NotifyConnection => "NotifyConnection",
            Self::DismissNotifications => "DismissNotifications",
            Self::RegisterTopic => "RegisterTopic",
            Self::UnregisterTopic => "UnregisterTopic",
            Self::Subscribe => "Subscribe",
            Self::Unsubscribe => "Unsubscribe",
            Self::Publish => "Publish",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound message decoded from a client's JSON text frame.
///
/// The JSON `name` field selects the variant; unknown names fail to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum ClientMessage {
    Authenticate {
        #[serde(default)]
        password: String,
    },
    JoinAsPlayer,
    JoinAsSpectator,
    DisconnectAll,
    DisconnectPlayers,
    DisconnectSpectators,
    StopServer,
    NotifyConnection {
        sender: ConnectionId,
        receiver: ConnectionId,
    },
    DismissNotifications {
        connection: ConnectionId,
    },
    /// `topic` carries the new topic's name; `name` is taken by the tag.
    RegisterTopic {
        topic: TopicName,
    },
    UnregisterTopic {
        topic: TopicId,
    },
    Subscribe {
        topic: TopicId,
        connection: ConnectionId,
    },
    Unsubscribe {
        topic: TopicId,
        connection: ConnectionId,
    },
    Publish {
        connection: ConnectionId,
        topics: Vec<TopicId>,
        #[serde(default)]
        payload: Value,
    },
}

impl ClientMessage {
    /// Decode a raw text frame.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Authenticate { .. } => MessageKind::Authenticate,
            Self::JoinAsPlayer => MessageKind::JoinAsPlayer,
            Self::JoinAsSpectator => MessageKind::JoinAsSpectator,
            Self::DisconnectAll => MessageKind::DisconnectAll,
            Self::DisconnectPlayers => MessageKind::DisconnectPlayers,
            Self::DisconnectSpectators => MessageKind::DisconnectSpectators,
            Self::StopServer => MessageKind::StopServer,
            Self::NotifyConnection { .. } => MessageKind::NotifyConnection,
            Self::DismissNotifications { .. } => MessageKind::DismissNotifications,
            Self::RegisterTopic { .. } => MessageKind::RegisterTopic,
            Self::UnregisterTopic { .. } => MessageKind::UnregisterTopic,
            Self::Subscribe { .. } => MessageKind::Subscribe,
            Self::Unsubscribe { .. } => MessageKind::Unsubscribe,
            Self::Publish { .. } => MessageKind::Publish,
        }
    }

    pub fn protection(&self) -> Protection {
        match self {
            Self::Authenticate { .. }
            | Self::JoinAsPlayer
            | Self::JoinAsSpectator
            | Self::NotifyConnection { .. } => Protection::None,
            Self::DismissNotifications { .. }
            | Self::Subscribe { .. }
            | Self::Unsubscribe { .. }
            | Self::Publish { .. } => Protection::Client,
            Self::DisconnectAll
            | Self::DisconnectPlayers
            | Self::DisconnectSpectators
            | Self::StopServer
            | Self::RegisterTopic { .. }
            | Self::UnregisterTopic { .. } => Protection::Admin,
        }
    }

    /// Connection the message acts on, as carried in its payload.
    pub fn subject(&self) -> Option<ConnectionId> {
        match self {
            Self::DismissNotifications { connection }
            | Self::Subscribe { connection, .. }
            | Self::Unsubscribe { connection, .. }
            | Self::Publish { connection, .. } => Some(*connection),
            _ => None,
        }
    }

    pub fn authorize(&self, sender: &Connection) -> bool {
        self.protection().allows(sender, self.subject())
    }

    /// Whether the message reacts on its own before listener dispatch.
    pub fn is_self_handling(&self) -> bool {
        matches!(
            self,
            Self::Authenticate { .. } | Self::JoinAsPlayer | Self::JoinAsSpectator
        )
    }

    /// Payload fields commands bound to this message are built from.
    ///
    /// The `name` tag is dropped; the disconnect variants gain the session `type` they
    /// target.
    pub fn fields(&self) -> Map<String, Value> {
        let mut fields = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        fields.remove("name");
        let target = match self {
            Self::DisconnectPlayers => Some(SessionType::Player),
            Self::DisconnectSpectators => Some(SessionType::Spectator),
            _ => None,
        };
        if let Some(session_type) = target {
            fields.insert("type".to_string(), Value::from(session_type.as_str()));
        }
        fields
    }

    /// The message as JSON, for echoing it back in a reply.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Status code sent with an authentication challenge.
pub const UNAUTHORIZED: u16 = 401;

/// Default status code of a `MessageException`.
pub const BAD_REQUEST: u16 = 400;

/// Outbound message body.
///
/// Serialized untagged; the `name` field is added by the [`Envelope`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    ConnectionEstablished {
        connection: Value,
    },
    ConnectionAuthenticated {
        connection: Value,
    },
    UpdateConnections {
        connections: Value,
    },
    UpdateTopics {
        topics: Value,
    },
    UpdateSubscriptions {
        subscriptions: Value,
    },
    UpdateNotifications {
        notifications: Value,
    },
    CurrentUptime {
        elapsed: f64,
        start: f64,
        now: f64,
    },
    PromptForAuthentication {
        previous: Value,
        message: String,
        code: u16,
    },
    MessageException {
        exception: String,
        message: String,
        code: u16,
    },
    Published {
        sender: ConnectionId,
        topics: Vec<TopicId>,
        payload: Value,
    },
}

impl ServerMessage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished { .. } => "ConnectionEstablished",
            Self::ConnectionAuthenticated { .. } => "ConnectionAuthenticated",
            Self::UpdateConnections { .. } => "UpdateConnections",
            Self::UpdateTopics { .. } => "UpdateTopics",
            Self::UpdateSubscriptions { .. } => "UpdateSubscriptions",
            Self::UpdateNotifications { .. } => "UpdateNotifications",
            Self::CurrentUptime { .. } => "CurrentUptime",
            Self::PromptForAuthentication { .. } => "PromptForAuthentication",
            Self::MessageException { .. } => "MessageException",
            Self::Published { .. } => "Published",
        }
    }

    pub fn connection_established(connection: &Connection) -> Self {
        Self::ConnectionEstablished {
            connection: serde_json::to_value(connection).unwrap_or_default(),
        }
    }

    pub fn connection_authenticated(connection: &Connection) -> Self {
        Self::ConnectionAuthenticated {
            connection: serde_json::to_value(connection).unwrap_or_default(),
        }
    }

    pub fn update_connections(connections: &Connections) -> Self {
        Self::UpdateConnections {
            connections: serde_json::to_value(connections).unwrap_or_default(),
        }
    }

    pub fn update_topics<'a>(topics: impl IntoIterator<Item = &'a Topic>) -> Self {
        let topics: Vec<&Topic> = topics.into_iter().collect();
        Self::UpdateTopics {
            topics: serde_json::to_value(topics).unwrap_or_default(),
        }
    }

    pub fn update_subscriptions<'a>(subscriptions: impl IntoIterator<Item = &'a Topic>) -> Self {
        let subscriptions: Vec<&Topic> = subscriptions.into_iter().collect();
        Self::UpdateSubscriptions {
            subscriptions: serde_json::to_value(subscriptions).unwrap_or_default(),
        }
    }

    pub fn update_notifications(notifications: &Notifications) -> Self {
        Self::UpdateNotifications {
            notifications: serde_json::to_value(notifications).unwrap_or_default(),
        }
    }

    /// Uptime report; all values are seconds.
    pub fn current_uptime(start: f64, now: f64) -> Self {
        Self::CurrentUptime {
            elapsed: (now - start).max(0.0),
            start,
            now,
        }
    }

    pub fn prompt_for_authentication(previous: Value) -> Self {
        Self::PromptForAuthentication {
            previous,
            message: "Authorization required.".to_string(),
            code: UNAUTHORIZED,
        }
    }

    pub fn exception(exception: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MessageException {
            exception: exception.into(),
            message: message.into(),
            code: BAD_REQUEST,
        }
    }

    pub fn published(sender: ConnectionId, topics: Vec<TopicId>, payload: Value) -> Self {
        Self::Published {
            sender,
            topics,
            payload,
        }
    }
}

/// Outbound message, optionally narrowed to subscribers of some topics.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    body: ServerMessage,
    topics: Vec<TopicId>,
}

impl Message {
    pub fn new(body: ServerMessage) -> Self {
        Self {
            body,
            topics: Vec::new(),
        }
    }

    /// Target the message at subscribers of any of `topics` when broadcast.
    pub fn to_topics(mut self, topics: Vec<TopicId>) -> Self {
        self.topics = topics;
        self
    }

    pub fn body(&self) -> &ServerMessage {
        &self.body
    }

    pub fn name(&self) -> &'static str {
        self.body.name()
    }

    pub fn topics(&self) -> &[TopicId] {
        &self.topics
    }

    /// Stamp the message for delivery.
    pub fn stamp(&self, id: Uuid, timestamp: f64) -> Envelope<'_> {
        Envelope {
            id,
            name: self.body.name(),
            timestamp,
            body: &self.body,
        }
    }
}

impl From<ServerMessage> for Message {
    fn from(body: ServerMessage) -> Self {
        Self::new(body)
    }
}

/// A stamped outbound message as it appears on the wire.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub id: Uuid,
    pub name: &'static str,
    /// Seconds since the epoch
    pub timestamp: f64,
    #[serde(flatten)]
    pub body: &'a ServerMessage,
}

impl Envelope<'_> {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
