//! Listeners: bindings from message kinds to the command kinds that react to them.

use std::collections::HashMap;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::MessageKind;

use super::{
    command::{Command, CommandKind},
    error::CommandError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Commands built for one listener from one message, in binding order.
pub type Reaction = Vec<Result<Command, CommandError>>;

/// A named bundle of message -> command bindings.
#[derive(Debug, Clone)]
pub struct Listener {
    id: ListenerId,
    name: String,
    bindings: HashMap<MessageKind, Vec<CommandKind>>,
}

impl Listener {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ListenerId::generate(),
            name: name.into(),
            bindings: HashMap::new(),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append `command` to the commands run for `message`.
    ///
    /// Registering the same pair twice makes the command run twice per message.
    pub fn register(&mut self, message: MessageKind, command: CommandKind) -> &mut Self {
        self.bindings.entry(message).or_default().push(command);
        self
    }

    /// Builder form of [`Listener::register`].
    pub fn on(mut self, message: MessageKind, command: CommandKind) -> Self {
        self.register(message, command);
        self
    }

    /// Drop the whole binding for `message`, or only every occurrence of `command` in it.
    pub fn unregister(&mut self, message: MessageKind, command: Option<CommandKind>) -> &mut Self {
        match command {
            None => {
                self.bindings.remove(&message);
            }
            Some(command) => {
                if let Some(commands) = self.bindings.get_mut(&message) {
                    commands.retain(|c| *c != command);
                    if commands.is_empty() {
                        self.bindings.remove(&message);
                    }
                }
            }
        }
        self
    }

    /// Commands bound to `message`, in binding order. Empty when unbound.
    pub fn commands(&self, message: MessageKind) -> &[CommandKind] {
        self.bindings
            .get(&message)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every message kind that triggers `command`.
    pub fn messages(&self, command: CommandKind) -> Vec<MessageKind> {
        let mut messages: Vec<MessageKind> = self
            .bindings
            .iter()
            .filter(|(_, commands)| commands.contains(&command))
            .map(|(message, _)| *message)
            .collect();
        messages.sort_by_key(|m| m.as_str());
        messages
    }

    pub fn handles(&self, message: MessageKind) -> bool {
        !self.commands(message).is_empty()
    }

    /// Build the bound commands for a message from its payload fields.
    ///
    /// A command whose arguments do not fit the fields yields an error in its slot; the
    /// other commands are still built.
    pub fn handle(&self, message: MessageKind, fields: &Map<String, Value>) -> Reaction {
        self.commands(message)
            .iter()
            .map(|kind| kind.build(fields.clone()))
            .collect()
    }
}

/// Every listener attached to the Manager, in registration order.
#[derive(Debug, Default)]
pub struct Listeners {
    items: Vec<Listener>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Listener) -> ListenerId {
        let id = listener.id();
        self.items.push(listener);
        id
    }

    /// Detach a listener. Absent ids are ignored.
    pub fn remove(&mut self, id: ListenerId) -> Option<Listener> {
        let index = self.items.iter().position(|l| l.id() == id)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, id: ListenerId) -> Option<&Listener> {
        self.items.iter().find(|l| l.id() == id)
    }

    pub fn get_mut(&mut self, id: ListenerId) -> Option<&mut Listener> {
        self.items.iter_mut().find(|l| l.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Listener> {
        self.items.iter()
    }

    /// Listeners with at least one command bound to `message`.
    pub fn for_message(&self, message: MessageKind) -> impl Iterator<Item = &Listener> {
        self.items.iter().filter(move |l| l.handles(message))
    }

    /// Listeners that run `command` for some message.
    pub fn for_command(&self, command: CommandKind) -> impl Iterator<Item = &Listener> {
        self.items
            .iter()
            .filter(move |l| !l.messages(command).is_empty())
    }

    /// Fan a message out to every matching listener.
    ///
    /// Returns each matching listener's name with the commands it built, so the caller
    /// can run them one by one and keep a failure in one from affecting the rest.
    pub fn handle(&self, message: MessageKind, fields: &Map<String, Value>) -> Vec<(String, Reaction)> {
        self.for_message(message)
            .map(|l| (l.name().to_string(), l.handle(message, fields)))
            .collect()
    }
}

/// Forced disconnects by session type.
pub fn connection_pool() -> Listener {
    Listener::new("ConnectionPool")
        .on(MessageKind::DisconnectAll, CommandKind::CloseConnections)
        .on(MessageKind::DisconnectPlayers, CommandKind::CloseConnections)
        .on(MessageKind::DisconnectSpectators, CommandKind::CloseConnections)
}

/// Per-connection notification inbox.
pub fn notifier() -> Listener {
    Listener::new("Notifier")
        .on(MessageKind::NotifyConnection, CommandKind::NotifyConnection)
        .on(MessageKind::DismissNotifications, CommandKind::DismissNotifications)
}

pub fn server_admin() -> Listener {
    Listener::new("ServerAdmin").on(MessageKind::StopServer, CommandKind::StopServer)
}

/// Topic registration, subscriptions and publishing.
pub fn topic_board() -> Listener {
    Listener::new("TopicBoard")
        .on(MessageKind::RegisterTopic, CommandKind::RegisterTopic)
        .on(MessageKind::UnregisterTopic, CommandKind::UnregisterTopic)
        .on(MessageKind::Subscribe, CommandKind::SubscribeTopic)
        .on(MessageKind::Unsubscribe, CommandKind::UnsubscribeTopic)
        .on(MessageKind::Publish, CommandKind::PublishToTopics)
}
