//! Commands: units of work triggered by messages, timers and queue jobs.
//!
//! A [`CommandKind`] is the type tag listeners bind to and queue jobs name. Building a
//! command from payload fields goes through [`CommandKind::build`], which is the single
//! table mapping tags to argument types.

mod connection;
mod server;
mod topic;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub use connection::{CloseConnections, DismissNotifications, NotifyConnection};
pub use server::{BroadcastCurrentUptime, GetJob, RunQueuedCommands, StopServer};
pub use topic::{PublishToTopics, RegisterTopic, SubscribeTopic, UnregisterTopic, UnsubscribeTopic};

use super::{error::CommandError, manager::Manager};

/// Something a command does once it runs.
pub trait Execute {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError>;
}

/// Identity of one command instance, used to abort it while still queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(Uuid);

impl CommandId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type tag of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    BroadcastCurrentUptime,
    CloseConnections,
    DismissNotifications,
    NotifyConnection,
    RegisterTopic,
    UnregisterTopic,
    SubscribeTopic,
    UnsubscribeTopic,
    PublishToTopics,
    StopServer,
    GetJob,
    RunQueuedCommands,
}

impl CommandKind {
    /// Resolve a command type by name.
    pub fn from_name(name: &str) -> Result<Self, CommandError> {
        serde_json::from_value(Value::String(name.to_string()))
            .map_err(|_| CommandError::UnknownCommand(name.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BroadcastCurrentUptime => "BroadcastCurrentUptime",
            Self::CloseConnections => "CloseConnections",
            Self::DismissNotifications => "DismissNotifications",
            Self::NotifyConnection => "NotifyConnection",
            Self::RegisterTopic => "RegisterTopic",
            Self::UnregisterTopic => "UnregisterTopic",
            Self::SubscribeTopic => "SubscribeTopic",
            Self::UnsubscribeTopic => "UnsubscribeTopic",
            Self::PublishToTopics => "PublishToTopics",
            Self::StopServer => "StopServer",
            Self::GetJob => "GetJob",
            Self::RunQueuedCommands => "RunQueuedCommands",
        }
    }

    /// Instantiate a command of this kind from payload fields.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidArguments` when the fields do not decode into the
    /// command's arguments.
    pub fn build(&self, fields: Map<String, Value>) -> Result<Command, CommandError> {
        let fields = Value::Object(fields);
        let action = match self {
            Self::BroadcastCurrentUptime => Action::BroadcastCurrentUptime(self.decode(fields)?),
            Self::CloseConnections => Action::CloseConnections(self.decode(fields)?),
            Self::DismissNotifications => Action::DismissNotifications(self.decode(fields)?),
            Self::NotifyConnection => Action::NotifyConnection(self.decode(fields)?),
            Self::RegisterTopic => Action::RegisterTopic(self.decode(fields)?),
            Self::UnregisterTopic => Action::UnregisterTopic(self.decode(fields)?),
            Self::SubscribeTopic => Action::SubscribeTopic(self.decode(fields)?),
            Self::UnsubscribeTopic => Action::UnsubscribeTopic(self.decode(fields)?),
            Self::PublishToTopics => Action::PublishToTopics(self.decode(fields)?),
            Self::StopServer => Action::StopServer(StopServer),
            Self::GetJob => Action::GetJob(GetJob),
            Self::RunQueuedCommands => Action::RunQueuedCommands(RunQueuedCommands),
        };
        Ok(Command::new(action))
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, fields: Value) -> Result<T, CommandError> {
        serde_json::from_value(fields).map_err(|e| CommandError::InvalidArguments {
            command: self.as_str().to_string(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed arguments of every command.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    BroadcastCurrentUptime(BroadcastCurrentUptime),
    CloseConnections(CloseConnections),
    DismissNotifications(DismissNotifications),
    NotifyConnection(NotifyConnection),
    RegisterTopic(RegisterTopic),
    UnregisterTopic(UnregisterTopic),
    SubscribeTopic(SubscribeTopic),
    UnsubscribeTopic(UnsubscribeTopic),
    PublishToTopics(PublishToTopics),
    StopServer(StopServer),
    GetJob(GetJob),
    RunQueuedCommands(RunQueuedCommands),
}

impl Action {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::BroadcastCurrentUptime(_) => CommandKind::BroadcastCurrentUptime,
            Self::CloseConnections(_) => CommandKind::CloseConnections,
            Self::DismissNotifications(_) => CommandKind::DismissNotifications,
            Self::NotifyConnection(_) => CommandKind::NotifyConnection,
            Self::RegisterTopic(_) => CommandKind::RegisterTopic,
            Self::UnregisterTopic(_) => CommandKind::UnregisterTopic,
            Self::SubscribeTopic(_) => CommandKind::SubscribeTopic,
            Self::UnsubscribeTopic(_) => CommandKind::UnsubscribeTopic,
            Self::PublishToTopics(_) => CommandKind::PublishToTopics,
            Self::StopServer(_) => CommandKind::StopServer,
            Self::GetJob(_) => CommandKind::GetJob,
            Self::RunQueuedCommands(_) => CommandKind::RunQueuedCommands,
        }
    }
}

/// A unit of work, run immediately when `delay` is 0 or later through a one-shot timer.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    id: CommandId,
    action: Action,
    /// Milliseconds
    delay: u64,
}

impl Command {
    pub fn new(action: Action) -> Self {
        Self {
            id: CommandId::generate(),
            action,
            delay: 0,
        }
    }

    pub fn with_delay(mut self, delay: u64) -> Self {
        self.delay = delay;
        self
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn kind(&self) -> CommandKind {
        self.action.kind()
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn set_delay(&mut self, delay: u64) {
        self.delay = delay;
    }

    /// Same action under a fresh id, with no delay.
    pub fn renewed(&self) -> Self {
        Self::new(self.action.clone())
    }
}

impl Execute for Command {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError> {
        match self.action {
            Action::BroadcastCurrentUptime(command) => command.execute(manager),
            Action::CloseConnections(command) => command.execute(manager),
            Action::DismissNotifications(command) => command.execute(manager),
            Action::NotifyConnection(command) => command.execute(manager),
            Action::RegisterTopic(command) => command.execute(manager),
            Action::UnregisterTopic(command) => command.execute(manager),
            Action::SubscribeTopic(command) => command.execute(manager),
            Action::UnsubscribeTopic(command) => command.execute(manager),
            Action::PublishToTopics(command) => command.execute(manager),
            Action::StopServer(command) => command.execute(manager),
            Action::GetJob(command) => command.execute(manager),
            Action::RunQueuedCommands(command) => command.execute(manager),
        }
    }
}

macro_rules! into_command {
    ($($name:ident),* $(,)?) => {
        $(
            impl From<$name> for Command {
                fn from(args: $name) -> Self {
                    Command::new(Action::$name(args))
                }
            }
        )*
    };
}

into_command!(
    BroadcastCurrentUptime,
    CloseConnections,
    DismissNotifications,
    NotifyConnection,
    RegisterTopic,
    UnregisterTopic,
    SubscribeTopic,
    UnsubscribeTopic,
    PublishToTopics,
    StopServer,
    GetJob,
    RunQueuedCommands,
);
