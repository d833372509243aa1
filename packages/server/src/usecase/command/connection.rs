//! Commands acting on connections: forced disconnects and the notification inbox.

use serde::Deserialize;

use crate::{
    domain::{Connection, ConnectionId, Notification, ServerMessage, SessionType, Timestamp},
    usecase::{error::CommandError, manager::Manager},
};

use super::Execute;

/// Disconnect every non-admin connection, optionally only those of one session type.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CloseConnections {
    #[serde(rename = "type", default)]
    pub session_type: Option<SessionType>,
}

impl Execute for CloseConnections {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError> {
        let connections = manager.connections();
        let candidates: Vec<&Connection> = match self.session_type {
            Some(session_type) => connections.of_type(session_type),
            None => connections.iter().collect(),
        };
        let targets: Vec<ConnectionId> = candidates
            .into_iter()
            .filter(|c| !c.is_admin())
            .map(|c| c.id())
            .collect();

        tracing::info!(
            count = targets.len(),
            session_type = ?self.session_type,
            "Closing connections"
        );
        for id in targets {
            manager.disconnect(&id);
        }
        Ok(())
    }
}

/// Put a notification from `sender` into `receiver`'s inbox.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NotifyConnection {
    pub sender: ConnectionId,
    pub receiver: ConnectionId,
}

impl Execute for NotifyConnection {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError> {
        let receiver = manager
            .connection_mut(&self.receiver)
            .ok_or(CommandError::ConnectionNotFound(self.receiver))?;

        receiver
            .notifications_mut()
            .put(Notification::new(self.sender, Timestamp::now()));
        let update = ServerMessage::update_notifications(receiver.notifications());

        manager.send(update, &self.receiver);
        Ok(())
    }
}

/// Empty a connection's inbox.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DismissNotifications {
    pub connection: ConnectionId,
}

impl Execute for DismissNotifications {
    fn execute(self, manager: &mut Manager) -> Result<(), CommandError> {
        let connection = manager
            .connection_mut(&self.connection)
            .ok_or(CommandError::ConnectionNotFound(self.connection))?;

        connection.notifications_mut().clear();
        let update = ServerMessage::update_notifications(connection.notifications());

        manager.send(update, &self.connection);
        Ok(())
    }
}
