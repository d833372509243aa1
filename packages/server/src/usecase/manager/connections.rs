//! Connection lifecycle.

use crate::domain::{Connection, ConnectionId, ServerMessage};

use super::Manager;

impl Manager {
    /// Register a new connection, reply with its own details, then broadcast the
    /// connection list to everyone.
    pub fn open(&mut self, connection: Connection) {
        let id = connection.id();
        if !self.connections.add(connection) {
            tracing::warn!(connection = %id, "Connection is already open");
            return;
        }
        tracing::info!(
            connection = %id,
            total = self.connections.len(),
            "Connection opened"
        );

        if let Some(connection) = self.connections.get(&id) {
            let established = ServerMessage::connection_established(connection);
            self.send(established, &id);
        }
        let update = ServerMessage::update_connections(&self.connections);
        self.broadcast(update);
    }

    /// Remove a connection and broadcast the new connection list.
    ///
    /// The connection is also dropped from every topic it was subscribed to. Closing an
    /// unknown connection does nothing and returns `false`.
    pub fn close(&mut self, id: &ConnectionId) -> bool {
        let Some(connection) = self.connections.remove(id) else {
            return false;
        };
        for topic in connection.subscriptions() {
            if let Some(topic) = self.topics.get_mut(topic) {
                topic.unsubscribe(id);
            }
        }
        tracing::info!(
            connection = %id,
            total = self.connections.len(),
            "Connection closed"
        );

        let update = ServerMessage::update_connections(&self.connections);
        self.broadcast(update);
        true
    }

    /// Close the socket of a failed connection, then remove it like [`Manager::close`].
    pub fn error(&mut self, id: &ConnectionId, cause: &str) {
        tracing::warn!(connection = %id, error = %cause, "Connection error");
        self.disconnect(id);
    }

    /// Close a connection's socket from the server side and remove it.
    pub fn disconnect(&mut self, id: &ConnectionId) -> bool {
        if let Some(connection) = self.connections.get(id) {
            self.broker.close(connection);
        }
        self.close(id)
    }
}
