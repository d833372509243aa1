//! Broker 実装
//!
//! ドメイン層の `Broker` trait を、各接続の `Socket`（writer タスクへのチャンネル）に
//! フレームを積む形で実装します。実際の書き込みは UI 層の writer タスクが行います。

use crate::domain::{Broker, Connection, Outgoing, TransportError};

/// Delivers payloads by queueing frames on each connection's socket.
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketBroker;

impl SocketBroker {
    pub fn new() -> Self {
        Self
    }
}

impl Broker for SocketBroker {
    fn deliver(&self, connection: &Connection, payload: &str) -> Result<(), TransportError> {
        if connection.socket().push(Outgoing::Text(payload.to_string())) {
            Ok(())
        } else {
            Err(TransportError::Disconnected(connection.id()))
        }
    }

    fn deliver_and_close(
        &self,
        connection: &Connection,
        payload: &str,
    ) -> Result<(), TransportError> {
        self.deliver(connection, payload)?;
        self.close(connection);
        Ok(())
    }

    fn close(&self, connection: &Connection) {
        if !connection.socket().push(Outgoing::Close) {
            tracing::debug!(connection = %connection.id(), "Socket already closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionIdFactory, Socket, Timestamp};

    #[test]
    fn test_deliver_queues_text_frame() {
        // テスト項目: deliver はテキストフレームを writer に積む
        // given (前提条件):
        let (socket, mut receiver) = Socket::channel();
        let connection = Connection::new(ConnectionIdFactory::generate(), socket, Timestamp::new(0));

        // when (操作):
        let result = SocketBroker::new().deliver(&connection, "hello");

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(receiver.try_recv().unwrap(), Outgoing::Text("hello".to_string()));
    }

    #[test]
    fn test_deliver_and_close_queues_close_after_text() {
        // テスト項目: deliver_and_close は送信後にクローズを積む
        // given (前提条件):
        let (socket, mut receiver) = Socket::channel();
        let connection = Connection::new(ConnectionIdFactory::generate(), socket, Timestamp::new(0));

        // when (操作):
        SocketBroker::new()
            .deliver_and_close(&connection, "bye")
            .unwrap();

        // then (期待する結果):
        assert_eq!(receiver.try_recv().unwrap(), Outgoing::Text("bye".to_string()));
        assert_eq!(receiver.try_recv().unwrap(), Outgoing::Close);
    }

    #[test]
    fn test_deliver_to_dropped_writer_fails() {
        // テスト項目: writer が終了している接続への送信は Disconnected になる
        // given (前提条件):
        let (socket, receiver) = Socket::channel();
        let id = ConnectionIdFactory::generate();
        let connection = Connection::new(id, socket, Timestamp::new(0));
        drop(receiver);

        // when (操作):
        let result = SocketBroker::new().deliver(&connection, "hello");

        // then (期待する結果):
        assert_eq!(result, Err(TransportError::Disconnected(id)));
    }
}
