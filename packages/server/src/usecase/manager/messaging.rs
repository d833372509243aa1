//! Inbound message handling and outbound delivery.

use hiroba_shared::time::now_seconds;
use uuid::Uuid;

use crate::{
    domain::{ClientMessage, ConnectionId, Message, ServerMessage, SessionType},
    usecase::error::ManagerError,
};

use super::Manager;

impl Manager {
    /// Decode a raw text frame from `sender` and receive it.
    ///
    /// A payload that is not a known client message is logged and rejected with
    /// `InvalidInput`. Nothing is sent back.
    pub fn message(&mut self, sender: &ConnectionId, raw: &str) -> Result<(), ManagerError> {
        match ClientMessage::decode(raw) {
            Ok(message) => self.receive(message, sender),
            Err(e) => {
                tracing::warn!(connection = %sender, error = %e, "Invalid input");
                Err(ManagerError::InvalidInput(e.to_string()))
            }
        }
    }

    /// Authorize a message and dispatch it.
    ///
    /// An unauthorized message is answered with `PromptForAuthentication` and goes no
    /// further. Otherwise a self-handling message reacts first, then every listener bound
    /// to its kind runs. A failing command is logged and does not stop the others.
    pub fn receive(
        &mut self,
        message: ClientMessage,
        sender: &ConnectionId,
    ) -> Result<(), ManagerError> {
        let connection = self
            .connections
            .get(sender)
            .ok_or(ManagerError::ConnectionNotFound(*sender))?;

        if !message.authorize(connection) {
            tracing::warn!(
                connection = %sender,
                message = %message.kind(),
                "Unauthorized message"
            );
            self.send(
                ServerMessage::prompt_for_authentication(message.to_value()),
                sender,
            );
            return Ok(());
        }

        tracing::debug!(connection = %sender, message = %message.kind(), "Message received");
        if message.is_self_handling() {
            self.handle_intrinsic(&message, sender);
        }
        self.notify_listeners(&message);
        Ok(())
    }

    fn handle_intrinsic(&mut self, message: &ClientMessage, sender: &ConnectionId) {
        match message {
            ClientMessage::Authenticate { password } => self.authenticate(message, password, sender),
            ClientMessage::JoinAsPlayer => self.join_as(sender, SessionType::Player),
            ClientMessage::JoinAsSpectator => self.join_as(sender, SessionType::Spectator),
            _ => {}
        }
    }

    fn authenticate(&mut self, message: &ClientMessage, password: &str, sender: &ConnectionId) {
        let accepted = self
            .config
            .password
            .as_deref()
            .is_some_and(|secret| secret == password);
        if !accepted {
            tracing::warn!(connection = %sender, "Authentication failed");
            self.send(
                ServerMessage::prompt_for_authentication(message.to_value()),
                sender,
            );
            return;
        }

        let Some(connection) = self.connections.get_mut(sender) else {
            return;
        };
        connection.set_admin(true);
        let reply = ServerMessage::connection_authenticated(connection);
        tracing::info!(connection = %sender, "Connection authenticated as admin");
        self.send(reply, sender);
    }

    fn join_as(&mut self, sender: &ConnectionId, session_type: SessionType) {
        let Some(connection) = self.connections.get_mut(sender) else {
            return;
        };
        connection.set_session_type(session_type);
        tracing::info!(connection = %sender, session_type = %session_type, "Session type changed");
        let update = ServerMessage::update_connections(&self.connections);
        self.broadcast(update);
    }

    /// Run every command the listeners bind to this message. Returns the failure count.
    fn notify_listeners(&mut self, message: &ClientMessage) -> usize {
        let kind = message.kind();
        let reactions = self.listeners.handle(kind, &message.fields());

        let mut failures = 0;
        for (listener, commands) in reactions {
            for command in commands {
                if let Err(e) = command.and_then(|command| self.run(command)) {
                    failures += 1;
                    tracing::warn!(
                        listener = %listener,
                        message = %kind,
                        error = %e,
                        "Listener command failed"
                    );
                }
            }
        }
        failures
    }

    /// Stamp a message and deliver it to one connection.
    pub fn send(&mut self, message: impl Into<Message>, to: &ConnectionId) {
        self.deliver(&message.into(), &[*to], false);
    }

    /// Stamp a message, deliver it to one connection and close that connection.
    pub fn end(&mut self, message: impl Into<Message>, to: &ConnectionId) {
        self.deliver(&message.into(), &[*to], true);
    }

    /// Stamp a message and deliver it to every connection, or only to subscribers of
    /// its target topics when it has any.
    pub fn broadcast(&mut self, message: impl Into<Message>) {
        let message = message.into();
        let targets = if message.topics().is_empty() {
            self.connections.ids()
        } else {
            self.connections
                .in_topics(message.topics())
                .iter()
                .map(|c| c.id())
                .collect()
        };
        self.deliver(&message, &targets, false);
    }

    /// Assign a fresh id and a timestamp that never goes backwards.
    fn stamp(&mut self, message: &Message) -> String {
        let timestamp = now_seconds().max(self.last_stamp);
        self.last_stamp = timestamp;
        message.stamp(Uuid::new_v4(), timestamp).to_json()
    }

    fn deliver(&mut self, message: &Message, targets: &[ConnectionId], close: bool) {
        let payload = self.stamp(message);
        tracing::trace!(message = message.name(), targets = targets.len(), "Delivering");

        let mut failed = Vec::new();
        for id in targets {
            let Some(connection) = self.connections.get(id) else {
                tracing::debug!(connection = %id, message = message.name(), "Target is gone");
                continue;
            };
            let result = if close {
                self.broker.deliver_and_close(connection, &payload)
            } else {
                self.broker.deliver(connection, &payload)
            };
            if let Err(e) = result {
                tracing::warn!(connection = %id, error = %e, "Delivery failed");
                failed.push((*id, e));
            }
        }

        // Cleanup runs on a later tick so delivery never re-enters close/broadcast.
        for (id, e) in failed {
            self.handle.errored(id, e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::super::{ManagerConfig, testing::Harness};
    use crate::domain::{ConnectionId, SessionType};

    #[test]
    fn test_open_scenario_broadcasts_connection_list() {
        // テスト項目: 接続ごとに UpdateConnections が全員に配信される
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());

        // when (操作):
        let mut c1 = harness.connect();
        let c2 = harness.connect();

        // then (期待する結果):
        let frames = c1.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["name"], "UpdateConnections");
        let uuids: Vec<&str> = frames[0]["connections"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["uuid"].as_str().unwrap())
            .collect();
        assert_eq!(uuids, vec![c1.id.to_string(), c2.id.to_string()]);
    }

    #[test]
    fn test_unauthorized_message_prompts_sender_only() {
        // テスト項目: 権限のないメッセージは送信者にだけ認証要求が返される
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let mut c1 = harness.connect();
        let mut c2 = harness.connect();
        c1.drain();

        // when (操作):
        harness.say(&c1, json!({"name": "DisconnectSpectators"}));

        // then (期待する結果):
        let frames = c1.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["name"], "PromptForAuthentication");
        assert_eq!(frames[0]["code"], 401);
        assert_eq!(frames[0]["previous"]["name"], "DisconnectSpectators");
        assert!(c2.drain().is_empty());
        assert_eq!(harness.manager.connections().len(), 2);
    }

    #[test]
    fn test_invalid_input_is_rejected_silently() {
        // テスト項目: 未知のメッセージは InvalidInput となり、送信者にも他の接続にも何も届かない
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let mut c1 = harness.connect();
        let mut c2 = harness.connect();
        c1.drain();

        // when (操作):
        let result = harness.manager.message(&c1.id, r#"{"name":"Explode"}"#);

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(crate::usecase::error::ManagerError::InvalidInput(_))
        ));
        assert!(c1.drain().is_empty());
        assert!(c2.drain().is_empty());
    }

    #[test]
    fn test_receive_from_unknown_connection_fails() {
        // テスト項目: 未登録の接続からのメッセージは ConnectionNotFound
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let stranger = crate::domain::ConnectionIdFactory::generate();

        // when (操作):
        let result = harness
            .manager
            .receive(crate::domain::ClientMessage::JoinAsPlayer, &stranger);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(crate::usecase::error::ManagerError::ConnectionNotFound(
                stranger
            ))
        );
    }

    #[test]
    fn test_authenticate_with_password_grants_admin() {
        // テスト項目: 正しいパスワードで管理者になり ConnectionAuthenticated が返される
        // given (前提条件):
        let mut harness = Harness::with_password("secret");
        let mut c1 = harness.connect();

        // when (操作):
        harness.say(&c1, json!({"name": "Authenticate", "password": "secret"}));

        // then (期待する結果):
        let frames = c1.drain();
        assert_eq!(frames[0]["name"], "ConnectionAuthenticated");
        assert_eq!(frames[0]["connection"]["admin"], true);
        assert!(harness.manager.connection(&c1.id).unwrap().is_admin());
    }

    #[test]
    fn test_authenticate_with_wrong_password_prompts() {
        // テスト項目: 誤ったパスワードでは認証要求が返され管理者にならない
        // given (前提条件):
        let mut harness = Harness::with_password("secret");
        let mut c1 = harness.connect();

        // when (操作):
        harness.say(&c1, json!({"name": "Authenticate", "password": "guess"}));

        // then (期待する結果):
        assert_eq!(c1.names(), vec!["PromptForAuthentication"]);
        assert!(!harness.manager.connection(&c1.id).unwrap().is_admin());
    }

    #[test]
    fn test_authenticate_without_configured_password_fails() {
        // テスト項目: パスワード未設定のサーバーでは誰も認証できない
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let mut c1 = harness.connect();

        // when (操作):
        harness.say(&c1, json!({"name": "Authenticate", "password": ""}));

        // then (期待する結果):
        assert_eq!(c1.names(), vec!["PromptForAuthentication"]);
    }

    #[test]
    fn test_join_as_player_broadcasts_session_type() {
        // テスト項目: JoinAsPlayer で種別が変わり全員に UpdateConnections が配信される
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let c1 = harness.connect();
        let mut c2 = harness.connect();

        // when (操作):
        harness.say(&c1, json!({"name": "JoinAsPlayer"}));

        // then (期待する結果):
        let frames = c2.drain();
        assert_eq!(frames[0]["name"], "UpdateConnections");
        assert_eq!(frames[0]["connections"][0]["type"], "player");
        assert_eq!(
            harness.manager.connection(&c1.id).unwrap().session_type(),
            SessionType::Player
        );
    }

    #[test]
    fn test_stamping_is_unique_named_and_monotonic() {
        // テスト項目: 送信ごとに新しい id が振られ、timestamp は単調非減少
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let mut c1 = harness.connect();
        let message = crate::domain::ServerMessage::exception("Test", "same");

        // when (操作):
        harness.manager.send(message.clone(), &c1.id);
        harness.manager.send(message, &c1.id);

        // then (期待する結果):
        let frames = c1.drain();
        assert_ne!(frames[0]["id"], frames[1]["id"]);
        assert_eq!(frames[0]["name"], "MessageException");
        let stamps: Vec<f64> = frames.iter().map(|f| f["timestamp"].as_f64().unwrap()).collect();
        assert!(stamps[1] >= stamps[0]);
    }

    #[test]
    fn test_end_closes_after_delivery() {
        // テスト項目: end は送信後に接続を閉じる
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let mut c1 = harness.connect();

        // when (操作):
        harness
            .manager
            .end(crate::domain::ServerMessage::exception("Bye", "bye"), &c1.id);

        // then (期待する結果):
        assert!(c1.was_closed());
    }

    #[test]
    fn test_failed_delivery_reports_error_for_later_tick() {
        // テスト項目: 送信失敗した接続は次のティックで切断・削除される
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let c1 = harness.connect();
        let mut c2 = harness.connect();
        let gone: ConnectionId = c1.id;
        drop(c1);

        // when (操作):
        harness
            .manager
            .broadcast(crate::domain::ServerMessage::exception("Ping", "ping"));

        // then (期待する結果):
        assert!(harness.manager.connection(&gone).is_some());
        harness.tick();
        assert!(harness.manager.connection(&gone).is_none());
        let names: Vec<Value> = c2.drain().into_iter().map(|f| f["name"].clone()).collect();
        assert_eq!(names, vec![json!("MessageException"), json!("UpdateConnections")]);
    }
}
