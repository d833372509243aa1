//! Topic registration and subscriptions.
//!
//! Both sides of the topic <-> connection relation are always updated together here.

use crate::domain::{ConnectionId, ServerMessage, Topic, TopicId};

use super::Manager;

impl Manager {
    /// Register a topic and broadcast the topic list. Returns `false` for a duplicate id.
    pub fn register(&mut self, topic: Topic) -> bool {
        let (id, name) = (topic.id(), topic.name().clone());
        if !self.topics.add(topic) {
            tracing::warn!(topic = %id, "Topic is already registered");
            return false;
        }
        tracing::info!(topic = %id, name = %name, "Topic registered");
        self.broadcast_topics();
        true
    }

    /// Unregister a topic, unsubscribing every subscriber, and broadcast the topic list.
    ///
    /// Subscribers are not messaged individually.
    pub fn unregister(&mut self, id: &TopicId) -> Option<Topic> {
        let topic = self.topics.remove(id, &mut self.connections)?;
        tracing::info!(topic = %id, name = %topic.name(), "Topic unregistered");
        self.broadcast_topics();
        Some(topic)
    }

    /// Subscribe a connection to a registered topic and send it its subscriptions.
    ///
    /// Does nothing for an unknown topic or connection, or an existing subscription.
    pub fn subscribe(&mut self, topic: &TopicId, connection: &ConnectionId) -> bool {
        let (Some(entry), Some(subscriber)) = (
            self.topics.get_mut(topic),
            self.connections.get_mut(connection),
        ) else {
            tracing::debug!(topic = %topic, connection = %connection, "Nothing to subscribe");
            return false;
        };
        if subscriber.is_subscribed(topic) {
            return false;
        }
        entry.subscribe(*connection);
        subscriber.subscribe(*topic);

        tracing::debug!(topic = %topic, connection = %connection, "Subscribed");
        self.send_subscriptions(connection);
        true
    }

    /// Drop a connection's subscription and send it its subscriptions.
    ///
    /// Does nothing unless the connection currently holds the subscription.
    pub fn unsubscribe(&mut self, topic: &TopicId, connection: &ConnectionId) -> bool {
        let Some(subscriber) = self.connections.get_mut(connection) else {
            return false;
        };
        if !subscriber.is_subscribed(topic) {
            return false;
        }
        subscriber.unsubscribe(topic);
        if let Some(entry) = self.topics.get_mut(topic) {
            entry.unsubscribe(connection);
        }

        tracing::debug!(topic = %topic, connection = %connection, "Unsubscribed");
        self.send_subscriptions(connection);
        true
    }

    fn send_subscriptions(&mut self, connection: &ConnectionId) {
        let Some(subscriber) = self.connections.get(connection) else {
            return;
        };
        let update = ServerMessage::update_subscriptions(self.topics.subset(subscriber.subscriptions()));
        self.send(update, connection);
    }

    fn broadcast_topics(&mut self) {
        let update = ServerMessage::update_topics(self.topics.iter());
        self.broadcast(update);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::super::{ManagerConfig, testing::Harness};
    use crate::domain::{TopicId, TopicIdFactory};

    fn topic_id(harness: &Harness, name: &str) -> TopicId {
        harness
            .manager
            .topics()
            .iter()
            .find(|t| t.name().as_str() == name)
            .map(|t| t.id())
            .unwrap()
    }

    #[test]
    fn test_topic_scenario() {
        // テスト項目: 登録・購読・登録解除の一連の流れで購読関係が両側から更新される
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let mut admin = harness.connect_admin();
        let mut c = harness.connect();
        admin.drain();

        // when (操作): 管理者がトピック "lobby" を登録する
        harness.say(&admin, json!({"name": "RegisterTopic", "topic": "lobby"}));

        // then (期待する結果):
        assert_eq!(harness.manager.topics().len(), 1);
        assert_eq!(admin.names(), vec!["UpdateTopics"]);
        let frames = c.drain();
        assert_eq!(frames[0]["name"], "UpdateTopics");
        assert_eq!(frames[0]["topics"][0]["name"], "lobby");
        let lobby = topic_id(&harness, "lobby");

        // when (操作): C が "lobby" を購読する
        harness.say(
            &c,
            json!({"name": "Subscribe", "topic": lobby, "connection": c.id}),
        );

        // then (期待する結果):
        assert!(harness.manager.connection(&c.id).unwrap().is_subscribed(&lobby));
        assert!(harness.manager.topic(&lobby).unwrap().has_subscriber(&c.id));
        let frames = c.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["name"], "UpdateSubscriptions");
        assert_eq!(frames[0]["subscriptions"][0]["uuid"], json!(lobby));

        // when (操作): 管理者が "lobby" を登録解除する
        harness.say(&admin, json!({"name": "UnregisterTopic", "topic": lobby}));

        // then (期待する結果): C の購読は消え、C にはトピック一覧の配信だけが届く
        assert!(harness.manager.connection(&c.id).unwrap().subscriptions().is_empty());
        assert!(harness.manager.topic(&lobby).is_none());
        assert_eq!(c.names(), vec!["UpdateTopics"]);
    }

    #[test]
    fn test_subscribe_to_unknown_topic_is_noop() {
        // テスト項目: 未登録トピックの購読は何もしない
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let mut c = harness.connect();
        let unknown = TopicIdFactory::generate();

        // when (操作):
        let subscribed = harness.manager.subscribe(&unknown, &c.id);

        // then (期待する結果):
        assert!(!subscribed);
        assert!(c.drain().is_empty());
        assert!(harness.manager.connection(&c.id).unwrap().subscriptions().is_empty());
    }

    #[test]
    fn test_unsubscribe_without_subscription_is_noop() {
        // テスト項目: 購読していないトピックの購読解除は何もしない
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let admin = harness.connect_admin();
        let mut c = harness.connect();
        harness.say(&admin, json!({"name": "RegisterTopic", "topic": "lobby"}));
        let lobby = topic_id(&harness, "lobby");
        c.drain();

        // when (操作):
        let unsubscribed = harness.manager.unsubscribe(&lobby, &c.id);

        // then (期待する結果):
        assert!(!unsubscribed);
        assert!(c.drain().is_empty());
    }

    #[test]
    fn test_client_cannot_subscribe_someone_else() {
        // テスト項目: 一般クライアントは他人を購読させられない
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let admin = harness.connect_admin();
        let mut c1 = harness.connect();
        let c2 = harness.connect();
        harness.say(&admin, json!({"name": "RegisterTopic", "topic": "lobby"}));
        let lobby = topic_id(&harness, "lobby");
        c1.drain();

        // when (操作):
        harness.say(
            &c1,
            json!({"name": "Subscribe", "topic": lobby, "connection": c2.id}),
        );

        // then (期待する結果):
        assert_eq!(c1.names(), vec!["PromptForAuthentication"]);
        assert!(harness.manager.topic(&lobby).unwrap().subscriptions().is_empty());
    }

    #[test]
    fn test_publish_reaches_topic_subscribers_only() {
        // テスト項目: Publish はトピックの購読者にだけ届く
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let admin = harness.connect_admin();
        let mut sender = harness.connect();
        let mut listener = harness.connect();
        let mut bystander = harness.connect();
        harness.say(&admin, json!({"name": "RegisterTopic", "topic": "lobby"}));
        let lobby = topic_id(&harness, "lobby");
        harness.manager.subscribe(&lobby, &listener.id);
        sender.drain();
        listener.drain();
        bystander.drain();

        // when (操作):
        harness.say(
            &sender,
            json!({
                "name": "Publish",
                "connection": sender.id,
                "topics": [lobby],
                "payload": {"text": "hello"}
            }),
        );

        // then (期待する結果):
        let frames = listener.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["name"], "Published");
        assert_eq!(frames[0]["sender"], json!(sender.id));
        assert_eq!(frames[0]["payload"], json!({"text": "hello"}));
        assert!(sender.drain().is_empty());
        assert!(bystander.drain().is_empty());
    }

    #[test]
    fn test_publish_without_topics_reaches_nobody() {
        // テスト項目: 対象トピックが空の Publish は全体配信にならず、誰にも届かない
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let mut sender = harness.connect();
        let mut bystander = harness.connect();
        sender.drain();
        bystander.drain();

        // when (操作):
        harness.say(
            &sender,
            json!({
                "name": "Publish",
                "connection": sender.id,
                "topics": [],
                "payload": {"text": "everyone?"}
            }),
        );

        // then (期待する結果):
        assert!(bystander.drain().is_empty());
        assert!(sender.drain().is_empty());
    }

    #[test]
    fn test_register_duplicate_topic_id_is_rejected() {
        // テスト項目: 同じ ID のトピックは二重登録されない
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let topic = crate::domain::Topic::new(
            TopicIdFactory::generate(),
            crate::domain::TopicName::new("lobby".into()).unwrap(),
        );

        // when (操作):
        let first = harness.manager.register(topic.clone());
        let second = harness.manager.register(topic);

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(harness.manager.topics().len(), 1);
    }

    #[test]
    fn test_unregister_unknown_topic_is_noop() {
        // テスト項目: 未登録トピックの登録解除は何もしない
        // given (前提条件):
        let mut harness = Harness::new(ManagerConfig::default());
        let mut c = harness.connect();

        // when (操作):
        let removed = harness.manager.unregister(&TopicIdFactory::generate());

        // then (期待する結果):
        assert!(removed.is_none());
        let frames: Vec<Value> = c.drain();
        assert!(frames.is_empty());
    }
}
