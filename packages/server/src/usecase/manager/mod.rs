//! UseCase: Manager
//!
//! Manager はすべてのレジストリ（接続・トピック・リスナー・タイマー・待機コマンド）を
//! 排他的に所有する唯一のオーケストレータです。同期的に動作し、非同期処理は
//! イベントループ（`usecase::event_loop`）が担当します。
//!
//! 操作はファイルごとに分かれています。
//! - `messaging`: 受信メッセージの認可・ディスパッチと送信・配信
//! - `connections`: 接続のオープン・クローズ・エラー
//! - `topics`: トピックの登録と購読
//! - `scheduling`: コマンド実行、遅延、キュー、リスナー、タイマー

mod connections;
mod messaging;
mod scheduling;
mod topics;

use std::{collections::VecDeque, time::Duration};

use hiroba_shared::time::now_seconds;

use crate::domain::{Broker, Connection, ConnectionId, Connections, JobQueue, Topic, TopicId, Topics};

use super::{
    command::Command,
    event_loop::{LoopEvent, LoopHandle, Snapshot},
    listener::{self, Listeners},
    timer::{self, Timers},
};

/// Default queue polling interval.
pub const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runtime options of the Manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    /// Shared admin secret; `None` means nobody can authenticate.
    pub password: Option<String>,
    /// Name of the external queue jobs are popped from.
    pub queue: String,
    pub queue_interval: Duration,
    /// Broadcast `CurrentUptime` at this interval when set.
    pub uptime_interval: Option<Duration>,
    /// Stop the server after this long when set.
    pub auto_restart: Option<Duration>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            password: None,
            queue: "default".to_string(),
            queue_interval: QUEUE_POLL_INTERVAL,
            uptime_interval: None,
            auto_restart: None,
        }
    }
}

pub struct Manager {
    config: ManagerConfig,
    connections: Connections,
    topics: Topics,
    listeners: Listeners,
    timers: Timers,
    /// Commands waiting for the next `RunQueued` tick
    pending: VecDeque<Command>,
    broker: Box<dyn Broker>,
    queue: Box<dyn JobQueue>,
    handle: LoopHandle,
    /// Seconds since the epoch
    started_at: f64,
    /// Last outbound timestamp, kept so stamps never go backwards
    last_stamp: f64,
    stopped: bool,
}

impl Manager {
    /// Create an empty Manager with no listeners and no timers.
    pub fn new(
        config: ManagerConfig,
        broker: Box<dyn Broker>,
        queue: Box<dyn JobQueue>,
        handle: LoopHandle,
    ) -> Self {
        let started_at = now_seconds();
        Self {
            config,
            connections: Connections::new(),
            topics: Topics::new(),
            listeners: Listeners::new(),
            timers: Timers::new(),
            pending: VecDeque::new(),
            broker,
            queue,
            handle,
            started_at,
            last_stamp: started_at,
            stopped: false,
        }
    }

    /// Attach the built-in listeners and start the built-in timers.
    pub fn boot(&mut self) {
        self.listener(listener::connection_pool());
        self.listener(listener::notifier());
        self.listener(listener::server_admin());
        self.listener(listener::topic_board());

        self.add_timer(timer::queue_worker(self.config.queue_interval));
        if let Some(interval) = self.config.uptime_interval {
            self.add_timer(timer::current_uptime(interval, self.started_at));
        }
        if let Some(interval) = self.config.auto_restart {
            self.add_timer(timer::auto_restart(interval));
        }

        tracing::info!(
            listeners = self.listeners.len(),
            timers = self.timers.len(),
            queue = %self.config.queue,
            "Manager booted"
        );
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn connection_mut(&mut self, id: &ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn topic(&self, id: &TopicId) -> Option<&Topic> {
        self.topics.get(id)
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn pending(&self) -> &VecDeque<Command> {
        &self.pending
    }

    pub fn handle(&self) -> &LoopHandle {
        &self.handle
    }

    /// Seconds since the epoch.
    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    /// Seconds since boot.
    pub fn uptime(&self) -> f64 {
        now_seconds() - self.started_at
    }

    /// Stop the loop after the current tick, closing every open socket.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        tracing::info!(connections = self.connections.len(), "Stopping server");
        for connection in self.connections.iter() {
            self.broker.close(connection);
        }
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            connections: self.connections.iter().cloned().collect(),
            topics: self.topics.iter().cloned().collect(),
            active_timers: self.timers.active().count(),
            pending_commands: self.pending.len(),
            started_at: self.started_at,
            uptime: self.uptime(),
        }
    }

    /// Route one loop event to the matching operation.
    pub fn dispatch(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::Opened(connection) => self.open(connection),
            LoopEvent::Received {
                connection,
                payload,
            } => {
                if let Err(e) = self.message(&connection, &payload) {
                    tracing::debug!(connection = %connection, error = %e, "Message rejected");
                }
            }
            LoopEvent::Closed { connection } => {
                self.close(&connection);
            }
            LoopEvent::Errored { connection, cause } => self.error(&connection, &cause),
            LoopEvent::RunQueued => {
                self.run_queued();
            }
            LoopEvent::Inspect(reply) => {
                if reply.send(self.snapshot()).is_err() {
                    tracing::debug!("Snapshot requester went away");
                }
            }
            LoopEvent::Shutdown => self.stop(),
        }
    }
}
