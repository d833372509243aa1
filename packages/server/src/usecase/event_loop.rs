//! UseCase: イベントループ
//!
//! Manager を1つのタスクが排他的に所有し、他のタスク（WebSocket の reader、HTTP
//! ハンドラ、シグナル監視）は [`LoopHandle`] 経由でイベントを送るだけにします。
//! ロックを使わずにレジストリへの書き込みを1箇所に集約するための構成です。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - `EventLoop::turn()` の1ティック単位の挙動
//! - `next()` で積まれたコマンドが次のティックまで実行されないこと
//! - 遅延コマンドとタイマーが仮想時間どおりに発火すること
//!
//! ### どのような状況を想定しているか
//! - tokio の時間を停止した状態（`start_paused = true`）で `advance` により時間を進める

use std::time::Duration;

use serde::Serialize;
use tokio::{
    sync::{mpsc, oneshot},
    time::Instant,
};

use crate::domain::{Broker, Connection, ConnectionId, JobQueue, Topic};

use super::manager::{Manager, ManagerConfig};

/// Everything that can wake the loop up.
#[derive(Debug)]
pub enum LoopEvent {
    Opened(Connection),
    Received {
        connection: ConnectionId,
        payload: String,
    },
    Closed {
        connection: ConnectionId,
    },
    Errored {
        connection: ConnectionId,
        cause: String,
    },
    /// Drain the commands queued with `Manager::next`.
    RunQueued,
    /// Ask for a read-only view of the registries.
    Inspect(oneshot::Sender<Snapshot>),
    Shutdown,
}

/// Clonable sending side of the loop. The only way other tasks reach the Manager.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    sender: mpsc::UnboundedSender<LoopEvent>,
}

impl LoopHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LoopEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Post an event. Returns `false` once the loop has gone away.
    pub fn post(&self, event: LoopEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    pub fn opened(&self, connection: Connection) -> bool {
        self.post(LoopEvent::Opened(connection))
    }

    pub fn received(&self, connection: ConnectionId, payload: impl Into<String>) -> bool {
        self.post(LoopEvent::Received {
            connection,
            payload: payload.into(),
        })
    }

    pub fn closed(&self, connection: ConnectionId) -> bool {
        self.post(LoopEvent::Closed { connection })
    }

    pub fn errored(&self, connection: ConnectionId, cause: impl Into<String>) -> bool {
        self.post(LoopEvent::Errored {
            connection,
            cause: cause.into(),
        })
    }

    pub fn run_queued(&self) -> bool {
        self.post(LoopEvent::RunQueued)
    }

    pub fn shutdown(&self) -> bool {
        self.post(LoopEvent::Shutdown)
    }

    /// Snapshot of the registries, or `None` when the loop is gone.
    pub async fn inspect(&self) -> Option<Snapshot> {
        let (reply, response) = oneshot::channel();
        if !self.post(LoopEvent::Inspect(reply)) {
            return None;
        }
        response.await.ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Read-only copy of the Manager's state at one tick.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub connections: Vec<Connection>,
    pub topics: Vec<Topic>,
    pub active_timers: usize,
    pub pending_commands: usize,
    /// Seconds since the epoch
    pub started_at: f64,
    /// Seconds
    pub uptime: f64,
}

/// The single task that owns the Manager.
pub struct EventLoop {
    manager: Manager,
    events: mpsc::UnboundedReceiver<LoopEvent>,
}

impl EventLoop {
    /// Build a booted Manager and the loop around it.
    pub fn new(
        config: ManagerConfig,
        broker: Box<dyn Broker>,
        queue: Box<dyn JobQueue>,
    ) -> (Self, LoopHandle) {
        let (handle, events) = LoopHandle::channel();
        let mut manager = Manager::new(config, broker, queue, handle.clone());
        manager.boot();
        (Self { manager, events }, handle)
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut Manager {
        &mut self.manager
    }

    /// One tick: drain commands queued by an earlier tick, or fire every due timer, or
    /// else handle exactly one event.
    ///
    /// Queued commands go first so they run on the tick right after the one that queued
    /// them, however many events are already waiting.
    ///
    /// Returns `false` when no event can ever arrive again.
    pub async fn turn(&mut self) -> bool {
        if !self.manager.pending().is_empty() {
            self.manager.run_queued();
            return true;
        }

        let deadline = self.manager.next_deadline();
        tokio::select! {
            biased;
            _ = sleep_until(deadline) => {
                self.manager.fire_due_timers(Instant::now());
                true
            }
            event = self.events.recv() => match event {
                Some(event) => {
                    self.manager.dispatch(event);
                    true
                }
                None => false,
            },
        }
    }

    /// Run ticks until the Manager is stopped.
    pub async fn run(mut self) {
        tracing::info!("Event loop started");
        while !self.manager.is_stopped() {
            if !self.turn().await {
                break;
            }
        }
        tracing::info!(
            uptime = ?Duration::from_secs_f64(self.manager.uptime().max(0.0)),
            "Event loop stopped"
        );
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
