//! UseCase 層
//!
//! Manager（オーケストレータ）とその周辺（コマンド、リスナー、タイマー、イベントループ）。
//! UI 層からは `LoopHandle` 経由でのみ呼び出され、Domain 層を操作します。

pub mod command;
pub mod error;
pub mod event_loop;
pub mod listener;
pub mod manager;
pub mod timer;

pub use command::{Command, CommandId, CommandKind};
pub use error::{CommandError, ManagerError};
pub use event_loop::{EventLoop, LoopEvent, LoopHandle, Snapshot};
pub use listener::{Listener, ListenerId, Listeners};
pub use manager::{Manager, ManagerConfig};
pub use timer::{Timer, TimerAction, TimerId, Timers};
