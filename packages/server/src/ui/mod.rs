//! UI 層: Axum による HTTP / WebSocket エンドポイント
//!
//! ハンドラは Manager に直接触れず、`LoopHandle` を通じてイベントループに依頼します。

mod handler;
mod runner;
mod signal;
pub mod state;

pub use runner::{create_router, run};
