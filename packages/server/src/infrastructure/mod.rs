//! Infrastructure 層
//!
//! ドメイン層が定義するポート（`Broker`, `JobQueue`）の具体的な実装と、HTTP API の DTO。

pub mod broker;
pub mod dto;
pub mod queue;

pub use broker::SocketBroker;
pub use queue::{InMemoryJobQueue, JobProducer};
