//! JobQueue 実装

pub mod inmemory;

pub use inmemory::{InMemoryJobQueue, JobProducer};
