//! InMemory JobQueue 実装
//!
//! プロセス内のチャンネルを外部キューの代わりに使用します。
//! `JobProducer` は HTTP API などから clone して使い、`InMemoryJobQueue` は
//! Manager が所有してポーリングします。

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::domain::{Job, JobQueue, QueueError};

/// Consumer side, owned by the Manager.
#[derive(Debug)]
pub struct InMemoryJobQueue {
    receiver: mpsc::UnboundedReceiver<Job>,
    deleted: Arc<AtomicU64>,
}

/// Producer side; pushes raw job bodies onto a named queue.
#[derive(Debug, Clone)]
pub struct JobProducer {
    sender: mpsc::UnboundedSender<Job>,
    deleted: Arc<AtomicU64>,
}

impl InMemoryJobQueue {
    pub fn channel() -> (Self, JobProducer) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let deleted = Arc::new(AtomicU64::new(0));
        (
            Self {
                receiver,
                deleted: deleted.clone(),
            },
            JobProducer { sender, deleted },
        )
    }
}

impl JobQueue for InMemoryJobQueue {
    fn pop(&mut self, queue: &str) -> Result<Option<Job>, QueueError> {
        loop {
            match self.receiver.try_recv() {
                Ok(job) if job.queue() == queue => return Ok(Some(job)),
                Ok(job) => {
                    tracing::warn!(job = %job.id(), queue = %job.queue(), "Dropping job for unknown queue");
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => {
                    return Err(QueueError::Unavailable("all producers dropped".to_string()));
                }
            }
        }
    }

    fn delete(&mut self, job: &Job) -> Result<(), QueueError> {
        let total = self.deleted.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(job = %job.id(), total, "Job deleted");
        Ok(())
    }
}

impl JobProducer {
    /// Push a raw JSON job body (`{"job": ..., "data": {...}}`) onto `queue`.
    pub fn push(&self, queue: &str, raw_body: impl Into<String>) -> Result<Job, QueueError> {
        let job = Job::new(queue, raw_body);
        self.sender
            .send(job.clone())
            .map_err(|_| QueueError::Unavailable("queue consumer dropped".to_string()))?;
        Ok(job)
    }

    /// Number of jobs acknowledged so far.
    pub fn deleted(&self) -> u64 {
        self.deleted.load(Ordering::Relaxed)
    }
}
