//! External work queue boundary.
//!
//! The core only needs to pop the next job of a named queue and to acknowledge (delete)
//! a job once it has been consumed.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Errors reported by a job queue backend
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Backend could not be reached
    #[error("Queue is unavailable: {0}")]
    Unavailable(String),

    /// Job body is not a `{"job": ..., "data": {...}}` JSON object
    #[error("Malformed job payload: {0}")]
    MalformedJob(String),
}

/// One job popped from the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    id: Uuid,
    queue: String,
    raw_body: String,
}

impl Job {
    pub fn new(queue: impl Into<String>, raw_body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue: queue.into(),
            raw_body: raw_body.into(),
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    /// Decode the raw body.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::MalformedJob` when the body is not a JSON object of the
    /// expected shape.
    pub fn payload(&self) -> Result<JobPayload, QueueError> {
        serde_json::from_str(&self.raw_body).map_err(|e| QueueError::MalformedJob(e.to_string()))
    }
}

/// Decoded job body: the command type name and its arguments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobPayload {
    pub job: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Consumer side of an external job queue.
#[cfg_attr(test, mockall::automock)]
pub trait JobQueue: Send {
    /// Pop the next job without blocking. `Ok(None)` is the normal idle case.
    fn pop(&mut self, queue: &str) -> Result<Option<Job>, QueueError>;

    /// Acknowledge consumption of a job.
    fn delete(&mut self, job: &Job) -> Result<(), QueueError>;
}
