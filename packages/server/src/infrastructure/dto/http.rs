//! HTTP API request/response DTOs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use hiroba_shared::time::millis_to_jst_rfc3339;

use crate::domain::{Connection, Topic};

/// Connection entry for the connection list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSummaryDto {
    pub uuid: String,
    #[serde(rename = "type")]
    pub session_type: String,
    pub admin: bool,
    pub name: Option<String>,
    pub ip_address: Option<String>,
    pub subscriptions: Vec<String>,
    pub notifications: usize,
    pub opened_at: String, // ISO 8601
}

impl From<&Connection> for ConnectionSummaryDto {
    fn from(connection: &Connection) -> Self {
        Self {
            uuid: connection.id().to_string(),
            session_type: connection.session_type().as_str().to_string(),
            admin: connection.is_admin(),
            name: connection.name().map(str::to_string),
            ip_address: connection.ip_address().map(str::to_string),
            subscriptions: connection
                .subscriptions()
                .iter()
                .map(ToString::to_string)
                .collect(),
            notifications: connection.notifications().len(),
            opened_at: millis_to_jst_rfc3339(connection.opened_at().value()),
        }
    }
}

/// Topic entry for the topic list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSummaryDto {
    pub uuid: String,
    pub name: String,
    pub subscribers: Vec<String>,
}

impl From<&Topic> for TopicSummaryDto {
    fn from(topic: &Topic) -> Self {
        Self {
            uuid: topic.id().to_string(),
            name: topic.name().to_string(),
            subscribers: topic
                .subscriptions()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Server status for the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub connections: usize,
    pub topics: usize,
    pub uptime: f64, // seconds
}

/// Body of `POST /api/jobs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequestDto {
    pub job: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAcceptedDto {
    pub id: String,
    pub queue: String,
}
