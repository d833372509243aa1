//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::error::ValueObjectError;

/// Maximum length of a topic name in characters.
pub const TOPIC_NAME_MAX_LENGTH: usize = 100;

/// Connection identifier value object.
///
/// Assigned once when the socket opens and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Wrap an already generated UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a connection id from its hyphenated string form.
    pub fn parse(id: &str) -> Result<Self, ValueObjectError> {
        Uuid::parse_str(id)
            .map(Self)
            .map_err(|_| ValueObjectError::ConnectionIdInvalid(id.to_string()))
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionId {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Topic identifier value object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(Uuid);

impl TopicId {
    /// Wrap an already generated UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a topic id from its hyphenated string form.
    pub fn parse(id: &str) -> Result<Self, ValueObjectError> {
        Uuid::parse_str(id)
            .map(Self)
            .map_err(|_| ValueObjectError::TopicIdInvalid(id.to_string()))
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TopicId {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Topic name value object.
///
/// Non-empty and at most [`TOPIC_NAME_MAX_LENGTH`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TopicName(String);

impl TopicName {
    /// Create a new TopicName.
    ///
    /// # Errors
    ///
    /// Returns `ValueObjectError::TopicNameEmpty` for blank names and
    /// `ValueObjectError::TopicNameTooLong` above the length limit.
    pub fn new(name: String) -> Result<Self, ValueObjectError> {
        if name.trim().is_empty() {
            return Err(ValueObjectError::TopicNameEmpty);
        }
        let len = name.chars().count();
        if len > TOPIC_NAME_MAX_LENGTH {
            return Err(ValueObjectError::TopicNameTooLong {
                max: TOPIC_NAME_MAX_LENGTH,
                actual: len,
            });
        }
        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TopicName {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TopicName> for String {
    fn from(name: TopicName) -> Self {
        name.0
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of session a connection currently has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    #[default]
    Anonymous,
    Player,
    Spectator,
    Winner,
    Loser,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Player => "player",
            Self::Spectator => "spectator",
            Self::Winner => "winner",
            Self::Loser => "loser",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamp value object (Unix milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    /// Wall-clock now.
    pub fn now() -> Self {
        Self(hiroba_shared::time::now_millis())
    }

    /// Get the inner millisecond value.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Whole seconds since the epoch.
    pub fn as_secs(&self) -> i64 {
        self.0.div_euclid(1000)
    }
}
