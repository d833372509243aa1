//! Domain layer.
//!
//! Entities, value objects, registries and wire messages, plus the two ports
//! (`Broker`, `JobQueue`) the core talks to the outside world through. Nothing here
//! knows about axum or the event loop.

pub mod broker;
pub mod entity;
pub mod error;
pub mod factory;
pub mod message;
pub mod queue;
pub mod registry;
pub mod value_object;

pub use broker::{Broker, Outgoing, Socket, TransportError};
pub use entity::{Connection, Notification, Topic};
pub use error::ValueObjectError;
pub use factory::{ConnectionIdFactory, TopicIdFactory};
pub use message::{ClientMessage, Envelope, Message, MessageKind, Protection, ServerMessage};
pub use queue::{Job, JobPayload, JobQueue, QueueError};
pub use registry::{Connections, Notifications, Topics};
pub use value_object::{ConnectionId, SessionType, Timestamp, TopicId, TopicName};
