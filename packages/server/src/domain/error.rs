//! Domain error types.

use thiserror::Error;

use super::value_object::{ChannelId, ConnectionId, ServerId, UserId};

/// Rejected client input. Reported to the sender only; never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("message body must not be empty")]
    EmptyBody,
    #[error("message body is {length} characters long, the maximum is {max}")]
    BodyTooLong { length: usize, max: usize },
    #[error("invalid {field}: {value}")]
    InvalidId { field: &'static str, value: i64 },
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("unknown message_type '{0}'")]
    UnknownMessageType(String),
}

/// Failure reported by one of the storage collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("channel {0} not found")]
    ChannelNotFound(ChannelId),
    #[error("server {0} not found")]
    ServerNotFound(ServerId),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Outcome of a failed `enqueue` on a connection's outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PushError {
    /// The bounded queue is saturated; the unit was dropped and counted.
    #[error("outbound queue is full")]
    QueueFull,
    /// The connection is no longer active; the unit was discarded.
    #[error("connection is closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
    #[error("connection {0} is not registered")]
    ConnectionNotFound(ConnectionId),
    #[error("connection {0} is not active")]
    NotActive(ConnectionId),
}
