//! Domain entities.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::value_object::{ChannelId, ConnectionId, MessageBody, MessageId, ServerId, UserId};

/// A message as stored by the persistence collaborator. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub server_id: ServerId,
    pub author: UserId,
    pub body: MessageBody,
    pub created_at: DateTime<Utc>,
}

/// Point-in-time view of one registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    /// Channel the connection is viewing; unset until the client selects one.
    pub channel_id: Option<ChannelId>,
}
