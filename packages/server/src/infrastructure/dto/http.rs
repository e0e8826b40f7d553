//! HTTP API DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::ConnectionState;

use super::websocket::MessageDto;

/// Query parameters for the WebSocket upgrade
///
/// A missing token decodes as empty, which no user owns.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    #[serde(default)]
    pub token: String,
}

/// Query parameters for the channel history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub count: Option<usize>,
}

/// Channel history response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryDto {
    pub channel_id: u64,
    pub messages: Vec<MessageDto>,
}

/// One live session as shown by the debug endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SessionDto {
    pub connection_id: String,
    pub user_id: u64,
    pub channel_id: Option<u64>,
    pub state: ConnectionState,
    pub dropped: u64,
}
