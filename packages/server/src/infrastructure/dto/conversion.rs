//! Conversion logic between DTOs and domain models.

use parley_shared::time::to_rfc3339;

use crate::domain::{ConnectionState, MessageView, NotificationView, PersistedMessage, Session};
use crate::infrastructure::dto::{http::SessionDto, websocket::MessageDto};

// ========================================
// Domain Model → DTO
// ========================================

impl From<&MessageView> for MessageDto {
    fn from(view: &MessageView) -> Self {
        let message = &view.message;
        Self {
            messageid: message.id.value(),
            channelid: message.channel_id.value(),
            serverid: message.server_id.value(),
            userid: message.author.value(),
            username: view.author_name.clone(),
            date: to_rfc3339(&message.created_at),
            message: message.body.as_str().to_string(),
        }
    }
}

impl From<&NotificationView> for MessageDto {
    fn from(view: &NotificationView) -> Self {
        Self {
            messageid: view.message_id.value(),
            channelid: view.channel_id.value(),
            serverid: view.server_id.value(),
            userid: view.author.value(),
            username: view.author_name.clone(),
            date: to_rfc3339(&view.created_at),
            message: view.preview.clone(),
        }
    }
}

impl MessageDto {
    /// History entries carry the author's display name resolved by the caller.
    pub fn from_persisted(message: &PersistedMessage, author_name: String) -> Self {
        Self::from(&MessageView {
            message: message.clone(),
            author_name,
        })
    }
}

impl SessionDto {
    pub fn new(session: &Session, state: ConnectionState, dropped: u64) -> Self {
        Self {
            connection_id: session.connection_id.to_string(),
            user_id: session.user_id.value(),
            channel_id: session.channel_id.map(|id| id.value()),
            state,
            dropped,
        }
    }
}
