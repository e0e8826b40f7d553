//! Inbound client frames and outbound delivery units.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::entity::PersistedMessage;
use super::value_object::{ChannelId, MessageId, ServerId, UserId};

/// A decoded client frame. Identifiers are still raw wire values; the router
/// validates them. The sender is never part of the frame: it is the
/// authenticated user of the connection the frame arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Post `body` to `channel_id`, or to the current subscription when omitted.
    Post {
        channel_id: Option<i64>,
        body: String,
    },
    /// Start viewing a channel.
    Subscribe { channel_id: i64 },
    /// Stop viewing any channel.
    Unsubscribe,
}

/// Full message as delivered to subscribers of its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub message: PersistedMessage,
    pub author_name: String,
}

/// Lightweight summary sent to sessions not viewing the message's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationView {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub server_id: ServerId,
    pub author: UserId,
    pub author_name: String,
    pub preview: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationView {
    pub fn from_message(view: &MessageView, preview_chars: usize) -> Self {
        let message = &view.message;
        Self {
            message_id: message.id,
            channel_id: message.channel_id,
            server_id: message.server_id,
            author: message.author,
            author_name: view.author_name.clone(),
            preview: message.body.preview(preview_chars),
            created_at: message.created_at,
        }
    }
}

/// One queued send. Message payloads are shared between every queue they are
/// fanned out to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundUnit {
    FullMessage(Arc<MessageView>),
    Notification(Arc<NotificationView>),
    Error { reason: String },
}

impl OutboundUnit {
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            reason: reason.into(),
        }
    }

    /// Message id carried by the unit, if any.
    pub fn message_id(&self) -> Option<MessageId> {
        match self {
            Self::FullMessage(view) => Some(view.message.id),
            Self::Notification(view) => Some(view.message_id),
            Self::Error { .. } => None,
        }
    }
}
