//! Notification policy.
//!
//! Pure functions deciding what each session receives for a persisted
//! message, without side effects, making them easy to test.

use super::entity::{PersistedMessage, Session};
use super::value_object::ConnectionId;

/// What a single session receives for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    FullMessage,
    Notification,
    Suppress,
}

/// Decide what `session` receives for `message`.
///
/// # Arguments
///
/// * `session` - The recipient session (its user and current subscription)
/// * `message` - The persisted message being fanned out
/// * `is_server_member` - Whether the session's user belongs to the message's server
/// * `origin` - The connection the message was posted from, if any
///
/// # Returns
///
/// * `Suppress` when the session views no channel and its user is not a member
/// * `FullMessage` when the session views the message's channel
/// * `Suppress` when the session is the posting connection (no self-notification)
/// * `Notification` otherwise
pub fn should_notify(
    session: &Session,
    message: &PersistedMessage,
    is_server_member: bool,
    origin: Option<ConnectionId>,
) -> Delivery {
    if session.channel_id.is_none() && !is_server_member {
        return Delivery::Suppress;
    }
    if session.channel_id == Some(message.channel_id) {
        return Delivery::FullMessage;
    }
    if origin == Some(session.connection_id) {
        return Delivery::Suppress;
    }
    Delivery::Notification
}
