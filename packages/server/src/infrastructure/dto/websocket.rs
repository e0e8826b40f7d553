//! WebSocket message DTOs.
//!
//! Outbound:
//! - full message: bare object `{messageid, channelid, serverid, userid, username, date, message}`
//! - notification: `{"message_type": "message", "payload": {same fields, message = preview}}`
//! - error: `{"message_type": "error", "payload": {"reason": ...}}`
//!
//! Inbound:
//! - bare post frame: `{"channel_id": 5, "message": "hi"}` (`channel_id` optional)
//! - tagged envelope: `{"message_type": "message" | "subscribe" | "unsubscribe", "payload": {...}}`

use serde::{Deserialize, Serialize};

use crate::domain::{InboundFrame, OutboundUnit, ValidationError};

/// Envelope message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Message,
    Error,
}

/// Message as seen by clients (full message or notification payload)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub messageid: u64,
    pub channelid: u64,
    pub serverid: u64,
    pub userid: u64,
    pub username: String,
    /// RFC 3339 UTC
    pub date: String,
    pub message: String,
}

/// Tagged envelope wrapping a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeDto<P> {
    pub message_type: MessageType,
    pub payload: P,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub reason: String,
}

/// Bare inbound post frame
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostMessageFrame {
    #[serde(default)]
    pub channel_id: Option<i64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscribePayload {
    pub channel_id: i64,
}

/// Inbound envelope before its payload is interpreted
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    message_type: String,
    #[serde(default)]
    payload: serde_json::Value,
}

fn malformed(err: serde_json::Error) -> ValidationError {
    ValidationError::MalformedFrame(err.to_string())
}

/// Decode one inbound text frame into a closed set of frame variants.
///
/// Objects carrying a `message_type` key are treated as envelopes; anything
/// else must be a bare post frame.
pub fn decode_client_frame(text: &str) -> Result<InboundFrame, ValidationError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(malformed)?;
    if !value.is_object() {
        return Err(ValidationError::MalformedFrame(
            "frame must be a JSON object".to_string(),
        ));
    }

    if value.get("message_type").is_none() {
        let frame: PostMessageFrame = serde_json::from_value(value).map_err(malformed)?;
        return Ok(InboundFrame::Post {
            channel_id: frame.channel_id,
            body: frame.message,
        });
    }

    let envelope: RawEnvelope = serde_json::from_value(value).map_err(malformed)?;
    match envelope.message_type.as_str() {
        "message" => {
            let frame: PostMessageFrame =
                serde_json::from_value(envelope.payload).map_err(malformed)?;
            Ok(InboundFrame::Post {
                channel_id: frame.channel_id,
                body: frame.message,
            })
        }
        "subscribe" => {
            let payload: SubscribePayload =
                serde_json::from_value(envelope.payload).map_err(malformed)?;
            Ok(InboundFrame::Subscribe {
                channel_id: payload.channel_id,
            })
        }
        "unsubscribe" => Ok(InboundFrame::Unsubscribe),
        other => Err(ValidationError::UnknownMessageType(other.to_string())),
    }
}

/// Serialize one outbound unit into the text frame written to the socket.
pub fn encode_outbound(unit: &OutboundUnit) -> Result<String, serde_json::Error> {
    match unit {
        OutboundUnit::FullMessage(view) => serde_json::to_string(&MessageDto::from(view.as_ref())),
        OutboundUnit::Notification(view) => serde_json::to_string(&EnvelopeDto {
            message_type: MessageType::Message,
            payload: MessageDto::from(view.as_ref()),
        }),
        OutboundUnit::Error { reason } => serde_json::to_string(&EnvelopeDto {
            message_type: MessageType::Error,
            payload: ErrorPayload {
                reason: reason.clone(),
            },
        }),
    }
}
