//! Value objects: identifiers and the validated message body.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValidationError;

/// Maximum length of a message body, counted in characters.
pub const MAX_MESSAGE_CHARS: usize = 1000;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ValidationError;

            /// Identifiers coming off the wire must be strictly positive.
            fn try_from(value: i64) -> Result<Self, Self::Error> {
                if value <= 0 {
                    return Err(ValidationError::InvalidId {
                        field: $field,
                        value,
                    });
                }
                Ok(Self(value as u64))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// User identifier, owned by the identity collaborator.
    UserId,
    "user_id"
);
numeric_id!(
    /// Chat server (group of channels) identifier.
    ServerId,
    "server_id"
);
numeric_id!(
    /// Channel identifier; the unit of subscription.
    ChannelId,
    "channel_id"
);
numeric_id!(
    /// Message identifier assigned by persistence; the ordering authority.
    MessageId,
    "message_id"
);

/// Opaque identity of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh random connection id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message body, guaranteed non-empty and at most [`MAX_MESSAGE_CHARS`]
/// characters long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MessageBody(String);

impl MessageBody {
    pub fn new(value: String) -> Result<Self, ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::EmptyBody);
        }
        let length = value.chars().count();
        if length > MAX_MESSAGE_CHARS {
            return Err(ValidationError::BodyTooLong {
                length,
                max: MAX_MESSAGE_CHARS,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// First `max_chars` characters of the body, cut on a character boundary.
    pub fn preview(&self, max_chars: usize) -> String {
        match self.0.char_indices().nth(max_chars) {
            Some((end, _)) => self.0[..end].to_string(),
            None => self.0.clone(),
        }
    }
}

impl TryFrom<String> for MessageBody {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
