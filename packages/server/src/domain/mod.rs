//! Domain layer: identifiers, entities, the connection model and the
//! interfaces of the external collaborators.

pub mod connection;
pub mod entity;
pub mod error;
pub mod frame;
pub mod policy;
pub mod repository;
pub mod session_registry;
pub mod value_object;

pub use connection::{CloseReason, Connection, ConnectionState, wait_for_shutdown};
pub use entity::{PersistedMessage, Session};
pub use error::{PushError, RegistryError, RepositoryError, ValidationError};
pub use frame::{InboundFrame, MessageView, NotificationView, OutboundUnit};
pub use policy::{Delivery, should_notify};
pub use repository::{IdentityDirectory, MembershipRepository, MessageRepository};
#[cfg(test)]
pub use repository::{MockIdentityDirectory, MockMembershipRepository, MockMessageRepository};
pub use session_registry::{SessionRegistry, SessionTarget};
#[cfg(test)]
pub use session_registry::MockSessionRegistry;
pub use value_object::{
    ChannelId, ConnectionId, MAX_MESSAGE_CHARS, MessageBody, MessageId, ServerId, UserId,
};
