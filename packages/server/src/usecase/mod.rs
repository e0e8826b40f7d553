//! UseCase 層
//!
//! ドメイン層の trait（Repository / SessionRegistry）にのみ依存し、具体的な実装は
//! 起動時に注入されます。

pub mod connect_session;
pub mod disconnect_session;
pub mod error;
pub mod fan_out;
pub mod get_channel_history;
pub mod get_sessions;
pub mod route_frame;
pub mod select_channel;
pub mod send_message;

pub use connect_session::ConnectSessionUseCase;
pub use disconnect_session::DisconnectSessionUseCase;
pub use error::{ConnectError, HistoryError, RouteError, SelectChannelError, SendMessageError};
pub use fan_out::{DeliveryReport, FanOutEngine};
pub use get_channel_history::GetChannelHistoryUseCase;
pub use get_sessions::GetSessionsUseCase;
pub use route_frame::{MessageRouter, Routed};
pub use select_channel::SelectChannelUseCase;
pub use send_message::{ChannelSequencer, SendMessageUseCase};
