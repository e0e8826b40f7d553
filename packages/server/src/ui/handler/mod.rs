//! HTTP and WebSocket handlers.

mod http;
mod websocket;

pub use http::{debug_sessions, get_channel_history, health_check};
pub use websocket::{accept_connection, spawn_connection_tasks, websocket_handler};
