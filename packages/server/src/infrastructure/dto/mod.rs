//! Data Transfer Objects (DTOs) for the chat backend.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket frame DTOs and the frame codec
//! - `http`: HTTP API query and response DTOs

pub mod conversion;
pub mod http;
pub mod websocket;
