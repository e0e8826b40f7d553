//! Real-time chat backend library.
//!
//! This library owns every live WebSocket connection, tracks which channel each
//! session is viewing, persists inbound messages and fans them out to the
//! sessions that should see them.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// composition root and configuration
pub mod app;
pub mod config;
