//! Shared utilities for the Parley chat backend.

pub mod logger;
pub mod time;
