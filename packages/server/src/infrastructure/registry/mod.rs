//! Session Registry の実装
//!
//! - `inmemory`: 単一プロセス内の `RwLock` ベースの実装

pub mod inmemory;

pub use inmemory::InMemorySessionRegistry;
