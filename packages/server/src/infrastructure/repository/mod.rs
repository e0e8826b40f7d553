//! Repository の実装
//!
//! - `inmemory`: HashMap を使ったインメモリ実装
//! - `seed`: インメモリ実装の初期データ

pub mod inmemory;
pub mod seed;

pub use inmemory::InMemoryChatStore;
pub use seed::{ChatSeed, SeedError};
