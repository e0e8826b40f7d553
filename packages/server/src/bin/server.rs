//! Parley chat server.
//!
//! Accepts authenticated WebSocket connections, persists posted messages and
//! fans them out to every session viewing the channel, with notifications for
//! the rest of the server's members.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin parley-server
//! cargo run --bin parley-server -- --host 0.0.0.0 --port 3000 --seed seed.json
//! ```

use std::sync::Arc;

use clap::Parser;
use parley_server::{
    app::{Collaborators, build_server, load_seed},
    config::ServerConfig,
    infrastructure::repository::InMemoryChatStore,
};
use parley_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(&[env!("CARGO_BIN_NAME")], &config.log_level);

    let seed = match load_seed(&config) {
        Ok(seed) => seed,
        Err(e) => {
            tracing::error!("Failed to load seed data: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        users = seed.users.len(),
        servers = seed.servers.len(),
        "Chat store ready"
    );

    let store = Arc::new(InMemoryChatStore::from_seed(&seed));
    let server = build_server(config.chat_settings(), Collaborators::in_memory(store));

    if let Err(e) = server.run(&config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
