//! Server configuration.
//!
//! Every option can be given on the command line or through a `PARLEY_*`
//! environment variable.

use std::{path::PathBuf, time::Duration};

use clap::Parser;

/// Parley chat server
#[derive(Parser, Debug, Clone)]
#[command(name = "parley-server", version, about = "Real-time chat backend with channel fan-out", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "PARLEY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PARLEY_PORT", default_value = "8080")]
    pub port: u16,

    /// Capacity of each connection's outbound queue
    #[arg(long, env = "PARLEY_QUEUE_CAPACITY", default_value = "64")]
    pub queue_capacity: usize,

    /// Close connections that send nothing for this many seconds
    #[arg(long, env = "PARLEY_IDLE_TIMEOUT_SECS", default_value = "300")]
    pub idle_timeout_secs: u64,

    /// Send a WebSocket ping to every connection this often (seconds)
    #[arg(
        long,
        env = "PARLEY_PING_INTERVAL_SECS",
        default_value = "30",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub ping_interval_secs: u64,

    /// Maximum characters of a message body shown in notifications
    #[arg(long, env = "PARLEY_PREVIEW_CHARS", default_value = "100")]
    pub preview_chars: usize,

    /// Maximum number of messages returned by the history endpoint
    #[arg(long, env = "PARLEY_HISTORY_LIMIT", default_value = "50")]
    pub history_limit: usize,

    /// JSON seed file for the in-memory store (built-in demo data when omitted)
    #[arg(long, env = "PARLEY_SEED")]
    pub seed: Option<PathBuf>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, env = "PARLEY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            queue_capacity: self.queue_capacity,
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            ping_interval: Duration::from_secs(self.ping_interval_secs),
            ..ConnectionSettings::default()
        }
    }

    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            connection: self.connection_settings(),
            preview_chars: self.preview_chars,
            history_limit: self.history_limit,
        }
    }
}

/// Settings consumed when wiring the use cases together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatSettings {
    pub connection: ConnectionSettings,
    /// Maximum characters of a body carried by a notification.
    pub preview_chars: usize,
    /// Maximum number of messages per history request.
    pub history_limit: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            connection: ConnectionSettings::default(),
            preview_chars: 100,
            history_limit: 50,
        }
    }
}

/// Per-connection tuning used by the WebSocket handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub queue_capacity: usize,
    pub idle_timeout: Duration,
    /// Interval of server pings; a client's pong counts as activity.
    pub ping_interval: Duration,
    /// How long the write loop may spend sending the close frame.
    pub close_grace: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            idle_timeout: Duration::from_secs(300),
            ping_interval: Duration::from_secs(30),
            close_grace: Duration::from_secs(1),
        }
    }
}
