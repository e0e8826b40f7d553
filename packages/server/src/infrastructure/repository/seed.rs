//! Seed data for the in-memory store.
//!
//! A seed is a JSON document describing users (with their session tokens),
//! servers, their members and channels:
//!
//! ```json
//! {
//!   "users": [{ "id": 1, "name": "alice", "token": "alice-token" }],
//!   "servers": [{
//!     "id": 1, "name": "general", "members": [1],
//!     "channels": [{ "id": 5, "name": "lobby" }]
//!   }]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    pub id: u64,
    pub name: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedChannel {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedServer {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub members: Vec<u64>,
    #[serde(default)]
    pub channels: Vec<SeedChannel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSeed {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub servers: Vec<SeedServer>,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ChatSeed {
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Small built-in dataset used when no seed file is configured.
    ///
    /// Three users on one server with two channels, plus a second server that
    /// only alice belongs to.
    pub fn demo() -> Self {
        let user = |id: u64, name: &str| SeedUser {
            id,
            name: name.to_string(),
            token: format!("{name}-token"),
        };
        let channel = |id: u64, name: &str| SeedChannel {
            id,
            name: name.to_string(),
        };
        Self {
            users: vec![user(1, "alice"), user(2, "bob"), user(3, "carol")],
            servers: vec![
                SeedServer {
                    id: 1,
                    name: "parley".to_string(),
                    members: vec![1, 2, 3],
                    channels: vec![channel(5, "general"), channel(9, "random")],
                },
                SeedServer {
                    id: 2,
                    name: "alice-private".to_string(),
                    members: vec![1],
                    channels: vec![channel(11, "notes")],
                },
            ],
        }
    }
}
