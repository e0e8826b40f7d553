//! InMemory Chat Store 実装
//!
//! ドメイン層が定義する `MessageRepository` / `MembershipRepository` /
//! `IdentityDirectory` の 3 つの trait をまとめて実装します（依存性の逆転）。
//! HashMap をインメモリ DB として使用します。
//!
//! ## 採番
//!
//! メッセージ ID は単一の `Mutex` の下で採番されるため、チャンネルをまたいで
//! 全体として単調増加します。

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use parley_shared::time::{Clock, SystemClock};
use tokio::sync::Mutex;

use crate::domain::{
    ChannelId, IdentityDirectory, MembershipRepository, MessageBody, MessageId, MessageRepository,
    PersistedMessage, RepositoryError, ServerId, UserId,
};

use super::seed::ChatSeed;

struct UserRecord {
    name: String,
}

struct ServerRecord {
    members: HashSet<UserId>,
}

struct ChannelRecord {
    server_id: ServerId,
}

#[derive(Default)]
struct StoreState {
    users: HashMap<UserId, UserRecord>,
    tokens: HashMap<String, UserId>,
    servers: HashMap<ServerId, ServerRecord>,
    channels: HashMap<ChannelId, ChannelRecord>,
    messages: HashMap<ChannelId, Vec<PersistedMessage>>,
    last_message_id: u64,
}

/// インメモリ Chat Store 実装
pub struct InMemoryChatStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryChatStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChatStore {
    /// 空のストアを作成
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// 時刻源を差し替えてストアを作成（テスト用）
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }

    /// シードデータからストアを作成
    pub fn from_seed(seed: &ChatSeed) -> Self {
        Self::from_seed_with_clock(seed, Arc::new(SystemClock))
    }

    pub fn from_seed_with_clock(seed: &ChatSeed, clock: Arc<dyn Clock>) -> Self {
        let mut state = StoreState::default();
        for user in &seed.users {
            let user_id = UserId::new(user.id);
            state.users.insert(
                user_id,
                UserRecord {
                    name: user.name.clone(),
                },
            );
            state.tokens.insert(user.token.clone(), user_id);
        }
        for server in &seed.servers {
            let server_id = ServerId::new(server.id);
            state.servers.insert(
                server_id,
                ServerRecord {
                    members: server.members.iter().copied().map(UserId::new).collect(),
                },
            );
            for channel in &server.channels {
                state
                    .channels
                    .insert(ChannelId::new(channel.id), ChannelRecord { server_id });
            }
        }
        Self {
            state: Mutex::new(state),
            clock,
        }
    }

    /// 保存済みメッセージの総数
    pub async fn count_messages(&self) -> usize {
        let state = self.state.lock().await;
        state.messages.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl MessageRepository for InMemoryChatStore {
    async fn append(
        &self,
        channel_id: ChannelId,
        author: UserId,
        body: MessageBody,
    ) -> Result<PersistedMessage, RepositoryError> {
        let mut state = self.state.lock().await;

        let server_id = state
            .channels
            .get(&channel_id)
            .map(|channel| channel.server_id)
            .ok_or(RepositoryError::ChannelNotFound(channel_id))?;
        if !state.users.contains_key(&author) {
            return Err(RepositoryError::UserNotFound(author));
        }

        state.last_message_id += 1;
        let message = PersistedMessage {
            id: MessageId::new(state.last_message_id),
            channel_id,
            server_id,
            author,
            body,
            created_at: self.clock.now(),
        };
        state
            .messages
            .entry(channel_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn fetch_recent(
        &self,
        channel_id: ChannelId,
        count: usize,
    ) -> Result<Vec<PersistedMessage>, RepositoryError> {
        let state = self.state.lock().await;
        if !state.channels.contains_key(&channel_id) {
            return Err(RepositoryError::ChannelNotFound(channel_id));
        }
        let history = state
            .messages
            .get(&channel_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let start = history.len().saturating_sub(count);
        Ok(history[start..].to_vec())
    }
}

#[async_trait]
impl MembershipRepository for InMemoryChatStore {
    async fn list_user_ids_for_server(
        &self,
        server_id: ServerId,
    ) -> Result<HashSet<UserId>, RepositoryError> {
        let state = self.state.lock().await;
        state
            .servers
            .get(&server_id)
            .map(|server| server.members.clone())
            .ok_or(RepositoryError::ServerNotFound(server_id))
    }

    async fn is_user_in_channel(
        &self,
        user_id: UserId,
        channel_id: ChannelId,
    ) -> Result<bool, RepositoryError> {
        let state = self.state.lock().await;
        let Some(channel) = state.channels.get(&channel_id) else {
            return Ok(false);
        };
        Ok(state
            .servers
            .get(&channel.server_id)
            .is_some_and(|server| server.members.contains(&user_id)))
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryChatStore {
    async fn display_name(&self, user_id: UserId) -> Result<String, RepositoryError> {
        let state = self.state.lock().await;
        state
            .users
            .get(&user_id)
            .map(|user| user.name.clone())
            .ok_or(RepositoryError::UserNotFound(user_id))
    }

    async fn authenticate(&self, token: &str) -> Option<UserId> {
        let state = self.state.lock().await;
        state.tokens.get(token).copied()
    }
}
