//! インメモリ Session Registry 実装
//!
//! ## 責務
//!
//! - 接続 ID → セッション（ユーザー・購読チャンネル・接続ハンドル）の管理
//! - チャンネル → 購読接続 ID 集合の逆引きインデックス
//! - ユーザー → 接続 ID 集合の逆引きインデックス（通知対象の解決用）
//!
//! ## 設計ノート
//!
//! 3 つのマップを 1 つの `RwLock` の下にまとめています。登録・付け替え・削除は
//! 書き込みロック 1 回の中で全マップを更新するため、ファンアウトが読み取りロックで
//! 取るスナップショットに「2 チャンネルに同時に属する接続」や「インデックスにだけ
//! 残った接続」が現れることはありません。ロック区間は数回のハッシュ操作のみで、
//! `.await` をまたぎません。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    ChannelId, Connection, ConnectionId, RegistryError, Session, SessionRegistry, SessionTarget,
    UserId,
};

struct SessionEntry {
    connection: Arc<Connection>,
    channel_id: Option<ChannelId>,
}

impl SessionEntry {
    fn session(&self) -> Session {
        Session {
            connection_id: self.connection.id(),
            user_id: self.connection.user_id(),
            channel_id: self.channel_id,
        }
    }

    fn target(&self) -> SessionTarget {
        SessionTarget {
            session: self.session(),
            connection: self.connection.clone(),
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<ConnectionId, SessionEntry>,
    channels: HashMap<ChannelId, HashSet<ConnectionId>>,
    users: HashMap<UserId, HashSet<ConnectionId>>,
}

impl RegistryInner {
    fn remove_from_channel(&mut self, channel_id: ChannelId, connection_id: ConnectionId) {
        if let Some(subscribers) = self.channels.get_mut(&channel_id) {
            subscribers.remove(&connection_id);
            // Clean up empty sets
            if subscribers.is_empty() {
                self.channels.remove(&channel_id);
            }
        }
    }

    fn remove_from_user(&mut self, user_id: UserId, connection_id: ConnectionId) {
        if let Some(connections) = self.users.get_mut(&user_id) {
            connections.remove(&connection_id);
            if connections.is_empty() {
                self.users.remove(&user_id);
            }
        }
    }
}

/// インメモリ Session Registry + Channel Subscription Index
#[derive(Default)]
pub struct InMemorySessionRegistry {
    inner: RwLock<RegistryInner>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn register(&self, connection: Arc<Connection>) -> Result<(), RegistryError> {
        let connection_id = connection.id();
        let user_id = connection.user_id();

        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(&connection_id) {
            return Err(RegistryError::DuplicateConnection(connection_id));
        }
        inner.sessions.insert(
            connection_id,
            SessionEntry {
                connection,
                channel_id: None,
            },
        );
        inner.users.entry(user_id).or_default().insert(connection_id);
        let total = inner.sessions.len();
        drop(inner);

        tracing::debug!(
            connection_id = %connection_id,
            user_id = %user_id,
            total,
            "Connection registered"
        );
        Ok(())
    }

    async fn set_channel(
        &self,
        connection_id: ConnectionId,
        channel_id: Option<ChannelId>,
    ) -> Result<Option<ChannelId>, RegistryError> {
        let mut inner = self.inner.write().await;

        let previous = {
            let entry = inner
                .sessions
                .get_mut(&connection_id)
                .ok_or(RegistryError::ConnectionNotFound(connection_id))?;
            // Closing connections must not re-enter the index
            if channel_id.is_some() && !entry.connection.is_active() {
                return Err(RegistryError::NotActive(connection_id));
            }
            std::mem::replace(&mut entry.channel_id, channel_id)
        };

        if previous != channel_id {
            if let Some(old) = previous {
                inner.remove_from_channel(old, connection_id);
            }
            if let Some(new) = channel_id {
                inner.channels.entry(new).or_default().insert(connection_id);
            }
        }
        drop(inner);

        tracing::debug!(
            connection_id = %connection_id,
            from = ?previous,
            to = ?channel_id,
            "Subscription changed"
        );
        Ok(previous)
    }

    async fn unregister(&self, connection_id: ConnectionId) -> Option<Session> {
        let mut inner = self.inner.write().await;
        let entry = inner.sessions.remove(&connection_id)?;
        let session = entry.session();
        if let Some(channel_id) = session.channel_id {
            inner.remove_from_channel(channel_id, connection_id);
        }
        inner.remove_from_user(session.user_id, connection_id);
        let total = inner.sessions.len();
        drop(inner);

        tracing::debug!(
            connection_id = %connection_id,
            user_id = %session.user_id,
            total,
            "Connection unregistered"
        );
        Some(session)
    }

    async fn lookup(&self, connection_id: ConnectionId) -> Option<Session> {
        let inner = self.inner.read().await;
        inner.sessions.get(&connection_id).map(SessionEntry::session)
    }

    async fn subscribers(&self, channel_id: ChannelId) -> HashSet<ConnectionId> {
        let inner = self.inner.read().await;
        inner.channels.get(&channel_id).cloned().unwrap_or_default()
    }

    async fn snapshot(
        &self,
        channel_id: ChannelId,
        members: &HashSet<UserId>,
    ) -> Vec<SessionTarget> {
        let inner = self.inner.read().await;

        let subscribed = inner.channels.get(&channel_id).into_iter().flatten();
        let of_members = members
            .iter()
            .filter_map(|user_id| inner.users.get(user_id))
            .flatten();

        let mut seen = HashSet::new();
        subscribed
            .chain(of_members)
            .filter(|connection_id| seen.insert(**connection_id))
            .filter_map(|connection_id| inner.sessions.get(connection_id))
            .map(SessionEntry::target)
            .collect()
    }

    async fn sessions(&self) -> Vec<SessionTarget> {
        let inner = self.inner.read().await;
        inner.sessions.values().map(SessionEntry::target).collect()
    }

    async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}
