//! Session Registry trait 定義
//!
//! 接続 ID → (ユーザー, 購読チャンネル) の対応と、チャンネル → 購読接続集合の
//! 逆引きインデックスを一体で管理するインターフェース。
//!
//! ## 不変条件
//!
//! - 1 つの接続はたかだか 1 つのチャンネル集合にしか現れない
//! - 全チャンネル集合の和集合は Active な接続の部分集合
//! - 呼び出し側が購読状態を直接書き換えることはなく、必ずこの trait の操作を経由する

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;

use super::{ChannelId, Connection, ConnectionId, RegistryError, Session, UserId};

/// A fan-out target: the session as seen in the snapshot plus the handle used
/// to reach its queue.
#[derive(Debug, Clone)]
pub struct SessionTarget {
    pub session: Session,
    pub connection: Arc<Connection>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// 接続を登録する（購読チャンネルは未設定）
    async fn register(&self, connection: Arc<Connection>) -> Result<(), RegistryError>;

    /// 購読チャンネルを付け替える（旧チャンネルから外し、新チャンネルに追加）。
    /// `None` は購読解除。付け替え前のチャンネルを返す。
    async fn set_channel(
        &self,
        connection_id: ConnectionId,
        channel_id: Option<ChannelId>,
    ) -> Result<Option<ChannelId>, RegistryError>;

    /// 登録とインデックスの両方から削除する。未登録なら `None`（冪等）。
    async fn unregister(&self, connection_id: ConnectionId) -> Option<Session>;

    /// 接続の現在のユーザーと購読チャンネル
    async fn lookup(&self, connection_id: ConnectionId) -> Option<Session>;

    /// チャンネルを購読している接続 ID の集合
    async fn subscribers(&self, channel_id: ChannelId) -> HashSet<ConnectionId>;

    /// ファンアウト用スナップショット: `channel_id` の購読者と `members` に属する
    /// ユーザーの全接続の和集合（重複なし）を一貫した時点で取得する
    async fn snapshot(
        &self,
        channel_id: ChannelId,
        members: &HashSet<UserId>,
    ) -> Vec<SessionTarget>;

    /// 登録されている全セッション
    async fn sessions(&self) -> Vec<SessionTarget>;

    /// 登録されている接続数
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
