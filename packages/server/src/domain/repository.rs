//! Repository trait 定義
//!
//! ドメイン層が必要とする外部コラボレーター（永続化・メンバーシップ・ユーザー情報）の
//! インターフェースを定義します。具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use std::collections::HashSet;

use async_trait::async_trait;

use super::{
    ChannelId, MessageBody, PersistedMessage, RepositoryError, ServerId, UserId,
};

/// Message persistence.
///
/// `append` assigns message ids that increase monotonically per channel (the
/// in-memory implementation makes them globally monotonic). Appends to the
/// same channel are serialized by the implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// メッセージを永続化し、採番済みのメッセージを返す
    async fn append(
        &self,
        channel_id: ChannelId,
        author: UserId,
        body: MessageBody,
    ) -> Result<PersistedMessage, RepositoryError>;

    /// チャンネルの直近 `count` 件を古い順に取得
    async fn fetch_recent(
        &self,
        channel_id: ChannelId,
        count: usize,
    ) -> Result<Vec<PersistedMessage>, RepositoryError>;
}

/// Server and channel membership.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// サーバーに所属する全ユーザーの ID を取得
    async fn list_user_ids_for_server(
        &self,
        server_id: ServerId,
    ) -> Result<HashSet<UserId>, RepositoryError>;

    /// ユーザーがチャンネルにアクセスできるか。存在しないチャンネルは `false`。
    async fn is_user_in_channel(
        &self,
        user_id: UserId,
        channel_id: ChannelId,
    ) -> Result<bool, RepositoryError>;
}

/// User identity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// 表示名を取得
    async fn display_name(&self, user_id: UserId) -> Result<String, RepositoryError>;

    /// セッショントークンからユーザーを解決（未知のトークンは `None`）
    async fn authenticate(&self, token: &str) -> Option<UserId>;
}
