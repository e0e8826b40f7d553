//! UseCase: セッション切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectSessionUseCase::execute() / close_all() メソッド
//! - Closing への遷移・購読解除・Registry からの削除がちょうど 1 回だけ行われること
//!
//! ### なぜこのテストが必要か
//! - 読み込みループと書き込みループは同時に終了しうる。どちらから呼ばれても、
//!   何度呼ばれても、後始末は 1 回だけでなければならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：切断で Registry とインデックスから消える
//! - エッジケース：二重切断、並行切断
//! - 正常系：サーバー停止時の全切断

use std::sync::Arc;

use crate::domain::{CloseReason, Connection, SessionRegistry};

/// セッション切断のユースケース
pub struct DisconnectSessionUseCase {
    /// SessionRegistry（接続管理の抽象化）
    registry: Arc<dyn SessionRegistry>,
}

impl DisconnectSessionUseCase {
    /// 新しい DisconnectSessionUseCase を作成
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// 接続を閉じる
    ///
    /// Closing への遷移に勝った呼び出しだけが Registry から削除する。
    ///
    /// # Returns
    ///
    /// * `true` - この呼び出しが後始末を行った
    /// * `false` - すでに閉じられていた（no-op）
    pub async fn execute(&self, connection: &Connection, reason: CloseReason) -> bool {
        if !connection.begin_close(reason) {
            return false;
        }

        let session = self.registry.unregister(connection.id()).await;
        tracing::info!(
            connection_id = %connection.id(),
            user_id = %connection.user_id(),
            channel_id = ?session.and_then(|s| s.channel_id),
            reason = reason.as_str(),
            dropped = connection.dropped_count(),
            "Connection closed"
        );
        true
    }

    /// 全接続を閉じる（サーバー停止時）
    ///
    /// # Returns
    ///
    /// 閉じた接続数
    pub async fn close_all(&self, reason: CloseReason) -> usize {
        let targets = self.registry.sessions().await;
        let mut closed = 0;
        for target in targets {
            if self.execute(&target.connection, reason).await {
                closed += 1;
            }
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChannelId, ConnectionState, OutboundUnit, UserId, wait_for_shutdown},
        infrastructure::registry::InMemorySessionRegistry,
    };
    use tokio::sync::mpsc;

    async fn create_registered(
        registry: &InMemorySessionRegistry,
        user: u64,
        channel: Option<u64>,
    ) -> (Arc<Connection>, mpsc::Receiver<OutboundUnit>) {
        let (connection, rx) = Connection::open(UserId::new(user), 4);
        registry.register(connection.clone()).await.unwrap();
        connection.activate();
        if let Some(channel) = channel {
            registry
                .set_channel(connection.id(), Some(ChannelId::new(channel)))
                .await
                .unwrap();
        }
        (connection, rx)
    }

    #[tokio::test]
    async fn test_disconnect_removes_session_and_subscription() {
        // テスト項目: 切断で Registry とチャンネルインデックスの両方から消える
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let usecase = DisconnectSessionUseCase::new(registry.clone());
        let (connection, _rx) = create_registered(&registry, 1, Some(5)).await;

        // when (操作):
        let closed = usecase.execute(&connection, CloseReason::ClientClosed).await;

        // then (期待する結果):
        assert!(closed);
        assert_eq!(connection.state(), ConnectionState::Closing);
        assert_eq!(connection.close_reason(), Some(CloseReason::ClientClosed));
        assert!(registry.lookup(connection.id()).await.is_none());
        assert!(registry.subscribers(ChannelId::new(5)).await.is_empty());

        let mut signal = connection.shutdown_signal();
        wait_for_shutdown(&mut signal).await;
    }

    #[tokio::test]
    async fn test_disconnect_twice_is_noop() {
        // テスト項目: 二度目の切断は何もしない（理由も上書きされない）
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let usecase = DisconnectSessionUseCase::new(registry.clone());
        let (connection, _rx) = create_registered(&registry, 1, None).await;
        usecase.execute(&connection, CloseReason::ReadError).await;
        connection.mark_closed();

        // when (操作):
        let closed = usecase.execute(&connection, CloseReason::WriteError).await;

        // then (期待する結果):
        assert!(!closed);
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert_eq!(connection.close_reason(), Some(CloseReason::ReadError));
    }

    #[tokio::test]
    async fn test_concurrent_disconnect_has_single_winner() {
        // テスト項目: 並行した切断のうち後始末を行うのは 1 つだけ
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let usecase = Arc::new(DisconnectSessionUseCase::new(registry.clone()));
        let (connection, _rx) = create_registered(&registry, 1, Some(9)).await;

        // when (操作):
        let mut handles = Vec::new();
        for _ in 0..8 {
            let usecase = usecase.clone();
            let connection = connection.clone();
            handles.push(tokio::spawn(async move {
                usecase.execute(&connection, CloseReason::ReadError).await
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        // then (期待する結果):
        assert_eq!(winners, 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_close_all() {
        // テスト項目: close_all で全接続が閉じられる
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let usecase = DisconnectSessionUseCase::new(registry.clone());
        let (first, _rx1) = create_registered(&registry, 1, Some(5)).await;
        let (second, _rx2) = create_registered(&registry, 2, None).await;

        // when (操作):
        let closed = usecase.close_all(CloseReason::ServerShutdown).await;

        // then (期待する結果):
        assert_eq!(closed, 2);
        assert!(registry.is_empty().await);
        assert_eq!(first.close_reason(), Some(CloseReason::ServerShutdown));
        assert_eq!(second.state(), ConnectionState::Closing);
    }
}
