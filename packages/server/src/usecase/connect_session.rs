//! UseCase: セッション接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectSessionUseCase::execute() メソッド
//! - 接続の生成（Connecting）→ Registry への登録 → Active への遷移
//!
//! ### なぜこのテストが必要か
//! - ファンアウト対象になるのは Registry に登録済みかつ Active の接続だけ
//! - 送信キューの容量が設定値どおりであることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規接続の登録
//! - 正常系：同一ユーザーの複数接続（タブごとに別セッション）

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::{CloseReason, Connection, OutboundUnit, SessionRegistry, UserId};

use super::error::ConnectError;

/// セッション接続のユースケース
pub struct ConnectSessionUseCase {
    /// SessionRegistry（接続管理の抽象化）
    registry: Arc<dyn SessionRegistry>,
    /// 接続ごとの送信キュー容量
    queue_capacity: usize,
}

impl ConnectSessionUseCase {
    /// 新しい ConnectSessionUseCase を作成
    pub fn new(registry: Arc<dyn SessionRegistry>, queue_capacity: usize) -> Self {
        Self {
            registry,
            queue_capacity,
        }
    }

    /// 接続を受け入れる
    ///
    /// # Arguments
    ///
    /// * `user_id` - 認証済みユーザーの ID（Domain Model）
    ///
    /// # Returns
    ///
    /// * `Ok((Arc<Connection>, Receiver))` - Active になった接続と、書き込みループが消費する送信キュー
    /// * `Err(ConnectError)` - 登録失敗
    pub async fn execute(
        &self,
        user_id: UserId,
    ) -> Result<(Arc<Connection>, mpsc::Receiver<OutboundUnit>), ConnectError> {
        let (connection, receiver) = Connection::open(user_id, self.queue_capacity);

        if let Err(e) = self.registry.register(connection.clone()).await {
            connection.begin_close(CloseReason::ServerShutdown);
            connection.mark_closed();
            return Err(e.into());
        }
        connection.activate();

        tracing::info!(
            connection_id = %connection.id(),
            user_id = %user_id,
            capacity = connection.capacity(),
            "Connection accepted"
        );
        Ok((connection, receiver))
    }
}
