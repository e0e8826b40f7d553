//! UseCase: 接続中セッションの一覧（デバッグ用）

use std::sync::Arc;

use crate::domain::{SessionRegistry, SessionTarget};

pub struct GetSessionsUseCase {
    registry: Arc<dyn SessionRegistry>,
}

impl GetSessionsUseCase {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// 登録済みの全セッションを接続 ID 順で返す
    pub async fn execute(&self) -> Vec<SessionTarget> {
        let mut sessions = self.registry.sessions().await;
        sessions.sort_by_key(|target| *target.session.connection_id.as_uuid());
        sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Connection, UserId},
        infrastructure::registry::InMemorySessionRegistry,
    };

    #[tokio::test]
    async fn test_get_sessions() {
        // テスト項目: 登録済みのセッションがすべて返る
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let usecase = GetSessionsUseCase::new(registry.clone());
        let mut receivers = Vec::new();
        for user in [1, 2, 3] {
            let (connection, rx) = Connection::open(UserId::new(user), 1);
            registry.register(connection.clone()).await.unwrap();
            connection.activate();
            receivers.push(rx);
        }

        // when (操作):
        let sessions = usecase.execute().await;

        // then (期待する結果):
        assert_eq!(sessions.len(), 3);
        assert!(
            sessions
                .windows(2)
                .all(|w| w[0].session.connection_id.as_uuid() < w[1].session.connection_id.as_uuid())
        );
    }
}
