//! UseCase: メッセージ送信処理
//!
//! チャンネルへのアクセス確認 → 永続化（ID 採番）→ ファンアウトを行います。
//! 同じチャンネルへの送信は `ChannelSequencer` で直列化され、永続化と配送の間に
//! 別の送信が割り込まないため、購読者は常に採番順にメッセージを受け取ります。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 永続化とファンアウトの連携、アクセス権の確認、永続化失敗時の扱い
//!
//! ### なぜこのテストが必要か
//! - 永続化に失敗したメッセージは誰にも配送されてはならない
//! - 並行送信があっても購読者が見る ID は単調増加でなければならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：メッセージ送信とファンアウト
//! - 異常系：アクセス権のないチャンネル、永続化の失敗
//! - エッジケース：同一チャンネルへの並行送信

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{
    ChannelId, ConnectionId, MembershipRepository, MessageBody, MessageRepository, PersistedMessage, UserId,
};

use super::{
    error::SendMessageError,
    fan_out::{DeliveryReport, FanOutEngine},
};

/// チャンネルごとの直列化ロック
#[derive(Default)]
pub struct ChannelSequencer {
    locks: Mutex<HashMap<ChannelId, Arc<Mutex<()>>>>,
}

impl ChannelSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// チャンネルのロックを取得する。ガードが生きている間、同じチャンネルの他の送信は待たされる。
    pub async fn acquire(&self, channel_id: ChannelId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(channel_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// MessageRepository（永続化の抽象化）
    messages: Arc<dyn MessageRepository>,
    /// MembershipRepository（アクセス権確認の抽象化）
    membership: Arc<dyn MembershipRepository>,
    fan_out: Arc<FanOutEngine>,
    sequencer: ChannelSequencer,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        membership: Arc<dyn MembershipRepository>,
        fan_out: Arc<FanOutEngine>,
    ) -> Self {
        Self {
            messages,
            membership,
            fan_out,
            sequencer: ChannelSequencer::new(),
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `sender` - 送信者（接続の認証済みユーザー。フレームの内容からは決して取らない）
    /// * `origin` - 投稿元の接続（自分自身への通知の抑止に使う）
    /// * `channel_id` - 送信先チャンネル
    /// * `body` - 検証済みの本文
    ///
    /// # Returns
    ///
    /// * `Ok((PersistedMessage, DeliveryReport))` - 永続化されたメッセージと配送結果
    /// * `Err(SendMessageError)` - 送信失敗（配送は行われない）
    pub async fn execute(
        &self,
        sender: UserId,
        origin: ConnectionId,
        channel_id: ChannelId,
        body: MessageBody,
    ) -> Result<(PersistedMessage, DeliveryReport), SendMessageError> {
        // 1. アクセス権の確認
        let allowed = self
            .membership
            .is_user_in_channel(sender, channel_id)
            .await
            .map_err(SendMessageError::Membership)?;
        if !allowed {
            return Err(SendMessageError::Unauthorized(format!(
                "no access to channel {channel_id}"
            )));
        }

        // 2. 永続化 + 配送（チャンネル単位で直列化）
        let _guard = self.sequencer.acquire(channel_id).await;

        let persisted = self
            .messages
            .append(channel_id, sender, body)
            .await
            .map_err(|e| {
                tracing::error!(
                    user_id = %sender,
                    channel_id = %channel_id,
                    error = %e,
                    "Failed to persist message"
                );
                SendMessageError::Persistence(e)
            })?;

        let report = self.fan_out.deliver(persisted.clone(), Some(origin)).await;
        Ok((persisted, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            Connection, MockIdentityDirectory, MockMembershipRepository, MockMessageRepository,
            OutboundUnit, RepositoryError, SessionRegistry,
        },
        infrastructure::{
            registry::InMemorySessionRegistry,
            repository::{ChatSeed, InMemoryChatStore},
        },
    };

    fn body(text: &str) -> MessageBody {
        MessageBody::new(text.to_string()).unwrap()
    }

    fn create_usecase_with_store(
        store: Arc<InMemoryChatStore>,
        registry: Arc<InMemorySessionRegistry>,
    ) -> SendMessageUseCase {
        let fan_out = Arc::new(FanOutEngine::new(
            registry,
            store.clone(),
            store.clone(),
            100,
        ));
        SendMessageUseCase::new(store.clone(), store, fan_out)
    }

    #[tokio::test]
    async fn test_send_message_persists_and_delivers() {
        // テスト項目: 送信したメッセージが永続化され、購読者に配送される
        // given (前提条件):
        let store = Arc::new(InMemoryChatStore::from_seed(&ChatSeed::demo()));
        let registry = Arc::new(InMemorySessionRegistry::new());
        let (bob, mut bob_rx) = Connection::open(UserId::new(2), 8);
        registry.register(bob.clone()).await.unwrap();
        bob.activate();
        registry
            .set_channel(bob.id(), Some(ChannelId::new(5)))
            .await
            .unwrap();
        let usecase = create_usecase_with_store(store.clone(), registry);

        // when (操作):
        let (persisted, report) = usecase
            .execute(
                UserId::new(1),
                ConnectionId::generate(),
                ChannelId::new(5),
                body("hi bob"),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(persisted.author, UserId::new(1));
        assert_eq!(report.full_messages, 1);
        assert_eq!(store.count_messages().await, 1);
        match bob_rx.try_recv().unwrap() {
            OutboundUnit::FullMessage(view) => {
                assert_eq!(view.message.id, persisted.id);
                assert_eq!(view.author_name, "alice");
            }
            other => panic!("expected full message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_to_inaccessible_channel_is_unauthorized() {
        // テスト項目: アクセス権のないチャンネルへの送信は Unauthorized、永続化されない
        // given (前提条件):
        let store = Arc::new(InMemoryChatStore::from_seed(&ChatSeed::demo()));
        let usecase =
            create_usecase_with_store(store.clone(), Arc::new(InMemorySessionRegistry::new()));

        // when (操作):
        let result = usecase
            .execute(
                UserId::new(2),
                ConnectionId::generate(),
                ChannelId::new(11),
                body("let me in"),
            )
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(SendMessageError::Unauthorized(_))));
        assert_eq!(store.count_messages().await, 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_skips_fan_out() {
        // テスト項目: 永続化に失敗した場合はエラーを返し、ファンアウトは行わない
        // given (前提条件):
        let mut messages = MockMessageRepository::new();
        messages
            .expect_append()
            .returning(|_, _, _| Err(RepositoryError::Storage("disk full".to_string())));
        let mut membership = MockMembershipRepository::new();
        membership
            .expect_is_user_in_channel()
            .returning(|_, _| Ok(true));
        membership.expect_list_user_ids_for_server().never();
        let mut identity = MockIdentityDirectory::new();
        identity.expect_display_name().never();
        let membership = Arc::new(membership);
        let fan_out = Arc::new(FanOutEngine::new(
            Arc::new(InMemorySessionRegistry::new()),
            membership.clone(),
            Arc::new(identity),
            100,
        ));
        let usecase = SendMessageUseCase::new(Arc::new(messages), membership, fan_out);

        // when (操作):
        let result = usecase
            .execute(
                UserId::new(1),
                ConnectionId::generate(),
                ChannelId::new(5),
                body("lost"),
            )
            .await;

        // then (期待する結果):
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "failed to persist message");
        assert!(matches!(err, SendMessageError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_concurrent_senders_are_delivered_in_id_order() {
        // テスト項目: 同一チャンネルへの並行送信でも、購読者は ID の昇順で受け取る
        // given (前提条件):
        let store = Arc::new(InMemoryChatStore::from_seed(&ChatSeed::demo()));
        let registry = Arc::new(InMemorySessionRegistry::new());
        let (carol, mut carol_rx) = Connection::open(UserId::new(3), 512);
        registry.register(carol.clone()).await.unwrap();
        carol.activate();
        registry
            .set_channel(carol.id(), Some(ChannelId::new(5)))
            .await
            .unwrap();
        let usecase = Arc::new(create_usecase_with_store(store, registry));

        // when (操作):
        let mut handles = Vec::new();
        for sender in [1u64, 2u64] {
            let usecase = usecase.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..100 {
                    usecase
                        .execute(
                            UserId::new(sender),
                            ConnectionId::generate(),
                            ChannelId::new(5),
                            body(&format!("{sender}-{i}")),
                        )
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // then (期待する結果):
        let mut ids = Vec::new();
        while let Ok(unit) = carol_rx.try_recv() {
            ids.push(unit.message_id().unwrap());
        }
        assert_eq!(ids.len(), 200);
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
