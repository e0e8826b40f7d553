//! UseCase: メッセージのファンアウト
//!
//! 永続化済みのメッセージを、購読者には全文・同じサーバーのメンバーの他の接続には
//! 通知として、各接続の送信キューに積みます。キューへの投入は決して待たないため、
//! 遅い接続が他の接続への配送を止めることはありません。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - FanOutEngine::deliver() メソッド
//! - 配送先の選定（全文 / 通知 / 抑止）と、キュー溢れ時の破棄
//!
//! ### どのような状況を想定しているか
//! - 正常系：購読者に全文、別チャンネルを見ているメンバーに通知
//! - 異常系：メンバー解決の失敗（全文だけは届く）
//! - 異常系：表示名解決の失敗（フォールバック名で届く）
//! - エッジケース：送信キューが満杯の接続

use std::{collections::HashSet, sync::Arc};

use crate::domain::{
    ConnectionId, Delivery, IdentityDirectory, MembershipRepository, MessageView, NotificationView,
    OutboundUnit, PersistedMessage, PushError, SessionRegistry, should_notify,
};

/// 1 回のファンアウトの結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// 全文を積んだ接続数
    pub full_messages: usize,
    /// 通知を積んだ接続数
    pub notifications: usize,
    /// ポリシーで抑止した接続数
    pub suppressed: usize,
    /// キュー満杯で破棄した件数
    pub dropped: usize,
}

/// ファンアウトエンジン
pub struct FanOutEngine {
    registry: Arc<dyn SessionRegistry>,
    membership: Arc<dyn MembershipRepository>,
    identity: Arc<dyn IdentityDirectory>,
    /// 通知プレビューの最大文字数
    preview_chars: usize,
}

impl FanOutEngine {
    pub fn new(
        registry: Arc<dyn SessionRegistry>,
        membership: Arc<dyn MembershipRepository>,
        identity: Arc<dyn IdentityDirectory>,
        preview_chars: usize,
    ) -> Self {
        Self {
            registry,
            membership,
            identity,
            preview_chars,
        }
    }

    /// 永続化済みメッセージを配送する
    ///
    /// `origin` は投稿元の接続。その接続だけが自分の投稿の通知を受け取らない
    /// （同じユーザーの別の接続には通常どおり通知する）。
    pub async fn deliver(
        &self,
        message: PersistedMessage,
        origin: Option<ConnectionId>,
    ) -> DeliveryReport {
        let author_name = match self.identity.display_name(message.author).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(
                    user_id = %message.author,
                    error = %e,
                    "Failed to resolve display name, using fallback"
                );
                format!("user-{}", message.author)
            }
        };

        // メンバー解決は best effort: 失敗しても購読者への全文配送は続ける
        let members = match self
            .membership
            .list_user_ids_for_server(message.server_id)
            .await
        {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!(
                    server_id = %message.server_id,
                    message_id = %message.id,
                    error = %e,
                    "Failed to resolve server members, skipping notifications"
                );
                HashSet::new()
            }
        };

        let targets = self.registry.snapshot(message.channel_id, &members).await;

        let view = Arc::new(MessageView {
            message,
            author_name,
        });
        let mut notification: Option<Arc<NotificationView>> = None;
        let mut report = DeliveryReport::default();

        for target in &targets {
            let is_member = members.contains(&target.session.user_id);
            let unit = match should_notify(&target.session, &view.message, is_member, origin) {
                Delivery::FullMessage => {
                    report.full_messages += 1;
                    OutboundUnit::FullMessage(view.clone())
                }
                Delivery::Notification => {
                    report.notifications += 1;
                    let shared = notification.get_or_insert_with(|| {
                        Arc::new(NotificationView::from_message(&view, self.preview_chars))
                    });
                    OutboundUnit::Notification(shared.clone())
                }
                Delivery::Suppress => {
                    report.suppressed += 1;
                    continue;
                }
            };

            match target.connection.enqueue(unit) {
                Ok(()) => {}
                Err(PushError::QueueFull) => {
                    report.dropped += 1;
                    tracing::warn!(
                        connection_id = %target.session.connection_id,
                        message_id = %view.message.id,
                        dropped_total = target.connection.dropped_count(),
                        "Outbound queue full, dropping unit"
                    );
                }
                // 配送中に閉じた接続は無視する
                Err(PushError::Closed) => {}
            }
        }

        tracing::debug!(
            message_id = %view.message.id,
            channel_id = %view.message.channel_id,
            full = report.full_messages,
            notified = report.notifications,
            suppressed = report.suppressed,
            dropped = report.dropped,
            "Fan-out complete"
        );
        report
    }
}
