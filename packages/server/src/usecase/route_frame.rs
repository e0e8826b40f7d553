//! UseCase: 受信フレームのルーティング
//!
//! 読み込みループから受け取ったテキストフレームをデコード・検証し、送信または
//! 購読チャンネル変更のユースケースに振り分けます。失敗は送信元の接続にだけ
//! エラーユニットとして返し、接続は Active のまま維持します。再試行はしません。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - MessageRouter::handle() / route() メソッド
//! - 送信先チャンネルの決定（フレーム指定 or 現在の購読）と検証の順序
//!
//! ### どのような状況を想定しているか
//! - 正常系：購読先への投稿、チャンネル指定の投稿、購読・購読解除
//! - 異常系：購読なし・チャンネル指定なし、不正な ID、空・長すぎる本文、壊れたフレーム
//! - エッジケース：ちょうど 1000 文字の本文

use std::sync::Arc;

use crate::{
    domain::{
        ChannelId, Connection, InboundFrame, MessageBody, MessageId, OutboundUnit,
        SessionRegistry,
    },
    infrastructure::dto::websocket::decode_client_frame,
};

use super::{
    error::{RouteError, SendMessageError},
    fan_out::DeliveryReport,
    select_channel::SelectChannelUseCase,
    send_message::SendMessageUseCase,
};

/// ルーティングの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    Posted {
        message_id: MessageId,
        report: DeliveryReport,
    },
    Subscribed {
        previous: Option<ChannelId>,
        current: ChannelId,
    },
    Unsubscribed {
        previous: Option<ChannelId>,
    },
}

/// メッセージルーター（状態を持たない）
pub struct MessageRouter {
    registry: Arc<dyn SessionRegistry>,
    send_message: Arc<SendMessageUseCase>,
    select_channel: Arc<SelectChannelUseCase>,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<dyn SessionRegistry>,
        send_message: Arc<SendMessageUseCase>,
        select_channel: Arc<SelectChannelUseCase>,
    ) -> Self {
        Self {
            registry,
            send_message,
            select_channel,
        }
    }

    /// テキストフレームを処理する。失敗は送信元へのエラーユニットになる。
    pub async fn handle(&self, connection: &Connection, text: &str) -> Option<Routed> {
        let result = match decode_client_frame(text) {
            Ok(frame) => self.route(connection, frame).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(routed) => Some(routed),
            Err(e) => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    error = %e,
                    "Rejected inbound frame"
                );
                // 送信元のキューが満杯・クローズ済みならエラー通知も捨てる
                let _ = connection.enqueue(OutboundUnit::error(e.to_string()));
                None
            }
        }
    }

    /// デコード済みフレームを処理する
    pub async fn route(
        &self,
        connection: &Connection,
        frame: InboundFrame,
    ) -> Result<Routed, RouteError> {
        match frame {
            InboundFrame::Post { channel_id, body } => {
                let subscription = self
                    .registry
                    .lookup(connection.id())
                    .await
                    .and_then(|session| session.channel_id);

                let channel_id = match (channel_id, subscription) {
                    (Some(raw), _) => ChannelId::try_from(raw)?,
                    (None, Some(current)) => current,
                    (None, None) => {
                        return Err(SendMessageError::Unauthorized(
                            "no channel selected".to_string(),
                        )
                        .into());
                    }
                };
                let body = MessageBody::new(body)?;

                let (persisted, report) = self
                    .send_message
                    .execute(connection.user_id(), connection.id(), channel_id, body)
                    .await?;
                Ok(Routed::Posted {
                    message_id: persisted.id,
                    report,
                })
            }
            InboundFrame::Subscribe { channel_id } => {
                let channel_id = ChannelId::try_from(channel_id)?;
                let previous = self
                    .select_channel
                    .subscribe(connection.id(), connection.user_id(), channel_id)
                    .await?;
                Ok(Routed::Subscribed {
                    previous,
                    current: channel_id,
                })
            }
            InboundFrame::Unsubscribe => {
                let previous = self.select_channel.unsubscribe(connection.id()).await?;
                Ok(Routed::Unsubscribed { previous })
            }
        }
    }
}
