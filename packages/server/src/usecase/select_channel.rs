//! UseCase: 購読チャンネルの選択
//!
//! クライアントが表示しているチャンネルを切り替えます。購読にはチャンネルへの
//! アクセス権が必要です。

use std::sync::Arc;

use crate::domain::{ChannelId, ConnectionId, MembershipRepository, SessionRegistry, UserId};

use super::error::SelectChannelError;

/// 購読チャンネル選択のユースケース
pub struct SelectChannelUseCase {
    registry: Arc<dyn SessionRegistry>,
    membership: Arc<dyn MembershipRepository>,
}

impl SelectChannelUseCase {
    pub fn new(
        registry: Arc<dyn SessionRegistry>,
        membership: Arc<dyn MembershipRepository>,
    ) -> Self {
        Self {
            registry,
            membership,
        }
    }

    /// 購読チャンネルを `channel_id` に切り替える
    ///
    /// # Returns
    ///
    /// 切り替え前の購読チャンネル
    pub async fn subscribe(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        channel_id: ChannelId,
    ) -> Result<Option<ChannelId>, SelectChannelError> {
        let allowed = self
            .membership
            .is_user_in_channel(user_id, channel_id)
            .await
            .map_err(SelectChannelError::Membership)?;
        if !allowed {
            return Err(SelectChannelError::Unauthorized(channel_id));
        }

        let previous = self
            .registry
            .set_channel(connection_id, Some(channel_id))
            .await?;
        tracing::info!(
            connection_id = %connection_id,
            user_id = %user_id,
            from = ?previous,
            to = %channel_id,
            "Channel selected"
        );
        Ok(previous)
    }

    /// 購読を解除する
    pub async fn unsubscribe(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<ChannelId>, SelectChannelError> {
        let previous = self.registry.set_channel(connection_id, None).await?;
        tracing::info!(connection_id = %connection_id, from = ?previous, "Channel deselected");
        Ok(previous)
    }
}
