//! UseCase: チャンネル履歴の取得
//!
//! ライブ配送は at-most-once のため、取りこぼしたメッセージは永続化側の履歴から
//! 取得します。

use std::{collections::HashMap, sync::Arc};

use crate::domain::{
    ChannelId, IdentityDirectory, MembershipRepository, MessageRepository, MessageView, UserId,
};

use super::error::HistoryError;

/// チャンネル履歴取得のユースケース
pub struct GetChannelHistoryUseCase {
    messages: Arc<dyn MessageRepository>,
    membership: Arc<dyn MembershipRepository>,
    identity: Arc<dyn IdentityDirectory>,
    /// 1 回で返す最大件数
    limit: usize,
}

impl GetChannelHistoryUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        membership: Arc<dyn MembershipRepository>,
        identity: Arc<dyn IdentityDirectory>,
        limit: usize,
    ) -> Self {
        Self {
            messages,
            membership,
            identity,
            limit,
        }
    }

    /// 直近のメッセージを古い順に返す
    ///
    /// # Arguments
    ///
    /// * `token` - セッショントークン
    /// * `channel_id` - 生のチャンネル ID（正の整数でなければならない）
    /// * `count` - 要求件数（省略時・上限超過時は上限まで）
    pub async fn execute(
        &self,
        token: &str,
        channel_id: i64,
        count: Option<usize>,
    ) -> Result<Vec<MessageView>, HistoryError> {
        let user_id = self
            .identity
            .authenticate(token)
            .await
            .ok_or(HistoryError::Unauthenticated)?;
        let channel_id = ChannelId::try_from(channel_id)?;

        if !self
            .membership
            .is_user_in_channel(user_id, channel_id)
            .await?
        {
            return Err(HistoryError::Forbidden(channel_id));
        }

        let count = count.unwrap_or(self.limit).min(self.limit);
        let history = self.messages.fetch_recent(channel_id, count).await?;

        let mut names: HashMap<UserId, String> = HashMap::new();
        let mut views = Vec::with_capacity(history.len());
        for message in history {
            let author_name = match names.get(&message.author) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .identity
                        .display_name(message.author)
                        .await
                        .unwrap_or_else(|_| format!("user-{}", message.author));
                    names.insert(message.author, name.clone());
                    name
                }
            };
            views.push(MessageView {
                message,
                author_name,
            });
        }
        Ok(views)
    }
}
