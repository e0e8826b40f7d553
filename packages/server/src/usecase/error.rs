//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{ChannelId, RegistryError, RepositoryError, ValidationError};

/// 接続受け入れのエラー
#[derive(Debug, Error, PartialEq)]
pub enum ConnectError {
    #[error("failed to register connection: {0}")]
    Registry(#[from] RegistryError),
}

/// メッセージ送信のエラー
///
/// `Display` の文字列は送信元へのエラーユニットの reason としてそのまま使われる。
#[derive(Debug, Error, PartialEq)]
pub enum SendMessageError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to verify channel access")]
    Membership(#[source] RepositoryError),
    #[error("failed to persist message")]
    Persistence(#[source] RepositoryError),
}

/// 購読チャンネル選択のエラー
#[derive(Debug, Error, PartialEq)]
pub enum SelectChannelError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unauthorized: no access to channel {0}")]
    Unauthorized(ChannelId),
    #[error("failed to verify channel access")]
    Membership(#[source] RepositoryError),
    #[error("connection is no longer active")]
    Registry(#[from] RegistryError),
}

/// 履歴取得のエラー
#[derive(Debug, Error, PartialEq)]
pub enum HistoryError {
    #[error("unknown session token")]
    Unauthenticated,
    #[error("no access to channel {0}")]
    Forbidden(ChannelId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to load history: {0}")]
    Repository(#[from] RepositoryError),
}

/// フレーム処理のエラー（送信元にエラーユニットとして返される）
#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Send(#[from] SendMessageError),
    #[error(transparent)]
    Select(#[from] SelectChannelError),
}
