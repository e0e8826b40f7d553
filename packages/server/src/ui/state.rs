//! Shared application state.

use std::sync::Arc;

use crate::{
    config::ConnectionSettings,
    domain::IdentityDirectory,
    usecase::{
        ConnectSessionUseCase, DisconnectSessionUseCase, GetChannelHistoryUseCase,
        GetSessionsUseCase, MessageRouter,
    },
};

/// Shared application state
pub struct AppState {
    /// IdentityDirectory（トークン認証）
    pub identity: Arc<dyn IdentityDirectory>,
    /// ConnectSessionUseCase（接続受け入れのユースケース）
    pub connect_session_usecase: Arc<ConnectSessionUseCase>,
    /// DisconnectSessionUseCase（切断のユースケース）
    pub disconnect_session_usecase: Arc<DisconnectSessionUseCase>,
    /// MessageRouter（受信フレームの振り分け）
    pub message_router: Arc<MessageRouter>,
    /// GetChannelHistoryUseCase（履歴取得のユースケース）
    pub get_channel_history_usecase: Arc<GetChannelHistoryUseCase>,
    /// GetSessionsUseCase（セッション一覧のユースケース）
    pub get_sessions_usecase: Arc<GetSessionsUseCase>,
    /// 接続ごとの設定
    pub settings: ConnectionSettings,
}
