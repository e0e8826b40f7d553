//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    infrastructure::dto::{
        http::{HistoryDto, HistoryQuery, SessionDto},
        websocket::MessageDto,
    },
    ui::state::AppState,
    usecase::HistoryError,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Recent messages of a channel, oldest first
pub async fn get_channel_history(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryDto>, StatusCode> {
    match state
        .get_channel_history_usecase
        .execute(&query.token, channel_id, query.count)
        .await
    {
        Ok(views) => {
            // Domain Model から DTO への変換
            let messages = views.iter().map(MessageDto::from).collect();
            Ok(Json(HistoryDto {
                channel_id: channel_id.unsigned_abs(),
                messages,
            }))
        }
        Err(HistoryError::Unauthenticated) => Err(StatusCode::UNAUTHORIZED),
        Err(HistoryError::Forbidden(_)) => Err(StatusCode::FORBIDDEN),
        Err(HistoryError::Validation(_)) => Err(StatusCode::BAD_REQUEST),
        Err(HistoryError::Repository(e)) => {
            tracing::error!(channel_id, error = %e, "Failed to load channel history");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Debug endpoint listing live sessions (for testing purposes)
pub async fn debug_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionDto>> {
    let sessions = state.get_sessions_usecase.execute().await;
    Json(
        sessions
            .iter()
            .map(|target| {
                SessionDto::new(
                    &target.session,
                    target.connection.state(),
                    target.connection.dropped_count(),
                )
            })
            .collect(),
    )
}
