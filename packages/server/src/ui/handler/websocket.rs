//! WebSocket connection handlers.
//!
//! Each accepted connection runs three tasks:
//!
//! - read loop: transport → `MessageRouter`
//! - write loop: outbound queue → transport, plus periodic pings
//! - supervisor: waits for both loops, then marks the connection `Closed`
//!
//! Either loop ending tears the connection down through
//! `DisconnectSessionUseCase`, whose shutdown signal stops the other loop.

use std::{fmt::Display, sync::Arc, time::Duration};

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::{
    domain::{CloseReason, Connection, ConnectionId, OutboundUnit, UserId, wait_for_shutdown},
    infrastructure::dto::{http::ConnectQuery, websocket::encode_outbound},
    ui::state::AppState,
    usecase::ConnectError,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let Some(user_id) = state.identity.authenticate(&query.token).await else {
        tracing::warn!("Rejected WebSocket upgrade with unknown session token");
        return Err(StatusCode::UNAUTHORIZED);
    };

    Ok(ws.on_upgrade(move |socket| async move {
        if let Err(e) = accept_connection(state, socket, user_id).await {
            tracing::error!(user_id = %user_id, error = %e, "Failed to accept connection");
        }
    }))
}

/// Take ownership of an upgraded socket for an authenticated user.
///
/// Registers the connection and spawns its read, write and supervisor tasks.
pub async fn accept_connection(
    state: Arc<AppState>,
    socket: WebSocket,
    user_id: UserId,
) -> Result<ConnectionId, ConnectError> {
    let (connection, queue) = state.connect_session_usecase.execute(user_id).await?;
    let (sink, stream) = socket.split();
    spawn_connection_tasks(state, connection.clone(), sink, stream, queue);
    Ok(connection.id())
}

/// Spawn the read and write loops of one connection plus their supervisor.
///
/// The returned handle resolves once the connection is fully `Closed`.
pub fn spawn_connection_tasks<S, R>(
    state: Arc<AppState>,
    connection: Arc<Connection>,
    sink: S,
    stream: R,
    queue: mpsc::Receiver<OutboundUnit>,
) -> JoinHandle<()>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin + Send + 'static,
{
    let reader = tokio::spawn(read_loop(state.clone(), connection.clone(), stream));
    let writer = tokio::spawn(write_loop(state.clone(), connection.clone(), sink, queue));

    tokio::spawn(async move {
        let (read_result, write_result) = tokio::join!(reader, writer);
        if read_result.is_err() || write_result.is_err() {
            tracing::error!(connection_id = %connection.id(), "Connection task panicked");
        }
        // No-op unless a loop exited without tearing down
        state
            .disconnect_session_usecase
            .execute(&connection, CloseReason::ReadError)
            .await;
        connection.mark_closed();
        tracing::debug!(
            connection_id = %connection.id(),
            reason = connection.close_reason().map(|r| r.as_str()),
            "Connection finalized"
        );
    })
}

async fn read_loop<R>(state: Arc<AppState>, connection: Arc<Connection>, mut stream: R)
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin + Send,
{
    let mut shutdown = connection.shutdown_signal();
    let idle_timeout = state.settings.idle_timeout;

    let reason = loop {
        let next = tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break None,
            next = tokio::time::timeout(idle_timeout, stream.next()) => next,
        };

        let message = match next {
            Err(_) => break Some(CloseReason::IdleTimeout),
            Ok(None) => break Some(CloseReason::ClientClosed),
            Ok(Some(Err(e))) => {
                tracing::debug!(connection_id = %connection.id(), error = %e, "WebSocket read error");
                break Some(CloseReason::ReadError);
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => {
                state
                    .message_router
                    .handle(&connection, text.as_str())
                    .await;
            }
            Message::Binary(_) => {
                let _ = connection.enqueue(OutboundUnit::error("binary frames are not supported"));
            }
            // Client pings are answered by the transport. Pongs to our
            // heartbeat keep a read-only client from idling out.
            Message::Ping(_) | Message::Pong(_) => {
                tracing::trace!(connection_id = %connection.id(), "Received ping/pong");
            }
            Message::Close(_) => break Some(CloseReason::ClientClosed),
        }
    };

    if let Some(reason) = reason {
        state
            .disconnect_session_usecase
            .execute(&connection, reason)
            .await;
    }
}

async fn write_loop<S>(
    state: Arc<AppState>,
    connection: Arc<Connection>,
    mut sink: S,
    mut queue: mpsc::Receiver<OutboundUnit>,
) where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    let mut shutdown = connection.shutdown_signal();
    // `interval` panics on a zero period
    let ping_interval = state.settings.ping_interval.max(Duration::from_millis(1));
    let mut heartbeat = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let failed = loop {
        let frame = tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => break false,
            unit = queue.recv() => {
                let Some(unit) = unit else {
                    break false;
                };
                match encode_outbound(&unit) {
                    Ok(text) => Message::Text(text.into()),
                    Err(e) => {
                        tracing::error!(connection_id = %connection.id(), error = %e, "Failed to encode outbound unit");
                        continue;
                    }
                }
            }
            _ = heartbeat.tick() => Message::Ping(Default::default()),
        };

        let sent = tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break false,
            sent = sink.send(frame) => sent,
        };
        if let Err(e) = sent {
            tracing::debug!(connection_id = %connection.id(), error = %e, "WebSocket write error");
            break true;
        }
    };

    let grace = state.settings.close_grace;
    if failed {
        state
            .disconnect_session_usecase
            .execute(&connection, CloseReason::WriteError)
            .await;
    } else {
        let reason = connection
            .close_reason()
            .unwrap_or(CloseReason::ServerShutdown);
        let frame = CloseFrame {
            code: reason.close_code(),
            reason: reason.as_str().into(),
        };
        let _ = tokio::time::timeout(grace, sink.send(Message::Close(Some(frame)))).await;
    }
    let _ = tokio::time::timeout(grace, sink.close()).await;
}
