//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::domain::CloseReason;

use super::{
    handler::{debug_sessions, get_channel_history, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket chat server
///
/// # Example
///
/// ```ignore
/// let server = parley_server::app::build_server(settings, collaborators);
/// server.run("127.0.0.1", 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Build the axum router with every endpoint
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route(
                "/api/channels/{channel_id}/messages",
                get(get_channel_history),
            )
            .route("/debug/sessions", get(debug_sessions))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until Ctrl+C / SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: &str, port: u16) -> std::io::Result<()> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Parley server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?token=<session token>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// When `shutdown` fires every live session is closed with
    /// [`CloseReason::ServerShutdown`] before the listener stops.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let state = self.state.clone();
        let graceful = async move {
            shutdown.await;
            let closed = state
                .disconnect_session_usecase
                .close_all(CloseReason::ServerShutdown)
                .await;
            tracing::info!(closed, "Closed all sessions");
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(graceful)
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}
