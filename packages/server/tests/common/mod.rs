//! Shared helpers for the end-to-end tests.
//!
//! The server runs in-process on an ephemeral port; clients talk to it over
//! real WebSocket and HTTP connections.

#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use parley_server::{
    app::{Collaborators, build_server},
    config::ChatSettings,
    infrastructure::repository::{ChatSeed, InMemoryChatStore},
};
use serde_json::Value;
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Error as WsError, Message},
};

pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Helper struct to manage the in-process server lifecycle
pub struct TestServer {
    pub port: u16,
    pub store: Arc<InMemoryChatStore>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestServer {
    /// Start a server with the demo seed and default settings
    pub async fn start() -> Self {
        Self::start_with(ChatSettings::default()).await
    }

    pub async fn start_with(settings: ChatSettings) -> Self {
        let store = Arc::new(InMemoryChatStore::from_seed(&ChatSeed::demo()));
        let server = build_server(settings, Collaborators::in_memory(store.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = shutdown_rx.await;
        }));

        TestServer {
            port,
            store,
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://127.0.0.1:{}/ws?token={}", self.port, token)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    /// Current sessions as reported by the debug endpoint
    pub async fn sessions(&self) -> Vec<Value> {
        reqwest::get(self.http_url("/debug/sessions"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Poll the debug endpoint until `predicate` holds for the session list
    pub async fn wait_for_sessions<F>(&self, predicate: F)
    where
        F: Fn(&[Value]) -> bool,
    {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        loop {
            let sessions = self.sessions().await;
            if predicate(&sessions) {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "Timed out waiting for sessions, last state: {sessions:?}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Wait until `count` sessions of `user_id` are viewing `channel_id`
    pub async fn wait_for_subscribers(&self, user_id: u64, channel_id: u64, count: usize) {
        self.wait_for_sessions(|sessions| {
            sessions
                .iter()
                .filter(|s| s["user_id"] == user_id && s["channel_id"] == channel_id)
                .count()
                == count
        })
        .await;
    }

    /// Trigger graceful shutdown and wait for the server to stop
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("server did not stop in time")
                .unwrap()
                .unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

/// Helper struct wrapping one WebSocket client connection
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn connect(server: &TestServer, token: &str) -> Self {
        let (ws, _response) = connect_async(server.ws_url(token)).await.unwrap();
        TestClient { ws }
    }

    /// Connect and subscribe, waiting until the server has applied the subscription
    pub async fn connect_to_channel(
        server: &TestServer,
        token: &str,
        user_id: u64,
        channel_id: u64,
    ) -> Self {
        let before = server
            .sessions()
            .await
            .iter()
            .filter(|s| s["user_id"] == user_id && s["channel_id"] == channel_id)
            .count();
        let mut client = Self::connect(server, token).await;
        client.subscribe(channel_id).await;
        server
            .wait_for_subscribers(user_id, channel_id, before + 1)
            .await;
        client
    }

    pub async fn try_connect(server: &TestServer, token: &str) -> Result<Self, WsError> {
        let (ws, _response) = connect_async(server.ws_url(token)).await?;
        Ok(TestClient { ws })
    }

    pub async fn send_text(&mut self, text: &str) {
        self.ws.send(Message::text(text.to_string())).await.unwrap();
    }

    pub async fn send_json(&mut self, value: Value) {
        self.send_text(&value.to_string()).await;
    }

    pub async fn subscribe(&mut self, channel_id: u64) {
        self.send_json(serde_json::json!({
            "message_type": "subscribe",
            "payload": { "channel_id": channel_id },
        }))
        .await;
    }

    pub async fn post(&mut self, channel_id: u64, message: &str) {
        self.send_json(serde_json::json!({ "channel_id": channel_id, "message": message }))
            .await;
    }

    /// Next server frame, as raw WebSocket message (pings are skipped)
    pub async fn recv_message(&mut self) -> Option<Message> {
        loop {
            let next = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a frame");
            match next {
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(message)) => return Some(message),
                Some(Err(_)) | None => return None,
            }
        }
    }

    /// Next text frame parsed as JSON
    pub async fn recv_json(&mut self) -> Value {
        match self.recv_message().await {
            Some(Message::Text(text)) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    /// Assert that no text frame arrives within `duration`
    pub async fn expect_no_frame(&mut self, duration: Duration) {
        if let Ok(Some(Ok(message))) = tokio::time::timeout(duration, self.ws.next()).await {
            panic!("expected no frame, got {message:?}");
        }
    }

    /// Read every frame (pings included) that arrives within `duration`
    pub async fn read_frames_for(&mut self, duration: Duration) -> Vec<Message> {
        let deadline = tokio::time::Instant::now() + duration;
        let mut frames = Vec::new();
        while let Ok(Some(Ok(message))) = tokio::time::timeout_at(deadline, self.ws.next()).await {
            frames.push(message);
        }
        frames
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
