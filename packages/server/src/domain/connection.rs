//! One live client connection: lifecycle state, bounded outbound queue and
//! shutdown signal.
//!
//! The transport halves are not stored here. They are owned by the read and
//! write loops; this type is what the rest of the system holds to reach them.

use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicU8, AtomicU64, Ordering},
};

use serde::Serialize;
use tokio::sync::{mpsc, watch};

use super::error::PushError;
use super::frame::OutboundUnit;
use super::value_object::{ConnectionId, UserId};

/// Lifecycle of a connection. Transitions only move forward and never skip
/// `Closing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting = 0,
    Active = 1,
    Closing = 2,
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Active,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Why a connection was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    ClientClosed,
    ReadError,
    WriteError,
    IdleTimeout,
    ServerShutdown,
}

impl CloseReason {
    /// WebSocket close code sent to the peer when the transport is closed.
    pub fn close_code(&self) -> u16 {
        match self {
            Self::ClientClosed => 1000,
            Self::IdleTimeout | Self::ServerShutdown => 1001,
            Self::ReadError | Self::WriteError => 1011,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientClosed => "client closed",
            Self::ReadError => "read error",
            Self::WriteError => "write error",
            Self::IdleTimeout => "idle timeout",
            Self::ServerShutdown => "server shutdown",
        }
    }
}

pub struct Connection {
    id: ConnectionId,
    user_id: UserId,
    state: AtomicU8,
    queue: mpsc::Sender<OutboundUnit>,
    capacity: usize,
    dropped: AtomicU64,
    close_reason: OnceLock<CloseReason>,
    shutdown: watch::Sender<bool>,
}

impl Connection {
    /// Create a connection in the `Connecting` state.
    ///
    /// Returns the shared handle and the receiving end of its outbound queue,
    /// which the write loop drains. A capacity of zero is raised to one.
    pub fn open(user_id: UserId, capacity: usize) -> (Arc<Self>, mpsc::Receiver<OutboundUnit>) {
        let capacity = capacity.max(1);
        let (queue, receiver) = mpsc::channel(capacity);
        let (shutdown, _) = watch::channel(false);
        let connection = Arc::new(Self {
            id: ConnectionId::generate(),
            user_id,
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            queue,
            capacity,
            dropped: AtomicU64::new(0),
            close_reason: OnceLock::new(),
            shutdown,
        });
        (connection, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Active
    }

    /// Number of outbound units dropped because the queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason.get().copied()
    }

    /// `Connecting -> Active`. Returns `false` if the connection already left
    /// `Connecting`.
    pub fn activate(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Connecting as u8,
                ConnectionState::Active as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Queue a unit for the write loop without ever waiting.
    ///
    /// A full queue drops the unit and counts it. Sending to a connection
    /// that is closing or closed is a no-op reported as [`PushError::Closed`].
    pub fn enqueue(&self, unit: OutboundUnit) -> Result<(), PushError> {
        if !self.is_active() {
            return Err(PushError::Closed);
        }
        match self.queue.try_send(unit) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(PushError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PushError::Closed),
        }
    }

    /// Move to `Closing` and signal both loops to stop.
    ///
    /// Only the first caller wins and gets `true`; every later or concurrent
    /// call is a no-op returning `false`.
    pub fn begin_close(&self, reason: CloseReason) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current >= ConnectionState::Closing as u8 {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                ConnectionState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        let _ = self.close_reason.set(reason);
        self.shutdown.send_replace(true);
        true
    }

    /// `Closing -> Closed`, once both loops have exited and the registry
    /// entry is gone. Has no effect unless the connection is `Closing`.
    pub fn mark_closed(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Closing as u8,
                ConnectionState::Closed as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Receiver that flips to `true` once teardown has started.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("state", &self.state())
            .field("dropped", &self.dropped_count())
            .finish()
    }
}

/// Resolve once the connection's shutdown signal has fired.
///
/// A dropped signal sender also counts as shutdown.
pub async fn wait_for_shutdown(signal: &mut watch::Receiver<bool>) {
    let _ = signal.wait_for(|closing| *closing).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn active_connection(capacity: usize) -> (Arc<Connection>, mpsc::Receiver<OutboundUnit>) {
        let (connection, receiver) = Connection::open(UserId::new(1), capacity);
        assert!(connection.activate());
        (connection, receiver)
    }

    #[test]
    fn test_open_starts_in_connecting_state() {
        // テスト項目: 生成直後の接続は Connecting 状態で、enqueue は no-op
        // given (前提条件):
        let (connection, _receiver) = Connection::open(UserId::new(1), 4);

        // when (操作):
        let result = connection.enqueue(OutboundUnit::error("too early"));

        // then (期待する結果):
        assert_eq!(connection.state(), ConnectionState::Connecting);
        assert_eq!(result, Err(PushError::Closed));
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        // テスト項目: 容量 0 を指定しても 1 件は積める
        // given (前提条件):
        let (connection, _receiver) = active_connection(0);

        // when (操作):
        let first = connection.enqueue(OutboundUnit::error("a"));
        let second = connection.enqueue(OutboundUnit::error("b"));

        // then (期待する結果):
        assert_eq!(connection.capacity(), 1);
        assert!(first.is_ok());
        assert_eq!(second, Err(PushError::QueueFull));
    }

    #[tokio::test]
    async fn test_full_queue_drops_new_units_and_counts_them() {
        // テスト項目: 容量 N のキューに N+5 件積むと 5 件が破棄され、N 件だけが書き出される
        // given (前提条件): write loop が停止している（receiver を読まない）
        let capacity = 8;
        let (connection, mut receiver) = active_connection(capacity);

        // when (操作):
        let results: Vec<_> = (0..capacity + 5)
            .map(|i| connection.enqueue(OutboundUnit::error(format!("unit {i}"))))
            .collect();

        // then (期待する結果):
        let accepted = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| **r == Err(PushError::QueueFull))
            .count();
        assert_eq!(accepted, capacity);
        assert_eq!(rejected, 5);
        assert_eq!(connection.dropped_count(), 5);

        // write loop 再開: FIFO で先頭 N 件のみが取り出せる
        let mut written = Vec::new();
        while let Ok(unit) = receiver.try_recv() {
            written.push(unit);
        }
        assert_eq!(written.len(), capacity);
        assert_eq!(written[0], OutboundUnit::error("unit 0"));
        assert_eq!(written[capacity - 1], OutboundUnit::error("unit 7"));
    }

    #[test]
    fn test_begin_close_is_idempotent() {
        // テスト項目: begin_close は最初の呼び出しだけが成功し、以降は no-op
        // given (前提条件):
        let (connection, _receiver) = active_connection(4);

        // when (操作):
        let first = connection.begin_close(CloseReason::ReadError);
        let second = connection.begin_close(CloseReason::WriteError);

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(connection.state(), ConnectionState::Closing);
        assert_eq!(connection.close_reason(), Some(CloseReason::ReadError));
    }

    #[test]
    fn test_close_on_closed_connection_is_noop() {
        // テスト項目: Closed の接続に対する close / enqueue はエラーにならず何もしない
        // given (前提条件):
        let (connection, _receiver) = active_connection(4);
        assert!(connection.begin_close(CloseReason::ClientClosed));
        assert!(connection.mark_closed());

        // when (操作):
        let closed_again = connection.begin_close(CloseReason::IdleTimeout);
        let marked_again = connection.mark_closed();
        let pushed = connection.enqueue(OutboundUnit::error("late"));

        // then (期待する結果):
        assert!(!closed_again);
        assert!(!marked_again);
        assert_eq!(pushed, Err(PushError::Closed));
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert_eq!(connection.close_reason(), Some(CloseReason::ClientClosed));
    }

    #[test]
    fn test_mark_closed_requires_closing() {
        // テスト項目: Closing を経由せずに Closed へは遷移しない
        // given (前提条件):
        let (connection, _receiver) = active_connection(4);

        // when (操作):
        let result = connection.mark_closed();

        // then (期待する結果):
        assert!(!result);
        assert_eq!(connection.state(), ConnectionState::Active);
    }

    #[tokio::test]
    async fn test_concurrent_close_has_single_winner() {
        // テスト項目: 複数タスクから同時に close しても勝者は 1 つだけ
        // given (前提条件):
        let (connection, _receiver) = active_connection(4);

        // when (操作):
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let connection = connection.clone();
                tokio::spawn(async move { connection.begin_close(CloseReason::ReadError) })
            })
            .collect();
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        // then (期待する結果):
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_shutdown_signal_wakes_waiters() {
        // テスト項目: begin_close で待機中のループが起こされる
        // given (前提条件):
        let (connection, _receiver) = active_connection(4);
        let mut signal = connection.shutdown_signal();
        let waiter = tokio::spawn(async move { wait_for_shutdown(&mut signal).await });

        // when (操作):
        connection.begin_close(CloseReason::ServerShutdown);

        // then (期待する結果):
        let woke = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(woke.is_ok());
    }

    #[tokio::test]
    async fn test_enqueue_after_receiver_dropped_is_noop() {
        // テスト項目: write loop 終了後（receiver 破棄後）の enqueue は安全に無視される
        // given (前提条件):
        let (connection, receiver) = active_connection(4);
        drop(receiver);

        // when (操作):
        let result = connection.enqueue(OutboundUnit::error("nobody listens"));

        // then (期待する結果):
        assert_eq!(result, Err(PushError::Closed));
        assert_eq!(connection.dropped_count(), 0);
    }
}
