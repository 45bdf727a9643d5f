//! Network edge of Gyrorace.
//!
//! Browser clients speak JSON over WebSocket. This crate hides the socket
//! behind two small traits so the server only deals in byte payloads and a
//! [`ConnectionId`]:
//!
//! - [`Transport`] accepts connections.
//! - [`Connection`] moves one payload per frame. Reading and writing use
//!   separate halves of the socket, so a task parked in
//!   [`recv`](Connection::recv) never delays a
//!   [`send`](Connection::send) from another task.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketTransport`] via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection number. The room layer keys players by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next id. Ids start at 1 and are never reused.
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ConnectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of new connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next client and completes its handshake.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// One client connection carrying one payload per frame.
///
/// All methods take `&self`; share the connection through an `Arc` to
/// read and write from different tasks.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one payload. UTF-8 payloads travel as text frames.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Next payload from the peer, or `Ok(None)` once the peer has closed.
    /// Control frames are handled internally and never returned.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Sends a liveness probe. An error means the peer is unreachable.
    async fn ping(&self) -> Result<(), Self::Error>;

    /// Starts the closing handshake.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
