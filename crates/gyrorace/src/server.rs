//! `GyroraceServer` builder and server loop.
//!
//! This is the entry point for running a Gyrorace coordinator. It ties
//! the layers together: transport → protocol → room coordinator, plus the
//! HTTP score API on its own listener.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gyrorace_protocol::JsonCodec;
use gyrorace_room::{CoordinatorHandle, DEFAULT_TELEMETRY_BUFFER, RoomConfig, spawn_coordinator};
use gyrorace_transport::{Transport, WebSocketTransport};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::GyroraceError;
use crate::handler::handle_connection;
use crate::http;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) coordinator: CoordinatorHandle,
    pub(crate) codec: JsonCodec,
    /// Connections silent for this long are closed. Off when `None`.
    pub(crate) idle_timeout: Option<Duration>,
    /// How often each client is pinged to detect dead sockets.
    pub(crate) ping_interval: Duration,
    /// Telemetry samples queued per connection before new ones are dropped.
    pub(crate) telemetry_buffer: usize,
}

/// Builder for configuring and starting a Gyrorace server.
///
/// # Example
///
/// ```rust,no_run
/// use gyrorace::GyroraceServer;
///
/// # async fn run() -> Result<(), gyrorace::GyroraceError> {
/// let server = GyroraceServer::builder()
///     .bind("0.0.0.0:8080")
///     .http_bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct GyroraceServerBuilder {
    bind_addr: String,
    http_addr: String,
    room_config: RoomConfig,
    idle_timeout: Option<Duration>,
    ping_interval: Duration,
    telemetry_buffer: usize,
}

impl GyroraceServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            http_addr: "127.0.0.1:3000".to_string(),
            room_config: RoomConfig::default(),
            idle_timeout: None,
            ping_interval: Duration::from_secs(30),
            telemetry_buffer: DEFAULT_TELEMETRY_BUFFER,
        }
    }

    /// Sets the WebSocket listen address.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the HTTP score API listen address.
    pub fn http_bind(mut self, addr: &str) -> Self {
        self.http_addr = addr.to_string();
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Closes connections that send nothing for `timeout`.
    ///
    /// Off by default: screens and spectators only listen once they are in
    /// a room, and closing them counts as leaving it.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Sets how often clients are pinged. A failed ping closes the
    /// connection.
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Sets how many telemetry samples may wait for a slow client.
    pub fn telemetry_buffer(mut self, capacity: usize) -> Self {
        self.telemetry_buffer = capacity;
        self
    }

    /// Binds both listeners and starts the room coordinator.
    pub async fn build(self) -> Result<GyroraceServer, GyroraceError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let http_listener = TcpListener::bind(&self.http_addr).await?;
        let coordinator = spawn_coordinator(self.room_config);

        let state = Arc::new(ServerState {
            coordinator,
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
            ping_interval: self.ping_interval,
            telemetry_buffer: self.telemetry_buffer,
        });

        Ok(GyroraceServer {
            transport,
            http_listener,
            state,
        })
    }
}

impl Default for GyroraceServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Gyrorace server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct GyroraceServer {
    transport: WebSocketTransport,
    http_listener: TcpListener,
    state: Arc<ServerState>,
}

impl GyroraceServer {
    /// Creates a new builder.
    pub fn builder() -> GyroraceServerBuilder {
        GyroraceServerBuilder::new()
    }

    /// Returns the WebSocket listener address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the HTTP listener address.
    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http_listener.local_addr()
    }

    /// Returns a handle to the room coordinator.
    pub fn coordinator(&self) -> CoordinatorHandle {
        self.state.coordinator.clone()
    }

    /// Runs until the process is terminated.
    pub async fn run(self) -> Result<(), GyroraceError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop and the HTTP API until `shutdown` resolves,
    /// then closes every room and stops the coordinator.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<(), GyroraceError> {
        tracing::info!(
            ws_addr = ?self.transport.local_addr().ok(),
            http_addr = ?self.http_listener.local_addr().ok(),
            "Gyrorace server running"
        );

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let router = http::router(self.state.coordinator.clone());
        let http_task = tokio::spawn(
            axum::serve(self.http_listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.changed().await;
                })
                .into_future(),
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("shutting down");
        let _ = stop_tx.send(true);
        if let Err(e) = self.state.coordinator.shutdown().await {
            tracing::warn!(error = %e, "coordinator already stopped");
        }
        match http_task.await {
            Ok(result) => result?,
            Err(e) => tracing::error!(error = %e, "HTTP task failed"),
        }
        tracing::info!("server stopped");
        Ok(())
    }
}
