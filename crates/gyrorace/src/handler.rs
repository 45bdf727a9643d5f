//! Per-connection handler: registration, event routing, and delivery.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register an outbound channel with the coordinator → `connected`
//!   2. Spawn a writer that drains the channel into the socket and pings
//!   3. Loop: receive frames → decode → dispatch to the coordinator
//!   4. On close, a dead socket, or error → disconnect (implicit leave)

use std::sync::Arc;
use std::time::{Duration, Instant};

use gyrorace_protocol::{ClientEvent, Codec, PlayerId, ServerEvent};
use gyrorace_room::{ClientReceiver, CoordinatorHandle, client_channel};
use gyrorace_transport::{Connection, TransportError, WebSocketConnection};
use tokio::time::{self, MissedTickBehavior, error::Elapsed};

use crate::GyroraceError;
use crate::server::ServerState;

/// Drop guard that tells the coordinator a connection is gone.
///
/// This ensures the implicit leave happens even if the handler panics.
/// Since `Drop` is synchronous, we spawn a fire-and-forget task.
struct ConnectionGuard {
    player_id: PlayerId,
    coordinator: CoordinatorHandle,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            let _ = coordinator.disconnect(player_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), GyroraceError> {
    let player_id = PlayerId::from(conn.id());
    let conn = Arc::new(conn);
    tracing::debug!(%player_id, "handling new connection");

    let (tx, rx) = client_channel(state.telemetry_buffer);
    state.coordinator.connect(player_id, tx).await?;
    let _guard = ConnectionGuard {
        player_id,
        coordinator: state.coordinator.clone(),
    };

    let mut writer = tokio::spawn(write_events(Arc::clone(&conn), Arc::clone(&state), rx));
    let start = Instant::now();

    loop {
        tokio::select! {
            // The coordinator dropped our channel (shutdown), or a write
            // or ping failed.
            _ = &mut writer => break,
            received = read_frame(&conn, state.idle_timeout) => {
                let data = match received {
                    Ok(Ok(Some(data))) => data,
                    Ok(Ok(None)) => {
                        tracing::info!(%player_id, "connection closed cleanly");
                        break;
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(%player_id, error = %e, "recv error");
                        break;
                    }
                    Err(_) => {
                        tracing::info!(%player_id, "connection idle, closing");
                        let _ = conn.close().await;
                        break;
                    }
                };
                handle_frame(&conn, &state, player_id, &data, &start).await?;
            }
        }
    }

    // _guard drops here → coordinator disconnect fires.
    Ok(())
}

/// Next frame, bounded by the idle timeout when one is configured.
async fn read_frame(
    conn: &WebSocketConnection,
    idle_timeout: Option<Duration>,
) -> Result<Result<Option<Vec<u8>>, TransportError>, Elapsed> {
    match idle_timeout {
        Some(idle) => time::timeout(idle, conn.recv()).await,
        None => Ok(conn.recv().await),
    }
}

/// Decodes one frame and routes it.
///
/// Heartbeats are answered here; everything else goes to the coordinator.
async fn handle_frame(
    conn: &WebSocketConnection,
    state: &ServerState,
    player_id: PlayerId,
    data: &[u8],
    start: &Instant,
) -> Result<(), GyroraceError> {
    let event: ClientEvent = match state.codec.decode(data) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%player_id, error = %e, "failed to decode event");
            let error = ServerEvent::Error {
                code: 400,
                message: format!("invalid event: {e}"),
            };
            return send_event(conn, state, &error).await;
        }
    };

    match event {
        ClientEvent::Heartbeat { client_time } => {
            let ack = ServerEvent::HeartbeatAck {
                client_time,
                server_time: start.elapsed().as_millis() as u64,
            };
            send_event(conn, state, &ack).await
        }
        event => {
            state.coordinator.dispatch(player_id, event).await?;
            Ok(())
        }
    }
}

/// Drains the coordinator's events for one connection into the socket and
/// pings the client between them.
///
/// Returns when the channel closes (after closing the socket) or when a
/// write or ping fails.
async fn write_events(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState>,
    mut rx: ClientReceiver,
) {
    let period = state.ping_interval;
    let mut pings = time::interval_at(time::Instant::now() + period, period);
    pings.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let result = tokio::select! {
            event = rx.recv() => match event {
                Some(event) => send_event(&conn, &state, &event).await,
                None => break,
            },
            _ = pings.tick() => conn.ping().await.map_err(GyroraceError::from),
        };
        if let Err(e) = result {
            tracing::debug!(conn_id = %conn.id(), error = %e, "write failed");
            return;
        }
    }
    let _ = conn.close().await;
}

async fn send_event(
    conn: &WebSocketConnection,
    state: &ServerState,
    event: &ServerEvent,
) -> Result<(), GyroraceError> {
    let bytes = state.codec.encode(event)?;
    conn.send(&bytes).await?;
    Ok(())
}
