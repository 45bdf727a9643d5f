//! Broadcast gateway: delivers outboxes to connection channels.
//!
//! Each connection has two lanes. Membership, game, score, and error
//! events go on an unbounded lane and are never dropped. Telemetry goes on
//! a bounded lane: when a slow reader lets it fill up, new samples are
//! discarded instead of queued.

use std::collections::HashMap;

use gyrorace_protocol::{PlayerId, ServerEvent};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::Outbox;

/// Telemetry samples buffered per connection by default.
pub const DEFAULT_TELEMETRY_BUFFER: usize = 64;

/// Creates the two-lane channel for one connection.
///
/// At most `telemetry_capacity` (minimum 1) telemetry events wait for the
/// writer at any time.
pub fn client_channel(telemetry_capacity: usize) -> (ClientSender, ClientReceiver) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (telemetry_tx, telemetry_rx) = mpsc::channel(telemetry_capacity.max(1));
    (
        ClientSender {
            events: events_tx,
            telemetry: telemetry_tx,
        },
        ClientReceiver {
            events: events_rx,
            telemetry: telemetry_rx,
        },
    )
}

/// Sending half held by the gateway.
#[derive(Debug, Clone)]
pub struct ClientSender {
    events: mpsc::UnboundedSender<ServerEvent>,
    telemetry: mpsc::Sender<ServerEvent>,
}

impl ClientSender {
    /// Queues `event` without waiting. Returns `false` when the event was
    /// not queued: the receiver is gone, or the telemetry lane is full.
    pub fn send(&self, event: ServerEvent) -> bool {
        if !event.is_telemetry() {
            return self.events.send(event).is_ok();
        }
        match self.telemetry.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!("telemetry lane full, sample dropped");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Receiving half drained by the connection's writer.
#[derive(Debug)]
pub struct ClientReceiver {
    events: mpsc::UnboundedReceiver<ServerEvent>,
    telemetry: mpsc::Receiver<ServerEvent>,
}

impl ClientReceiver {
    /// Waits for the next event, preferring the reliable lane.
    ///
    /// Returns `None` once both lanes are closed and empty.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        tokio::select! {
            biased;

            Some(event) = self.events.recv() => Some(event),
            Some(event) = self.telemetry.recv() => Some(event),
            else => None,
        }
    }

    /// Returns an already queued event, if any.
    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        self.events
            .try_recv()
            .or_else(|_| self.telemetry.try_recv())
            .ok()
    }
}

/// Maps connected players to their outbound channels.
#[derive(Debug, Default)]
pub struct Gateway {
    senders: HashMap<PlayerId, ClientSender>,
}

impl Gateway {
    pub fn register(&mut self, player: PlayerId, sender: ClientSender) {
        self.senders.insert(player, sender);
    }

    pub fn unregister(&mut self, player: PlayerId) -> bool {
        self.senders.remove(&player).is_some()
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Sends one event. Drops it if the receiver is gone or, for
    /// telemetry, if the receiver is behind.
    pub fn send_to(&self, player: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&player) {
            sender.send(event);
        }
    }

    /// Delivers every queued event in order.
    pub fn deliver(&self, outbox: Outbox) {
        for (player, event) in outbox {
            self.send_to(player, event);
        }
    }
}
