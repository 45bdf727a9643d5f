//! Coordinator actor: the single task that owns the room registry.
//!
//! Every room-mutating operation, from any connection or from the HTTP
//! score API, is a [`Command`] on one bounded channel. The actor applies
//! commands one at a time, so room state needs no locks, and runs the
//! expiry sweeper on a timer in the same loop. Each command is processed
//! inside a panic boundary: a fault in one event is logged and dropped
//! without stopping the actor.

use std::panic::{AssertUnwindSafe, catch_unwind};

use gyrorace_protocol::{
    ClientEvent, PROTOCOL_VERSION, PlayerId, ScoreEntry, ScoreSubmission, ServerEvent,
};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{ClientSender, Gateway, Outbox, RoomConfig, RoomError, RoomInfo, RoomRegistry};

/// Commands sent to the coordinator through its channel.
///
/// Variants carrying a `oneshot::Sender` are request/reply; the rest are
/// fire-and-forget.
pub(crate) enum Command {
    /// Register a connection's outbound channel.
    Connect {
        player: PlayerId,
        sender: ClientSender,
    },

    /// An event decoded from a connection.
    Event { player: PlayerId, event: ClientEvent },

    /// The transport closed. Implies leave.
    Disconnect { player: PlayerId },

    SubmitScore {
        submission: ScoreSubmission,
        reply: oneshot::Sender<Result<Vec<ScoreEntry>, RoomError>>,
    },

    Scores {
        room_code: String,
        reply: oneshot::Sender<Result<Vec<ScoreEntry>, RoomError>>,
    },

    Leaderboard {
        room_code: String,
        reply: oneshot::Sender<Vec<ScoreEntry>>,
    },

    RoomInfo {
        room_code: String,
        reply: oneshot::Sender<Option<RoomInfo>>,
    },

    /// Close every room and stop.
    Shutdown { reply: oneshot::Sender<()> },

    #[cfg(test)]
    Panic,
}

/// Handle to the running coordinator.
///
/// Cheap to clone; every connection handler and the HTTP layer hold one.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Registers `player`'s outbound channel. The coordinator immediately
    /// sends it `connected`.
    pub async fn connect(&self, player: PlayerId, sender: ClientSender) -> Result<(), RoomError> {
        self.send(Command::Connect { player, sender }).await
    }

    /// Submits a client event.
    ///
    /// Gyroscope samples are offered without waiting: when the queue is
    /// full they are dropped and this still returns `Ok`.
    pub async fn dispatch(&self, player: PlayerId, event: ClientEvent) -> Result<(), RoomError> {
        if matches!(event, ClientEvent::Gyroscope { .. }) {
            return match self.sender.try_send(Command::Event { player, event }) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => {
                    tracing::trace!(player_id = %player, "coordinator busy, telemetry dropped");
                    Ok(())
                }
                Err(TrySendError::Closed(_)) => Err(RoomError::Unavailable),
            };
        }
        self.send(Command::Event { player, event }).await
    }

    /// Removes `player` from its room and forgets its channel.
    pub async fn disconnect(&self, player: PlayerId) -> Result<(), RoomError> {
        self.send(Command::Disconnect { player }).await
    }

    pub async fn submit_score(
        &self,
        submission: ScoreSubmission,
    ) -> Result<Vec<ScoreEntry>, RoomError> {
        self.request(|reply| Command::SubmitScore { submission, reply })
            .await?
    }

    pub async fn scores(&self, room_code: &str) -> Result<Vec<ScoreEntry>, RoomError> {
        let room_code = room_code.to_string();
        self.request(|reply| Command::Scores { room_code, reply })
            .await?
    }

    pub async fn leaderboard(&self, room_code: &str) -> Result<Vec<ScoreEntry>, RoomError> {
        let room_code = room_code.to_string();
        self.request(|reply| Command::Leaderboard { room_code, reply })
            .await
    }

    pub async fn room_info(&self, room_code: &str) -> Result<Option<RoomInfo>, RoomError> {
        let room_code = room_code.to_string();
        self.request(|reply| Command::RoomInfo { room_code, reply })
            .await
    }

    /// Sends `roomClosed` to every member of every room and stops the
    /// coordinator. Resolves once the notifications are queued.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn send(&self, cmd: Command) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable)
    }

    async fn request<T>(
        &self,
        cmd: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(cmd(reply_tx)).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }
}

/// The actor state. Runs inside a Tokio task.
struct Coordinator {
    registry: RoomRegistry,
    gateway: Gateway,
    receiver: mpsc::Receiver<Command>,
}

impl Coordinator {
    async fn run(mut self) {
        tracing::info!("room coordinator started");

        let period = self.registry.config().sweep_interval;
        let mut sweeper = time::interval_at(Instant::now() + period, period);
        sweeper.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = sweeper.tick() => self.sweep(),
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    // Registry operations run every check before their
                    // first write, and the writes are plain map updates, so
                    // an unwind cannot leave a room half-joined.
                    match catch_unwind(AssertUnwindSafe(|| self.handle(cmd))) {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(_) => tracing::error!("command handler panicked, event dropped"),
                    }
                }
            }
        }

        tracing::info!("room coordinator stopped");
    }

    /// Applies one command. Returns `true` when the actor should stop.
    fn handle(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Connect { player, sender } => {
                self.gateway.register(player, sender);
                self.gateway.send_to(
                    player,
                    ServerEvent::Connected {
                        player_id: player,
                        protocol_version: PROTOCOL_VERSION,
                    },
                );
                tracing::debug!(player_id = %player, connections = self.gateway.len(), "connection registered");
            }
            Command::Event { player, event } => self.handle_event(player, event),
            Command::Disconnect { player } => {
                let outbox = self.registry.leave(player, None);
                self.gateway.deliver(outbox);
                self.gateway.unregister(player);
                tracing::debug!(player_id = %player, connections = self.gateway.len(), "connection removed");
            }
            Command::SubmitScore { submission, reply } => {
                let result = self.registry.submit_score(submission).map(|(leaderboard, outbox)| {
                    self.gateway.deliver(outbox);
                    leaderboard
                });
                let _ = reply.send(result);
            }
            Command::Scores { room_code, reply } => {
                let _ = reply.send(self.registry.scores(&room_code));
            }
            Command::Leaderboard { room_code, reply } => {
                let _ = reply.send(self.registry.leaderboard(&room_code));
            }
            Command::RoomInfo { room_code, reply } => {
                let _ = reply.send(self.registry.info(&room_code));
            }
            Command::Shutdown { reply } => {
                let rooms = self.registry.len();
                let outbox = self.registry.drain();
                self.gateway.deliver(outbox);
                tracing::info!(rooms, "rooms closed for shutdown");
                let _ = reply.send(());
                return true;
            }
            #[cfg(test)]
            Command::Panic => panic!("injected fault"),
        }
        false
    }

    fn handle_event(&mut self, player: PlayerId, event: ClientEvent) {
        let result = match event {
            ClientEvent::CreateRoom { username } => self
                .registry
                .create_room(player, &username)
                .map(|(_, outbox)| outbox),
            ClientEvent::JoinRoom {
                room_code,
                username,
                is_controller,
            } => self
                .registry
                .join_room(player, &room_code, &username, is_controller),
            ClientEvent::GetPlayers { room_code } => {
                self.registry.list_players(&room_code).map(|players| {
                    let mut outbox = Outbox::default();
                    outbox.to(player, ServerEvent::PlayersList { players });
                    outbox
                })
            }
            ClientEvent::StartGame { room_code } => self.registry.start_game(player, &room_code),
            ClientEvent::Gyroscope {
                room_code,
                gamma,
                beta,
                username,
            } => Ok(self
                .registry
                .relay_telemetry(player, &room_code, gamma, beta, username)),
            ClientEvent::LeaveRoom { room_code } => {
                Ok(self.registry.leave(player, room_code.as_deref()))
            }
            // Answered by the connection handler; nothing to do here.
            ClientEvent::Heartbeat { .. } => Ok(Outbox::default()),
        };

        match result {
            Ok(outbox) => self.gateway.deliver(outbox),
            Err(err) => {
                tracing::debug!(player_id = %player, error = %err, "event rejected");
                self.gateway.send_to(player, err.to_event());
            }
        }
    }

    fn sweep(&mut self) {
        let (evicted, outbox) = self.registry.sweep(Instant::now());
        self.gateway.deliver(outbox);
        if !evicted.is_empty() {
            tracing::info!(evicted = evicted.len(), rooms = self.registry.len(), "sweep finished");
        }
    }
}

/// Spawns the coordinator task and returns a handle to it.
///
/// The command queue holds `config.command_buffer` commands; senders of
/// membership events wait when it is full, telemetry is dropped.
pub fn spawn_coordinator(config: RoomConfig) -> CoordinatorHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));

    let actor = Coordinator {
        registry: RoomRegistry::new(config),
        gateway: Gateway::default(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    CoordinatorHandle { sender: tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_channel;

    fn tilt() -> ClientEvent {
        ClientEvent::Gyroscope {
            room_code: "ABCDEF".into(),
            gamma: 1.0,
            beta: 2.0,
            username: "Pad".into(),
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_telemetry() {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = CoordinatorHandle { sender: tx };

        handle.dispatch(PlayerId(1), tilt()).await.unwrap();
        handle.dispatch(PlayerId(1), tilt()).await.unwrap();

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err(), "second sample was dropped");

        drop(rx);
        assert!(matches!(
            handle.dispatch(PlayerId(1), tilt()).await,
            Err(RoomError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_actor_survives_a_panicking_command() {
        let handle = spawn_coordinator(RoomConfig::default());
        let (tx, mut rx) = client_channel(4);
        handle.connect(PlayerId(1), tx).await.unwrap();
        handle
            .dispatch(PlayerId(1), ClientEvent::CreateRoom { username: "Host".into() })
            .await
            .unwrap();
        rx.recv().await.unwrap(); // connected
        let code = match rx.recv().await.unwrap() {
            ServerEvent::RoomCreated { room_code, .. } => room_code,
            other => panic!("expected roomCreated, got {other:?}"),
        };

        handle.send(Command::Panic).await.unwrap();

        let info = handle.room_info(code.as_str()).await.unwrap().unwrap();
        assert_eq!(info.players.len(), 1);
        handle
            .dispatch(PlayerId(1), ClientEvent::GetPlayers { room_code: code.to_string() })
            .await
            .unwrap();
        assert!(matches!(
            rx.recv().await.unwrap(),
            ServerEvent::PlayersList { .. }
        ));
    }
}
