//! Room and player state.
//!
//! A [`Room`] enforces its own membership invariants: usernames are unique
//! case-insensitively, and while the room has members exactly one of them
//! is host and that member's id is the room's host id. The registry only
//! ever mutates rooms through these methods.

use gyrorace_protocol::{PlayerId, PlayerView, RoomCode};
use tokio::time::Instant;

use crate::{ExpiryPolicy, Leaderboard, RoomConfig};

/// One member of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    /// Trimmed display name.
    pub username: String,
    pub is_host: bool,
    /// Fixed at join time: controllers send telemetry, screens render it.
    pub is_controller: bool,
}

impl Player {
    /// Returns the public fields listed in `players[]`.
    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            username: self.username.clone(),
            is_host: self.is_host,
            is_controller: self.is_controller,
        }
    }
}

/// What [`Room::remove_player`] removed.
#[derive(Debug)]
pub(crate) struct Departure {
    pub(crate) player: Player,
    /// Set when the departing player was host and someone remains.
    pub(crate) new_host: Option<PlayerId>,
}

/// An ephemeral multiplayer session keyed by a short code.
#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    host_id: Option<PlayerId>,
    /// Join order.
    players: Vec<Player>,
    created_at: Instant,
    last_activity: Instant,
    game_started: bool,
    leaderboard: Leaderboard,
}

impl Room {
    /// Creates a room whose only member is `host`, a screen.
    pub(crate) fn new(
        code: RoomCode,
        host: PlayerId,
        username: String,
        leaderboard_capacity: usize,
    ) -> Self {
        let now = Instant::now();
        Self {
            code,
            host_id: Some(host),
            players: vec![Player {
                id: host,
                username,
                is_host: true,
                is_controller: false,
            }],
            created_at: now,
            last_activity: now,
            game_started: false,
            leaderboard: Leaderboard::new(leaderboard_capacity),
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// The current host, `None` only while the room is empty.
    pub fn host_id(&self) -> Option<PlayerId> {
        self.host_id
    }

    /// Members in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn views(&self) -> Vec<PlayerView> {
        self.players.iter().map(Player::view).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn game_started(&self) -> bool {
        self.game_started
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    pub(crate) fn leaderboard_mut(&mut self) -> &mut Leaderboard {
        &mut self.leaderboard
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn is_host(&self, id: PlayerId) -> bool {
        self.host_id == Some(id)
    }

    /// Case-insensitive check against every member's username.
    pub fn username_taken(&self, username: &str) -> bool {
        let wanted = username.to_lowercase();
        self.players
            .iter()
            .any(|p| p.username.to_lowercase() == wanted)
    }

    pub fn controller_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_controller).count()
    }

    /// Appends a member. Whoever joins an empty room becomes host.
    ///
    /// Callers check [`username_taken`](Self::username_taken) first.
    pub(crate) fn push_player(
        &mut self,
        id: PlayerId,
        username: String,
        is_controller: bool,
    ) -> &Player {
        let is_host = self.players.is_empty();
        if is_host {
            self.host_id = Some(id);
        }
        self.players.push(Player {
            id,
            username,
            is_host,
            is_controller,
        });
        self.touch();
        &self.players[self.players.len() - 1]
    }

    /// Removes a member, promoting the earliest remaining joiner when the
    /// host leaves.
    pub(crate) fn remove_player(&mut self, id: PlayerId) -> Option<Departure> {
        let index = self.players.iter().position(|p| p.id == id)?;
        let player = self.players.remove(index);
        self.touch();

        let mut new_host = None;
        if self.host_id == Some(id) {
            self.host_id = None;
            if let Some(first) = self.players.first_mut() {
                first.is_host = true;
                self.host_id = Some(first.id);
                new_host = Some(first.id);
            }
        }

        Some(Departure { player, new_host })
    }

    /// Flips `game_started`. There is no way back.
    pub(crate) fn mark_started(&mut self) {
        self.game_started = true;
        self.touch();
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Whether the sweeper should evict this room at `now`.
    pub fn is_expired(&self, now: Instant, config: &RoomConfig) -> bool {
        if self.players.is_empty() {
            return true;
        }
        let since = match config.expiry {
            ExpiryPolicy::Inactivity => self.last_activity,
            ExpiryPolicy::SinceCreation => self.created_at,
        };
        now.saturating_duration_since(since) > config.room_ttl
    }
}
