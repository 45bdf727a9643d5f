//! The room registry and the outbox its operations fill.
//!
//! [`RoomRegistry`] is the only owner of [`Room`] values. Every operation
//! is a synchronous state transition that returns the notifications it
//! produced as an [`Outbox`]; delivering them is the caller's job, so no
//! room state is ever borrowed across a network send.

use std::collections::HashMap;

use gyrorace_protocol::{CloseReason, PlayerId, PlayerView, RoomCode, ServerEvent};
use tokio::time::Instant;

use crate::{Room, RoomConfig};

/// Who in a room should receive an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every current member.
    All,
    /// One member.
    Player(PlayerId),
    /// Every member except one, usually the sender.
    AllExcept(PlayerId),
}

/// Notifications produced by a registry operation, in send order.
#[derive(Debug, Default)]
pub struct Outbox {
    deliveries: Vec<(PlayerId, ServerEvent)>,
}

impl Outbox {
    /// Queues `event` for a single connection.
    pub fn to(&mut self, player: PlayerId, event: ServerEvent) {
        self.deliveries.push((player, event));
    }

    /// Queues `event` for the members of `room` selected by `recipient`.
    pub fn broadcast(&mut self, room: &Room, recipient: Recipient, event: ServerEvent) {
        match recipient {
            Recipient::All => {
                for player in room.players() {
                    self.to(player.id, event.clone());
                }
            }
            Recipient::Player(id) => self.to(id, event),
            Recipient::AllExcept(excluded) => {
                for player in room.players() {
                    if player.id != excluded {
                        self.to(player.id, event.clone());
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// Events queued for `player`, in order.
    pub fn events_for(&self, player: PlayerId) -> Vec<&ServerEvent> {
        self.deliveries
            .iter()
            .filter(|(to, _)| *to == player)
            .map(|(_, event)| event)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(PlayerId, ServerEvent)> {
        self.deliveries.iter()
    }
}

impl IntoIterator for Outbox {
    type Item = (PlayerId, ServerEvent);
    type IntoIter = std::vec::IntoIter<(PlayerId, ServerEvent)>;

    fn into_iter(self) -> Self::IntoIter {
        self.deliveries.into_iter()
    }
}

/// A snapshot of room metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub host_id: Option<PlayerId>,
    pub players: Vec<PlayerView>,
    pub game_started: bool,
    pub scores: usize,
}

/// Owns every live room and the connection → room index.
///
/// A connection is a member of at most one room; `memberships` holds an
/// entry for exactly the connections that appear in some room's player
/// list.
#[derive(Debug)]
pub struct RoomRegistry {
    pub(crate) rooms: HashMap<RoomCode, Room>,
    pub(crate) memberships: HashMap<PlayerId, RoomCode>,
    pub(crate) config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            memberships: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Looks up a room. `code` is already canonical.
    pub fn get(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    /// All live rooms, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&RoomCode, &Room)> {
        self.rooms.iter()
    }

    /// The room `player` is currently a member of.
    pub fn room_of(&self, player: PlayerId) -> Option<&RoomCode> {
        self.memberships.get(&player)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn info(&self, raw_code: &str) -> Option<RoomInfo> {
        let room = self.rooms.get(&RoomCode::normalize(raw_code)?)?;
        Some(RoomInfo {
            code: room.code().clone(),
            host_id: room.host_id(),
            players: room.views(),
            game_started: room.game_started(),
            scores: room.leaderboard().len(),
        })
    }

    /// Removes a room and unindexes its members. The leaderboard goes with
    /// it.
    pub fn delete(&mut self, code: &RoomCode) -> Option<Room> {
        let room = self.rooms.remove(code)?;
        for player in room.players() {
            self.memberships.remove(&player.id);
        }
        Some(room)
    }

    /// Evicts every room that is empty or past its TTL at `now`.
    ///
    /// Members of an evicted occupied room are sent `roomClosed`.
    pub fn sweep(&mut self, now: Instant) -> (Vec<RoomCode>, Outbox) {
        let expired: Vec<RoomCode> = self
            .rooms
            .values()
            .filter(|room| room.is_expired(now, &self.config))
            .map(|room| room.code().clone())
            .collect();

        let mut outbox = Outbox::default();
        for code in &expired {
            if let Some(room) = self.delete(code) {
                tracing::info!(
                    room_code = %code,
                    players = room.players().len(),
                    "room expired"
                );
                outbox.broadcast(
                    &room,
                    Recipient::All,
                    ServerEvent::RoomClosed {
                        room_code: code.clone(),
                        reason: CloseReason::Expired,
                    },
                );
            }
        }
        (expired, outbox)
    }

    /// Removes every room, telling their members the server is going away.
    pub fn drain(&mut self) -> Outbox {
        let mut outbox = Outbox::default();
        for (code, room) in self.rooms.drain() {
            outbox.broadcast(
                &room,
                Recipient::All,
                ServerEvent::RoomClosed {
                    room_code: code,
                    reason: CloseReason::Shutdown,
                },
            );
        }
        self.memberships.clear();
        outbox
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    #[test]
    fn test_broadcast_recipients() {
        let mut registry = RoomRegistry::default();
        let (code, _) = registry.create_room(pid(1), "Host").unwrap();
        registry.join_room(pid(2), code.as_str(), "Bob", true).unwrap();
        let room = registry.get(&code).unwrap();

        let event = ServerEvent::PromotedToHost { room_code: code.clone() };
        let mut outbox = Outbox::default();
        outbox.broadcast(room, Recipient::All, event.clone());
        assert_eq!(outbox.len(), 2);

        let mut outbox = Outbox::default();
        outbox.broadcast(room, Recipient::AllExcept(pid(1)), event.clone());
        assert!(outbox.events_for(pid(1)).is_empty());
        assert_eq!(outbox.events_for(pid(2)), vec![&event]);

        let mut outbox = Outbox::default();
        outbox.broadcast(room, Recipient::Player(pid(1)), event);
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn test_delete_unindexes_members() {
        let mut registry = RoomRegistry::default();
        let (code, _) = registry.create_room(pid(1), "Host").unwrap();
        registry.join_room(pid(2), code.as_str(), "Bob", true).unwrap();

        assert!(registry.delete(&code).is_some());

        assert!(registry.is_empty());
        assert_eq!(registry.room_of(pid(1)), None);
        assert_eq!(registry.room_of(pid(2)), None);
        assert!(registry.delete(&code).is_none());
    }

    #[test]
    fn test_info_normalizes_code() {
        let mut registry = RoomRegistry::default();
        let (code, _) = registry.create_room(pid(1), "Host").unwrap();

        let info = registry
            .info(&format!("  {} ", code.as_str().to_lowercase()))
            .unwrap();

        assert_eq!(info.code, code);
        assert_eq!(info.host_id, Some(pid(1)));
        assert!(!info.game_started);
        assert!(registry.info("").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_closes_stale_occupied_rooms() {
        let mut registry = RoomRegistry::new(RoomConfig {
            room_ttl: Duration::from_secs(60),
            ..RoomConfig::default()
        });
        let (stale, _) = registry.create_room(pid(1), "Old").unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;
        let (fresh, _) = registry.create_room(pid(2), "New").unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        let (evicted, outbox) = registry.sweep(Instant::now());

        assert_eq!(evicted, vec![stale.clone()]);
        assert!(registry.get(&fresh).is_some());
        assert_eq!(registry.room_of(pid(1)), None);
        assert_eq!(
            outbox.events_for(pid(1)),
            vec![&ServerEvent::RoomClosed {
                room_code: stale,
                reason: CloseReason::Expired,
            }]
        );
        assert!(outbox.events_for(pid(2)).is_empty());
    }

    #[test]
    fn test_drain_notifies_everyone() {
        let mut registry = RoomRegistry::default();
        let (a, _) = registry.create_room(pid(1), "A").unwrap();
        registry.create_room(pid(2), "B").unwrap();
        registry.join_room(pid(3), a.as_str(), "C", true).unwrap();

        let outbox = registry.drain();

        assert_eq!(outbox.len(), 3);
        assert!(outbox.iter().all(|(_, event)| matches!(
            event,
            ServerEvent::RoomClosed { reason: CloseReason::Shutdown, .. }
        )));
        assert!(registry.is_empty());
        assert_eq!(registry.room_of(pid(3)), None);
    }
}
