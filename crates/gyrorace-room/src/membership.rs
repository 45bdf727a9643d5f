//! Create, join, leave, and list operations.

use gyrorace_protocol::{PlayerId, PlayerView, RoomCode, ServerEvent};

use crate::code::generate_code;
use crate::{Outbox, Recipient, Room, RoomError, RoomRegistry};

impl RoomRegistry {
    /// Opens a new room with `player` as its host screen.
    ///
    /// # Errors
    /// - [`RoomError::MissingField`]: blank username
    /// - [`RoomError::AlreadyInRoom`]: `player` is already a member
    /// - [`RoomError::RegistryExhausted`]: no free code
    pub fn create_room(
        &mut self,
        player: PlayerId,
        username: &str,
    ) -> Result<(RoomCode, Outbox), RoomError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(RoomError::MissingField("username is required"));
        }
        self.ensure_unassigned(player)?;

        let code = generate_code(&mut rand::rng(), &self.config, |c| {
            self.rooms.contains_key(c)
        })?;
        let room = Room::new(
            code.clone(),
            player,
            username.to_string(),
            self.config.leaderboard_capacity,
        );

        let mut outbox = Outbox::default();
        outbox.to(
            player,
            ServerEvent::RoomCreated {
                room_code: code.clone(),
                username: username.to_string(),
                is_host: true,
                player_id: player,
                players: room.views(),
            },
        );

        self.rooms.insert(code.clone(), room);
        self.memberships.insert(player, code.clone());
        tracing::info!(room_code = %code, player_id = %player, "room created");
        Ok((code, outbox))
    }

    /// Adds `player` to an existing room.
    ///
    /// Screens may join a started room; controllers may not.
    ///
    /// # Errors
    /// - [`RoomError::MissingField`]: blank code or username
    /// - [`RoomError::AlreadyInRoom`]: `player` is already a member
    /// - [`RoomError::NotFound`]: unknown room
    /// - [`RoomError::GameAlreadyStarted`]: controller joining a started game
    /// - [`RoomError::UsernameTaken`]: case-insensitive name collision
    pub fn join_room(
        &mut self,
        player: PlayerId,
        raw_code: &str,
        username: &str,
        is_controller: bool,
    ) -> Result<Outbox, RoomError> {
        let username = username.trim();
        let Some(code) = RoomCode::normalize(raw_code).filter(|_| !username.is_empty())
        else {
            return Err(RoomError::MissingField(
                "room code and username are required",
            ));
        };
        self.ensure_unassigned(player)?;

        let room = self
            .rooms
            .get_mut(&code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        if room.game_started() && is_controller {
            return Err(RoomError::GameAlreadyStarted(code));
        }
        if room.username_taken(username) {
            return Err(RoomError::UsernameTaken(username.to_string(), code));
        }

        let is_host = room.push_player(player, username.to_string(), is_controller).is_host;
        let players = room.views();

        let mut outbox = Outbox::default();
        outbox.to(
            player,
            ServerEvent::RoomJoined {
                room_code: code.clone(),
                username: username.to_string(),
                players: players.clone(),
                is_host,
                is_controller,
            },
        );
        outbox.broadcast(
            room,
            Recipient::AllExcept(player),
            ServerEvent::PlayerJoined {
                username: username.to_string(),
                player_id: player,
                players,
                is_controller,
            },
        );

        tracing::info!(
            room_code = %code,
            player_id = %player,
            is_controller,
            players = room.players().len(),
            "player joined"
        );
        self.memberships.insert(player, code);
        Ok(outbox)
    }

    /// Removes `player` from whatever room it is in.
    ///
    /// The room comes from the connection index; `hint` is only
    /// cross-checked. Leaving while in no room does nothing, so a
    /// disconnect after an explicit leave is harmless.
    pub fn leave(&mut self, player: PlayerId, hint: Option<&str>) -> Outbox {
        let mut outbox = Outbox::default();
        let Some(code) = self.memberships.remove(&player) else {
            tracing::debug!(player_id = %player, "leave without a room");
            return outbox;
        };
        if let Some(hinted) = hint.and_then(RoomCode::normalize) {
            if hinted != code {
                tracing::debug!(
                    player_id = %player,
                    room_code = %code,
                    %hinted,
                    "leave named a different room"
                );
            }
        }

        let Some(room) = self.rooms.get_mut(&code) else {
            return outbox;
        };
        let Some(departure) = room.remove_player(player) else {
            return outbox;
        };

        tracing::info!(
            room_code = %code,
            player_id = %player,
            players = room.players().len(),
            "player left"
        );

        if room.is_empty() {
            if room.game_started() {
                tracing::info!(room_code = %code, "empty started room retained");
            } else {
                self.rooms.remove(&code);
                tracing::info!(room_code = %code, "room deleted");
            }
            return outbox;
        }

        if let Some(new_host) = departure.new_host {
            tracing::info!(room_code = %code, player_id = %new_host, "host migrated");
            outbox.to(
                new_host,
                ServerEvent::PromotedToHost { room_code: code.clone() },
            );
        }
        outbox.broadcast(
            room,
            Recipient::All,
            ServerEvent::PlayerLeft {
                username: departure.player.username,
                player_id: player,
                players: room.views(),
            },
        );
        outbox
    }

    /// Current members of a room in join order.
    ///
    /// # Errors
    /// [`RoomError::MissingField`] for a blank code, [`RoomError::NotFound`]
    /// for an unknown one.
    pub fn list_players(&self, raw_code: &str) -> Result<Vec<PlayerView>, RoomError> {
        let code = RoomCode::normalize(raw_code)
            .ok_or(RoomError::MissingField("roomCode is required"))?;
        self.rooms
            .get(&code)
            .map(Room::views)
            .ok_or(RoomError::NotFound(code))
    }

    fn ensure_unassigned(&self, player: PlayerId) -> Result<(), RoomError> {
        match self.memberships.get(&player) {
            Some(current) => Err(RoomError::AlreadyInRoom(player, current.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn room_with(registry: &mut RoomRegistry, members: &[(&str, bool)]) -> RoomCode {
        let (code, _) = registry.create_room(pid(1), "Screen").unwrap();
        for (i, (name, controller)) in members.iter().enumerate() {
            registry
                .join_room(pid(i as u64 + 2), code.as_str(), name, *controller)
                .unwrap();
        }
        code
    }

    #[test]
    fn test_create_room_replies_to_creator() {
        let mut registry = RoomRegistry::default();

        let (code, outbox) = registry.create_room(pid(1), "  Screen  ").unwrap();

        let events = outbox.events_for(pid(1));
        assert_eq!(events.len(), 1);
        let ServerEvent::RoomCreated { room_code, username, is_host, players, .. } =
            events[0]
        else {
            panic!("expected roomCreated, got {:?}", events[0]);
        };
        assert_eq!(room_code, &code);
        assert_eq!(username, "Screen");
        assert!(*is_host);
        assert_eq!(players.len(), 1);
        assert_eq!(registry.room_of(pid(1)), Some(&code));
    }

    #[test]
    fn test_create_room_requires_username() {
        let mut registry = RoomRegistry::default();
        let err = registry.create_room(pid(1), "   ").unwrap_err();
        assert!(matches!(err, RoomError::MissingField(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_one_room_per_connection() {
        let mut registry = RoomRegistry::default();
        let code = room_with(&mut registry, &[]);

        assert!(matches!(
            registry.create_room(pid(1), "Again"),
            Err(RoomError::AlreadyInRoom(..))
        ));
        assert!(matches!(
            registry.join_room(pid(1), code.as_str(), "Other", true),
            Err(RoomError::AlreadyInRoom(..))
        ));
    }

    #[test]
    fn test_join_notifies_others_only() {
        let mut registry = RoomRegistry::default();
        let code = room_with(&mut registry, &[]);

        let outbox = registry.join_room(pid(2), &code.as_str().to_lowercase(), "Bob", true).unwrap();

        let joiner = outbox.events_for(pid(2));
        assert_eq!(joiner.len(), 1);
        assert!(matches!(
            joiner[0],
            ServerEvent::RoomJoined { is_host: false, is_controller: true, players, .. }
                if players.len() == 2
        ));
        let host = outbox.events_for(pid(1));
        assert!(matches!(
            host[..],
            [ServerEvent::PlayerJoined { player_id, .. }] if *player_id == pid(2)
        ));
    }

    #[test]
    fn test_join_validation_order() {
        let mut registry = RoomRegistry::default();

        assert!(matches!(
            registry.join_room(pid(2), "", "Bob", true),
            Err(RoomError::MissingField(_))
        ));
        assert!(matches!(
            registry.join_room(pid(2), "ZZZZZZ", " ", true),
            Err(RoomError::MissingField(_))
        ));
        assert!(matches!(
            registry.join_room(pid(2), "ZZZZZZ", "Bob", true),
            Err(RoomError::NotFound(_))
        ));
    }

    #[test]
    fn test_join_after_start_depends_on_role() {
        let mut registry = RoomRegistry::default();
        let code = room_with(&mut registry, &[("Alice", true)]);
        registry.start_game(pid(1), code.as_str()).unwrap();

        let err = registry.join_room(pid(9), code.as_str(), "Late", true).unwrap_err();
        assert!(matches!(err, RoomError::GameAlreadyStarted(_)));

        registry.join_room(pid(10), code.as_str(), "Screen2", false).unwrap();
        assert_eq!(registry.list_players(code.as_str()).unwrap().len(), 3);
    }

    #[test]
    fn test_leave_last_member_deletes_unstarted_room() {
        let mut registry = RoomRegistry::default();
        let code = room_with(&mut registry, &[]);

        let outbox = registry.leave(pid(1), Some(code.as_str()));

        assert!(outbox.is_empty());
        assert!(registry.get(&code).is_none());
    }

    #[test]
    fn test_leave_last_member_retains_started_room() {
        let mut registry = RoomRegistry::default();
        let code = room_with(&mut registry, &[("Alice", true)]);
        registry.start_game(pid(1), code.as_str()).unwrap();

        registry.leave(pid(1), None);
        registry.leave(pid(2), None);

        let room = registry.get(&code).unwrap();
        assert!(room.is_empty());
        assert!(room.game_started());

        let outbox = registry.join_room(pid(7), code.as_str(), "Screen", false).unwrap();
        assert!(matches!(
            outbox.events_for(pid(7))[..],
            [ServerEvent::RoomJoined { is_host: true, .. }]
        ));
    }

    #[test]
    fn test_host_leave_promotes_then_announces() {
        let mut registry = RoomRegistry::default();
        let code = room_with(&mut registry, &[("Alice", true), ("Bob", true)]);

        let outbox = registry.leave(pid(1), None);

        let alice = outbox.events_for(pid(2));
        assert!(matches!(alice[0], ServerEvent::PromotedToHost { .. }));
        assert!(matches!(alice[1], ServerEvent::PlayerLeft { .. }));
        let bob = outbox.events_for(pid(3));
        assert!(matches!(
            bob[..],
            [ServerEvent::PlayerLeft { player_id, players, .. }]
                if *player_id == pid(1) && players.len() == 2 && players[0].is_host
        ));
        assert_eq!(registry.get(&code).unwrap().host_id(), Some(pid(2)));
    }

    #[test]
    fn test_leave_is_idempotent() {
        let mut registry = RoomRegistry::default();
        let code = room_with(&mut registry, &[("Alice", true)]);

        assert!(!registry.leave(pid(2), Some(code.as_str())).is_empty());
        assert!(registry.leave(pid(2), None).is_empty());
        assert_eq!(registry.list_players(code.as_str()).unwrap().len(), 1);
    }

    #[test]
    fn test_list_players_unknown_room() {
        let registry = RoomRegistry::default();
        assert!(matches!(
            registry.list_players("nope"),
            Err(RoomError::NotFound(_))
        ));
    }
}
