//! Game start gating.

use gyrorace_protocol::{PlayerId, RoomCode, ServerEvent};

use crate::{Outbox, Recipient, RoomError, RoomRegistry};

impl RoomRegistry {
    /// Starts the game if `player` is host and enough controllers are
    /// present, then broadcasts `gameStarted` to the room.
    ///
    /// Starting an already started room re-broadcasts without changing
    /// state.
    ///
    /// # Errors
    /// - [`RoomError::MissingField`]: blank room code
    /// - [`RoomError::NotFound`]: unknown room
    /// - [`RoomError::NotHost`]: caller is not the host
    /// - [`RoomError::NotEnoughControllers`]: quorum not met
    pub fn start_game(&mut self, player: PlayerId, raw_code: &str) -> Result<Outbox, RoomError> {
        let code = RoomCode::normalize(raw_code)
            .ok_or(RoomError::MissingField("roomCode is required"))?;
        let room = self
            .rooms
            .get_mut(&code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        if !room.is_host(player) {
            return Err(RoomError::NotHost(code));
        }
        let required = self.config.min_controllers;
        let present = room.controller_count();
        if present < required {
            return Err(RoomError::NotEnoughControllers { required, present });
        }

        room.mark_started();
        tracing::info!(room_code = %code, controllers = present, "game started");

        let mut outbox = Outbox::default();
        outbox.broadcast(
            room,
            Recipient::All,
            ServerEvent::GameStarted { players: room.views() },
        );
        Ok(outbox)
    }
}
