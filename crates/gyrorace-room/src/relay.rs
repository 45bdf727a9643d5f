//! Controller telemetry relay.

use gyrorace_protocol::{PlayerId, RoomCode, ServerEvent};

use crate::{Outbox, Recipient, RoomRegistry};

impl RoomRegistry {
    /// Forwards one gyroscope sample to every other member of the room.
    ///
    /// Samples for unknown rooms are dropped. The sender is never echoed.
    pub fn relay_telemetry(
        &mut self,
        player: PlayerId,
        raw_code: &str,
        gamma: f64,
        beta: f64,
        username: String,
    ) -> Outbox {
        let mut outbox = Outbox::default();
        let Some(room) = RoomCode::normalize(raw_code).and_then(|code| self.rooms.get_mut(&code))
        else {
            tracing::trace!(player_id = %player, room_code = raw_code, "telemetry for unknown room dropped");
            return outbox;
        };

        room.touch();
        outbox.broadcast(
            room,
            Recipient::AllExcept(player),
            ServerEvent::GyroscopeData {
                player_id: player,
                username,
                gamma,
                beta,
            },
        );
        outbox
    }
}
