//! Room configuration and expiry policy.

use std::time::Duration;

// ---------------------------------------------------------------------------
// ExpiryPolicy
// ---------------------------------------------------------------------------

/// Which clock the sweeper compares against the room TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// Evict rooms that have seen no membership change, game start,
    /// score, or telemetry for longer than the TTL.
    #[default]
    Inactivity,

    /// Evict rooms older than the TTL regardless of activity, even while
    /// a game is being played in them.
    SinceCreation,
}

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration for the room registry and its coordinator.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Characters per room code.
    pub code_length: usize,

    /// Characters room codes are drawn from.
    pub code_alphabet: String,

    /// Draws before code generation gives up with
    /// [`RoomError::RegistryExhausted`](crate::RoomError::RegistryExhausted).
    pub max_code_attempts: usize,

    /// Controllers required before the host may start.
    pub min_controllers: usize,

    /// Entries kept per room leaderboard.
    pub leaderboard_capacity: usize,

    /// Age (see [`ExpiryPolicy`]) after which the sweeper evicts a room.
    pub room_ttl: Duration,

    /// How often the sweeper runs.
    pub sweep_interval: Duration,

    pub expiry: ExpiryPolicy,

    /// Capacity of the coordinator's command queue. Telemetry is dropped,
    /// not queued, once it is full.
    pub command_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            code_alphabet: "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789".to_string(),
            max_code_attempts: 1_000,
            min_controllers: 1,
            leaderboard_capacity: 10,
            room_ttl: Duration::from_secs(2 * 60 * 60),
            sweep_interval: Duration::from_secs(30 * 60),
            expiry: ExpiryPolicy::default(),
            command_buffer: 1_024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.code_length, 6);
        assert_eq!(config.code_alphabet.len(), 36);
        assert_eq!(config.min_controllers, 1);
        assert_eq!(config.leaderboard_capacity, 10);
        assert_eq!(config.room_ttl, Duration::from_secs(7_200));
        assert_eq!(config.sweep_interval, Duration::from_secs(1_800));
        assert_eq!(config.expiry, ExpiryPolicy::Inactivity);
    }
}
