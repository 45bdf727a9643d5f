//! Room coordination for Gyrorace.
//!
//! All room state lives in one [`RoomRegistry`] owned by a single Tokio
//! task (actor model). Connection handlers and the HTTP score API talk to
//! it through a [`CoordinatorHandle`]; the actor applies each command as a
//! synchronous state transition and hands the resulting notifications to
//! the [`Gateway`].
//!
//! # Key types
//!
//! - [`RoomRegistry`]: rooms, membership, game start, telemetry relay,
//!   leaderboards, and expiry, as plain synchronous operations
//! - [`Outbox`]: the notifications one operation produced
//! - [`CoordinatorHandle`]: send commands to the running coordinator
//! - [`RoomConfig`]: code shape, quorum, leaderboard size, expiry

mod code;
mod config;
mod coordinator;
mod error;
mod gate;
mod gateway;
mod leaderboard;
mod membership;
mod registry;
mod relay;
mod room;

pub use config::{ExpiryPolicy, RoomConfig};
pub use coordinator::{CoordinatorHandle, spawn_coordinator};
pub use error::{ErrorKind, RoomError};
pub use gateway::{
    ClientReceiver, ClientSender, DEFAULT_TELEMETRY_BUFFER, Gateway, client_channel,
};
pub use leaderboard::Leaderboard;
pub use registry::{Outbox, Recipient, RoomInfo, RoomRegistry};
pub use room::{Player, Room};
