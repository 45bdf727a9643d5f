//! # Gyrorace
//!
//! Realtime room coordinator for browser racing games steered by phone
//! gyroscopes.
//!
//! One client (the screen) opens a room and shows its code; phones join
//! as controllers and stream tilt samples that the coordinator relays to
//! the screen. The host starts the game once a controller is present and
//! finished runs are posted to a per-room leaderboard over HTTP.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gyrorace::prelude::*;
//!
//! # async fn run() -> Result<(), GyroraceError> {
//! let server = GyroraceServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .http_bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod http;
mod server;

pub use error::GyroraceError;
pub use server::{GyroraceServer, GyroraceServerBuilder};

/// Common imports for running a server and talking to it.
pub mod prelude {
    pub use crate::{GyroraceError, GyroraceServer, GyroraceServerBuilder};
    pub use gyrorace_protocol::{
        ClientEvent, CloseReason, PlayerId, PlayerView, RoomCode, ScoreEntry, ServerEvent,
        PROTOCOL_VERSION,
    };
    pub use gyrorace_room::{ExpiryPolicy, RoomConfig};
}
