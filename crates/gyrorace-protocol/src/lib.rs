//! Wire protocol for Gyrorace.
//!
//! This crate defines the closed event schema that browser clients and
//! the coordinator speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`PlayerView`],
//!   [`ScoreEntry`], [`RoomCode`], [`PlayerId`]): the structures that
//!   travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those events are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! Every frame is one adjacently tagged event:
//!
//! ```text
//! {"event": "joinRoom", "data": {"roomCode": "AB12CD", "username": "Alice", "isController": true}}
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientEvent, CloseReason, PlayerId, PlayerView, RoomCode, ScoreEntry,
    ScoreSubmission, ServerEvent, PROTOCOL_VERSION,
};
