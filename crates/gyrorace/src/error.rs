//! Unified error type for the Gyrorace server.

use gyrorace_protocol::ProtocolError;
use gyrorace_room::RoomError;
use gyrorace_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GyroraceError {
    /// Connection accept, send, or receive failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An event could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The coordinator rejected or could not serve a request.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Binding or serving the HTTP listener failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
