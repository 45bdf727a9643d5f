//! Error types for the room layer.

use gyrorace_protocol::{PlayerId, RoomCode, ServerEvent};

/// Broad category of a [`RoomError`].
///
/// Every category is terminal for the request that caused it; the client
/// corrects its input and resends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required field is missing or empty, or a username collides.
    Validation,
    /// The room code does not name a live room.
    NotFound,
    /// A non-host attempted a host-only action.
    Authorization,
    /// The room is not in a state that allows the action.
    Precondition,
    /// The coordinator cannot serve the request at all.
    Unavailable,
}

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// A required field was missing or blank.
    #[error("{0}")]
    MissingField(&'static str),

    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Another member already uses this name (case-insensitive).
    #[error("username {0:?} is already taken in room {1}")]
    UsernameTaken(String, RoomCode),

    /// Only the host may start the game.
    #[error("only the host can start the game in room {0}")]
    NotHost(RoomCode),

    /// Controllers cannot join once the game is running.
    #[error("the game in room {0} has already started")]
    GameAlreadyStarted(RoomCode),

    /// Not enough controllers to start.
    #[error("at least {required} controller(s) required to start, {present} present")]
    NotEnoughControllers { required: usize, present: usize },

    /// The connection is already a member of a room.
    #[error("player {0} is already in room {1}")]
    AlreadyInRoom(PlayerId, RoomCode),

    /// No free room code could be drawn.
    #[error("no free room code after {0} attempts")]
    RegistryExhausted(usize),

    /// The coordinator task is gone or its queue is closed.
    #[error("room coordinator is unavailable")]
    Unavailable,
}

impl RoomError {
    /// Returns the error's category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_) | Self::UsernameTaken(..) => {
                ErrorKind::Validation
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotHost(_) => ErrorKind::Authorization,
            Self::GameAlreadyStarted(_)
            | Self::NotEnoughControllers { .. }
            | Self::AlreadyInRoom(..) => ErrorKind::Precondition,
            Self::RegistryExhausted(_) | Self::Unavailable => {
                ErrorKind::Unavailable
            }
        }
    }

    /// HTTP-style status code carried by `error` events.
    pub fn code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Precondition => 409,
            ErrorKind::Unavailable => 503,
        }
    }

    /// Builds the `error` event sent back to the requesting client.
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::Error {
            code: self.code(),
            message: self.to_string(),
        }
    }
}
