//! Core protocol types for Gyrorace's wire format.
//!
//! Every type here is serialized to JSON and read by browser clients, so
//! field names follow the clients' camelCase convention.

use std::fmt;
use std::str::FromStr;

use gyrorace_transport::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Version announced to clients in [`ServerEvent::Connected`].
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifies a player by the connection it arrived on.
///
/// Serialized as a plain number: `PlayerId(42)` is `42` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl From<ConnectionId> for PlayerId {
    fn from(id: ConnectionId) -> Self {
        Self(id.get())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A room's short join code, always stored uppercase.
///
/// Clients may type codes in any case; [`RoomCode::normalize`] (and the
/// `FromStr`/`Deserialize` impls built on it) canonicalize before any
/// lookup happens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Trims and uppercases `raw`. Returns `None` when nothing is left.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_uppercase()))
        }
    }

    /// Returns the canonical code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s).ok_or_else(|| {
            ProtocolError::InvalidMessage("room code is empty".into())
        })
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Shared payload structs
// ---------------------------------------------------------------------------

/// The public view of a room member, as listed in `players[]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub username: String,
    pub is_host: bool,
    pub is_controller: bool,
}

/// One row of a room's leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub pseudo: String,
    pub score: i64,
    /// Seconds survived.
    pub survival_time: f64,
    /// Client clock at submission, milliseconds since the epoch.
    pub timestamp: Option<i64>,
    /// Server receipt time, RFC 3339.
    pub date: String,
}

/// Body of `POST /api/score`.
///
/// Every field is optional at decode time; the leaderboard rejects a
/// submission missing `pseudo`, `roomCode`, `score` or `survivalTime`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreSubmission {
    pub pseudo: String,
    pub room_code: String,
    pub score: Option<i64>,
    pub survival_time: Option<f64>,
    pub timestamp: Option<i64>,
}

/// Why the server closed a room under its members' feet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseReason {
    Expired,
    Shutdown,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client may send.
///
/// Adjacently tagged: `{"event": "startGame", "data": {"roomCode": "AB12CD"}}`.
/// Text fields default to empty when absent so that the room layer, not
/// the decoder, reports them as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    CreateRoom {
        #[serde(default)]
        username: String,
    },

    #[serde(rename_all = "camelCase")]
    JoinRoom {
        #[serde(default)]
        room_code: String,
        #[serde(default)]
        username: String,
        /// Screens omit this.
        #[serde(default)]
        is_controller: bool,
    },

    #[serde(rename_all = "camelCase")]
    GetPlayers {
        #[serde(default)]
        room_code: String,
    },

    #[serde(rename_all = "camelCase")]
    StartGame {
        #[serde(default)]
        room_code: String,
    },

    /// Controller tilt sample, sent at a fixed small interval.
    #[serde(rename_all = "camelCase")]
    Gyroscope {
        #[serde(default)]
        room_code: String,
        #[serde(default)]
        gamma: f64,
        #[serde(default)]
        beta: f64,
        #[serde(default)]
        username: String,
    },

    #[serde(rename_all = "camelCase")]
    LeaveRoom {
        #[serde(default)]
        room_code: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    Heartbeat { client_time: u64 },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything the server may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// First frame on every connection.
    #[serde(rename_all = "camelCase")]
    Connected {
        player_id: PlayerId,
        protocol_version: u32,
    },

    #[serde(rename_all = "camelCase")]
    RoomCreated {
        room_code: RoomCode,
        username: String,
        is_host: bool,
        player_id: PlayerId,
        players: Vec<PlayerView>,
    },

    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_code: RoomCode,
        username: String,
        players: Vec<PlayerView>,
        is_host: bool,
        is_controller: bool,
    },

    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        username: String,
        player_id: PlayerId,
        players: Vec<PlayerView>,
        is_controller: bool,
    },

    #[serde(rename_all = "camelCase")]
    PlayersList { players: Vec<PlayerView> },

    #[serde(rename_all = "camelCase")]
    GameStarted { players: Vec<PlayerView> },

    #[serde(rename_all = "camelCase")]
    GyroscopeData {
        player_id: PlayerId,
        username: String,
        gamma: f64,
        beta: f64,
    },

    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        username: String,
        player_id: PlayerId,
        players: Vec<PlayerView>,
    },

    #[serde(rename_all = "camelCase")]
    PromotedToHost { room_code: RoomCode },

    #[serde(rename_all = "camelCase")]
    NewScore {
        pseudo: String,
        score: i64,
        survival_time: f64,
        leaderboard: Vec<ScoreEntry>,
    },

    #[serde(rename_all = "camelCase")]
    RoomClosed {
        room_code: RoomCode,
        reason: CloseReason,
    },

    #[serde(rename_all = "camelCase")]
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// `code` follows HTTP conventions (400, 403, 404, 409, 503).
    #[serde(rename_all = "camelCase")]
    Error { code: u16, message: String },
}

impl ServerEvent {
    /// Returns `true` for high-frequency samples that may be dropped.
    pub fn is_telemetry(&self) -> bool {
        matches!(self, Self::GyroscopeData { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> RoomCode {
        s.parse().unwrap()
    }

    #[test]
    fn test_room_code_normalizes_case_and_whitespace() {
        assert_eq!(code("  ab12cd ").as_str(), "AB12CD");
        assert_eq!(code("ab12cd"), code("AB12CD"));
    }

    #[test]
    fn test_room_code_rejects_blank() {
        assert!(RoomCode::normalize("   ").is_none());
        assert!("".parse::<RoomCode>().is_err());
    }

    #[test]
    fn test_room_code_deserialize_canonicalizes() {
        let c: RoomCode = serde_json::from_str("\"xy9z00\"").unwrap();
        assert_eq!(c.as_str(), "XY9Z00");
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"XY9Z00\"");
    }

    #[test]
    fn test_player_id_from_connection_id() {
        let pid = PlayerId::from(ConnectionId::from(9));
        assert_eq!(pid, PlayerId(9));
        assert_eq!(serde_json::to_string(&pid).unwrap(), "9");
    }

    #[test]
    fn test_join_room_decodes_with_camel_case_fields() {
        let json = r#"{"event":"joinRoom","data":{"roomCode":"ab12cd","username":"Alice","isController":true}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room_code: "ab12cd".into(),
                username: "Alice".into(),
                is_controller: true,
            }
        );
    }

    #[test]
    fn test_join_room_missing_fields_default_to_empty() {
        let json = r#"{"event":"joinRoom","data":{}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room_code: String::new(),
                username: String::new(),
                is_controller: false,
            }
        );
    }

    #[test]
    fn test_leave_room_code_is_optional() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"leaveRoom","data":{}}"#).unwrap();
        assert_eq!(event, ClientEvent::LeaveRoom { room_code: None });
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result: Result<ClientEvent, _> =
            serde_json::from_str(r#"{"event":"flyToMoon","data":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_room_joined_json_shape() {
        let event = ServerEvent::RoomJoined {
            room_code: code("AB12CD"),
            username: "Bob".into(),
            players: vec![PlayerView {
                id: PlayerId(2),
                username: "Bob".into(),
                is_host: false,
                is_controller: true,
            }],
            is_host: false,
            is_controller: true,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "roomJoined");
        assert_eq!(json["data"]["roomCode"], "AB12CD");
        assert_eq!(json["data"]["isHost"], false);
        assert_eq!(json["data"]["players"][0]["id"], 2);
        assert_eq!(json["data"]["players"][0]["isController"], true);
    }

    #[test]
    fn test_gyroscope_data_json_shape() {
        let event = ServerEvent::GyroscopeData {
            player_id: PlayerId(3),
            username: "Alice".into(),
            gamma: -12.5,
            beta: 4.0,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "gyroscopeData");
        assert_eq!(json["data"]["playerId"], 3);
        assert_eq!(json["data"]["gamma"], -12.5);
        assert!(event.is_telemetry());
    }

    #[test]
    fn test_new_score_json_shape() {
        let event = ServerEvent::NewScore {
            pseudo: "P1".into(),
            score: 100,
            survival_time: 12.5,
            leaderboard: vec![ScoreEntry {
                pseudo: "P1".into(),
                score: 100,
                survival_time: 12.5,
                timestamp: None,
                date: "2026-01-01T00:00:00.000Z".into(),
            }],
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "newScore");
        assert_eq!(json["data"]["survivalTime"], 12.5);
        assert_eq!(json["data"]["leaderboard"][0]["pseudo"], "P1");
        assert!(!event.is_telemetry());
    }

    #[test]
    fn test_score_submission_tolerates_missing_fields() {
        let body: ScoreSubmission =
            serde_json::from_str(r#"{"pseudo":"P1","roomCode":"ab12cd"}"#).unwrap();
        assert_eq!(body.pseudo, "P1");
        assert_eq!(body.room_code, "ab12cd");
        assert_eq!(body.score, None);
        assert_eq!(body.survival_time, None);
    }

    #[test]
    fn test_room_closed_reason_is_lowercase() {
        let event = ServerEvent::RoomClosed {
            room_code: code("AB12CD"),
            reason: CloseReason::Expired,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["reason"], "expired");
    }

    #[test]
    fn test_error_json_shape() {
        let event = ServerEvent::Error {
            code: 404,
            message: "room AB12CD not found".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["data"]["code"], 404);
    }
}
