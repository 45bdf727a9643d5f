//! Per-room bounded score table and the score operations on the registry.

use chrono::{SecondsFormat, Utc};
use gyrorace_protocol::{RoomCode, ScoreEntry, ScoreSubmission, ServerEvent};

use crate::{Outbox, Recipient, RoomError, RoomRegistry};

/// Scores kept in descending order, capped at a fixed capacity.
///
/// Ties keep submission order.
#[derive(Debug, Clone)]
pub struct Leaderboard {
    entries: Vec<ScoreEntry>,
    capacity: usize,
}

impl Leaderboard {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Inserts `entry`, re-sorts, and discards everything past capacity.
    pub fn insert(&mut self, entry: ScoreEntry) -> &[ScoreEntry] {
        self.entries.push(entry);
        // `sort_by` is stable, so equal scores stay in arrival order.
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(self.capacity);
        &self.entries
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RoomRegistry {
    /// Records a score and broadcasts `newScore` to the room.
    ///
    /// Returns the room's leaderboard after truncation.
    ///
    /// # Errors
    /// - [`RoomError::MissingField`]: pseudo, room code, score or
    ///   survival time absent
    /// - [`RoomError::NotFound`]: unknown room
    pub fn submit_score(
        &mut self,
        submission: ScoreSubmission,
    ) -> Result<(Vec<ScoreEntry>, Outbox), RoomError> {
        const REQUIRED: &str =
            "pseudo, roomCode, score and survivalTime are required";

        let pseudo = submission.pseudo.trim();
        let (Some(code), Some(score), Some(survival_time)) = (
            RoomCode::normalize(&submission.room_code),
            submission.score,
            submission.survival_time,
        ) else {
            return Err(RoomError::MissingField(REQUIRED));
        };
        if pseudo.is_empty() {
            return Err(RoomError::MissingField(REQUIRED));
        }

        let room = self
            .rooms
            .get_mut(&code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        let entry = ScoreEntry {
            pseudo: pseudo.to_string(),
            score,
            survival_time,
            timestamp: submission.timestamp,
            date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let leaderboard = room.leaderboard_mut().insert(entry).to_vec();
        room.touch();

        tracing::info!(
            room_code = %code,
            pseudo,
            score,
            survival_time,
            "score recorded"
        );

        let mut outbox = Outbox::default();
        outbox.broadcast(
            room,
            Recipient::All,
            ServerEvent::NewScore {
                pseudo: pseudo.to_string(),
                score,
                survival_time,
                leaderboard: leaderboard.clone(),
            },
        );
        Ok((leaderboard, outbox))
    }

    /// The room's leaderboard.
    ///
    /// # Errors
    /// Returns [`RoomError::NotFound`] for an unknown or blank code.
    pub fn scores(&self, raw_code: &str) -> Result<Vec<ScoreEntry>, RoomError> {
        let code = RoomCode::normalize(raw_code)
            .ok_or(RoomError::MissingField("roomCode is required"))?;
        self.rooms
            .get(&code)
            .map(|room| room.leaderboard().entries().to_vec())
            .ok_or(RoomError::NotFound(code))
    }

    /// The room's leaderboard, or an empty list when the room is unknown.
    pub fn leaderboard(&self, raw_code: &str) -> Vec<ScoreEntry> {
        self.scores(raw_code).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pseudo: &str, score: i64) -> ScoreEntry {
        ScoreEntry {
            pseudo: pseudo.into(),
            score,
            survival_time: 1.0,
            timestamp: None,
            date: String::new(),
        }
    }

    fn scores(board: &Leaderboard) -> Vec<(String, i64)> {
        board
            .entries()
            .iter()
            .map(|e| (e.pseudo.clone(), e.score))
            .collect()
    }

    #[test]
    fn test_insert_sorts_descending() {
        let mut board = Leaderboard::new(10);
        board.insert(entry("P1", 100));
        board.insert(entry("P2", 300));
        board.insert(entry("P1", 250));

        assert_eq!(
            scores(&board),
            vec![
                ("P2".to_string(), 300),
                ("P1".to_string(), 250),
                ("P1".to_string(), 100),
            ]
        );
    }

    #[test]
    fn test_insert_keeps_top_capacity() {
        let mut board = Leaderboard::new(10);
        for score in 1..=15 {
            board.insert(entry("P", score));
        }

        assert_eq!(board.len(), 10);
        let kept: Vec<i64> = board.entries().iter().map(|e| e.score).collect();
        assert_eq!(kept, (6..=15).rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_low_score_on_full_board_is_discarded() {
        let mut board = Leaderboard::new(2);
        board.insert(entry("A", 50));
        board.insert(entry("B", 40));

        let after = board.insert(entry("C", 10));

        assert_eq!(after.len(), 2);
        assert!(after.iter().all(|e| e.pseudo != "C"));
    }

    #[test]
    fn test_ties_keep_submission_order() {
        let mut board = Leaderboard::new(10);
        board.insert(entry("first", 100));
        board.insert(entry("second", 100));

        assert_eq!(board.entries()[0].pseudo, "first");
        assert_eq!(board.entries()[1].pseudo, "second");
    }
}
