//! HTTP score API.
//!
//! A thin surface over the coordinator's leaderboard operations; room
//! state is never touched outside the coordinator task.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use gyrorace_protocol::{ScoreEntry, ScoreSubmission};
use gyrorace_room::{CoordinatorHandle, RoomError};
use serde::Serialize;
use tower_http::trace::TraceLayer;

/// Builds the score API router.
pub(crate) fn router(coordinator: CoordinatorHandle) -> Router {
    Router::new()
        .route("/api/score", post(submit_score))
        .route("/api/scores/{room_code}", get(get_scores))
        .route("/api/leaderboard/{room_code}", get(get_leaderboard))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(coordinator)
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    success: bool,
    leaderboard: Vec<ScoreEntry>,
}

#[derive(Debug, Serialize)]
struct ScoresResponse {
    scores: Vec<ScoreEntry>,
}

#[derive(Debug, Serialize)]
struct LeaderboardResponse {
    leaderboard: Vec<ScoreEntry>,
}

/// JSON error body `{"error": "..."}` with the matching status.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        let status =
            StatusCode::from_u16(err.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

/// Records a score and broadcasts `newScore` to the room.
async fn submit_score(
    State(coordinator): State<CoordinatorHandle>,
    body: Result<Json<ScoreSubmission>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(submission) = body?;
    let leaderboard = coordinator.submit_score(submission).await?;
    Ok(Json(SubmitResponse {
        success: true,
        leaderboard,
    }))
}

/// The room's leaderboard, 404 for an unknown room.
async fn get_scores(
    State(coordinator): State<CoordinatorHandle>,
    Path(room_code): Path<String>,
) -> Result<Json<ScoresResponse>, ApiError> {
    let scores = coordinator.scores(&room_code).await?;
    Ok(Json(ScoresResponse { scores }))
}

/// The room's leaderboard, empty for an unknown room.
async fn get_leaderboard(
    State(coordinator): State<CoordinatorHandle>,
    Path(room_code): Path<String>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let leaderboard = coordinator.leaderboard(&room_code).await?;
    Ok(Json(LeaderboardResponse { leaderboard }))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
