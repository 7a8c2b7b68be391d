//! The turn endpoint: one user message in, one in-character reply out.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use bookbound_types::chat::{TurnReply, TurnRequest};
use bookbound_types::llm::Turn;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for running a turn.
#[derive(Debug, Deserialize)]
pub struct RunTurnRequest {
    /// Caller-chosen user identity; scopes the message log.
    pub user_id: String,
    /// The user's current message.
    pub message: String,
    /// Live (unpersisted) conversation turns, replayed before the current
    /// message in response generation.
    #[serde(default)]
    pub session_turns: Vec<Turn>,
}

/// POST /api/v1/characters/{id}/turns - Run one full turn.
///
/// On success the user message and the generated reply are both
/// persisted; on any failure history is untouched and the error payload
/// names the failing stage.
pub async fn run_turn(
    State(state): State<AppState>,
    Path(character_id): Path<i64>,
    Json(body): Json<RunTurnRequest>,
) -> Result<Json<ApiResponse<TurnReply>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let reply = state
        .turn_service
        .run_turn(TurnRequest {
            user_id: body.user_id,
            character_id,
            message: body.message,
            session_turns: body.session_turns,
        })
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(reply, request_id, elapsed)))
}
