//! Message history read endpoint.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use bookbound_core::chat::repository::MessageRepository;
use bookbound_types::chat::HistoryPage;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for message history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum messages to return (default 200). When the cap is hit the
    /// response's `truncated` flag is set.
    #[serde(default = "default_history_limit")]
    pub limit: u32,
}

fn default_history_limit() -> u32 {
    200
}

/// GET /api/v1/characters/{id}/messages - Chronological message history.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(character_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<HistoryPage>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let page = state
        .message_repo
        .list_chronological(character_id, query.limit)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(page, request_id, elapsed)))
}
