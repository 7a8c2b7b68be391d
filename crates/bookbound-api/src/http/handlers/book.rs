//! Book extraction and read endpoints.
//!
//! Document-to-text conversion happens upstream; these endpoints consume
//! already-extracted plain text.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use bookbound_core::library::repository::LibraryRepository;
use bookbound_types::book::BookWithCharacters;
use bookbound_types::error::RepositoryError;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for character extraction.
#[derive(Debug, Deserialize)]
pub struct ExtractBookRequest {
    /// Book title; recorded as-is.
    pub title: String,
    /// Plain text of the source document.
    pub text: String,
}

/// POST /api/v1/books - Extract characters from source text and create
/// the book.
pub async fn extract_book(
    State(state): State<AppState>,
    Json(body): Json<ExtractBookRequest>,
) -> Result<Json<ApiResponse<BookWithCharacters>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if body.title.trim().is_empty() {
        return Err(AppError::Validation("title is required".to_string()));
    }
    if body.text.trim().is_empty() {
        return Err(AppError::Validation("text is required".to_string()));
    }

    let result = state
        .library_service
        .extract_from_text(&body.title, &body.text)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(result, request_id, elapsed)))
}

/// GET /api/v1/books/{id} - A book with its character roster.
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<BookWithCharacters>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let book = state
        .library_repo
        .get_book(id)
        .await?
        .ok_or(AppError::Repository(RepositoryError::NotFound))?;
    let characters = state.library_repo.list_characters(id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        BookWithCharacters { book, characters },
        request_id,
        elapsed,
    )))
}
