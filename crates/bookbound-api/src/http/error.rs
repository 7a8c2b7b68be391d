//! Application error type mapping to HTTP status codes and envelope format.
//!
//! A failed turn returns a single error payload identifying the failing
//! stage and cause; history is left unchanged, so the caller may safely
//! resubmit the identical request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use bookbound_types::error::{LibraryError, RepositoryError, TurnError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Turn pipeline errors (stage-tagged).
    Turn(TurnError),
    /// Character extraction errors.
    Library(LibraryError),
    /// Direct repository access errors (read endpoints).
    Repository(RepositoryError),
    /// Request shape errors caught at the handler.
    Validation(String),
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        AppError::Turn(e)
    }
}

impl From<LibraryError> for AppError {
    fn from(e: LibraryError) -> Self {
        AppError::Library(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, stage) = match &self {
            AppError::Turn(e @ TurnError::InputValidation(_)) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                e.to_string(),
                None,
            ),
            AppError::Turn(TurnError::CharacterNotFound(id)) => (
                StatusCode::NOT_FOUND,
                "CHARACTER_NOT_FOUND",
                format!("Character {id} not found"),
                None,
            ),
            AppError::Turn(e @ TurnError::ParameterInference(_)) => (
                StatusCode::BAD_GATEWAY,
                "PARAMETER_INFERENCE_FAILED",
                e.to_string(),
                e.stage(),
            ),
            AppError::Turn(e @ TurnError::AffectInference(_)) => (
                StatusCode::BAD_GATEWAY,
                "AFFECT_INFERENCE_FAILED",
                e.to_string(),
                e.stage(),
            ),
            AppError::Turn(e @ TurnError::ResponseGeneration(_)) => (
                StatusCode::BAD_GATEWAY,
                "RESPONSE_GENERATION_FAILED",
                e.to_string(),
                e.stage(),
            ),
            AppError::Turn(e @ TurnError::Storage(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                e.to_string(),
                None,
            ),
            AppError::Library(e @ LibraryError::NoCharactersFound) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NO_CHARACTERS_FOUND",
                e.to_string(),
                None,
            ),
            AppError::Library(e @ LibraryError::Timeout { .. }) => (
                StatusCode::GATEWAY_TIMEOUT,
                "EXTRACTION_TIMEOUT",
                e.to_string(),
                None,
            ),
            AppError::Library(e @ LibraryError::Generation(_)) => (
                StatusCode::BAD_GATEWAY,
                "EXTRACTION_FAILED",
                e.to_string(),
                None,
            ),
            AppError::Library(e @ LibraryError::Storage(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                e.to_string(),
                None,
            ),
            AppError::Repository(RepositoryError::NotFound) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Not found".to_string(),
                None,
            ),
            AppError::Repository(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                e.to_string(),
                None,
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
        };

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
                "stage": stage,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookbound_types::error::{ExtractionError, StageError};

    #[test]
    fn test_stage_tagged_errors_map_to_bad_gateway() {
        let err = AppError::Turn(TurnError::AffectInference(StageError::Extraction(
            ExtractionError::NoJsonObject,
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = AppError::Turn(TurnError::InputValidation("message is empty".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_character_not_found_maps_to_404() {
        let err = AppError::Turn(TurnError::CharacterNotFound(9));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
