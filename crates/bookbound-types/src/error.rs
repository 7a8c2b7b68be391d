//! Error taxonomy for Bookbound.
//!
//! Pipeline-internal failures are caught at the stage boundary and
//! converted into one terminal, stage-tagged [`TurnError`] per turn. A
//! failed turn leaves history unchanged, so callers may safely resubmit
//! the identical request.

use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in
/// bookbound-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// No usable JSON object could be located in generation output.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no JSON object found in generation output")]
    NoJsonObject,

    #[error("candidate span is not a JSON object: {0}")]
    Unparsable(String),
}

/// A located JSON object does not satisfy the expected field schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' has the wrong type (expected {expected})")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field '{field}' value {value} outside valid range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Why a single pipeline stage failed. Wrapped in a stage-tagged
/// [`TurnError`] variant before reaching the caller.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("generation call timed out after {waited_ms}ms")]
    Timeout { waited_ms: u64 },
}

/// Terminal error for one turn, tagged with the failing stage so callers
/// can distinguish "unusable output at stage two" from "stage three".
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("character {0} not found")]
    CharacterNotFound(i64),

    #[error("parameter inference failed: {0}")]
    ParameterInference(#[source] StageError),

    #[error("affect inference failed: {0}")]
    AffectInference(#[source] StageError),

    #[error("response generation failed: {0}")]
    ResponseGeneration(#[source] StageError),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl TurnError {
    /// Name of the failing pipeline stage, when one is implicated.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            TurnError::ParameterInference(_) => Some("parameter_inference"),
            TurnError::AffectInference(_) => Some("affect_inference"),
            TurnError::ResponseGeneration(_) => Some("response_generation"),
            _ => None,
        }
    }
}

/// Errors from character extraction over a source text.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("no characters could be parsed from generation output")]
    NoCharactersFound,

    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("extraction call timed out after {waited_ms}ms")]
    Timeout { waited_ms: u64 },

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_error_stage_tags() {
        let err = TurnError::AffectInference(StageError::Extraction(ExtractionError::NoJsonObject));
        assert_eq!(err.stage(), Some("affect_inference"));
        assert!(err.to_string().contains("affect inference failed"));

        let err = TurnError::InputValidation("message is empty".to_string());
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::OutOfRange {
            field: "joy",
            value: 9,
            min: 1,
            max: 5,
        };
        assert_eq!(err.to_string(), "field 'joy' value 9 outside valid range 1..=5");
    }

    #[test]
    fn test_stage_error_from_extraction() {
        let err: StageError = ExtractionError::NoJsonObject.into();
        assert!(matches!(err, StageError::Extraction(_)));
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }
}
