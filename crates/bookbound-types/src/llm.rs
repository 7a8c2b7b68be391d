//! Generation-capability request/response types for Bookbound.
//!
//! The generation capability is an opaque function from a prompt (or an
//! ordered list of role-tagged turns) to free-form text. These types model
//! both invocation shapes: stages one and two of the turn pipeline use a
//! single prompt string, stage three sends a full turn sequence.

use serde::{Deserialize, Serialize};

use crate::chat::MessageRole;

/// A single role-tagged turn in a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
}

/// Request to the generation capability.
///
/// `system` carries a leading instruction that providers send out-of-band
/// from the conversation turns, so the capability can distinguish
/// instruction from dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub turns: Vec<Turn>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl CompletionRequest {
    /// The single-string invocation shape: one user turn, no instruction.
    pub fn from_prompt(model: &str, prompt: String, max_tokens: u32, temperature: f64) -> Self {
        Self {
            model: model.to_string(),
            system: None,
            turns: vec![Turn {
                role: MessageRole::User,
                content: prompt,
            }],
            max_tokens,
            temperature: Some(temperature),
        }
    }

    /// The role-tagged sequence shape: a leading instruction followed by
    /// conversation turns in their given order.
    pub fn from_turns(
        model: &str,
        system: String,
        turns: Vec<Turn>,
        max_tokens: u32,
        temperature: f64,
    ) -> Self {
        Self {
            model: model.to_string(),
            system: Some(system),
            turns,
            max_tokens,
            temperature: Some(temperature),
        }
    }
}

/// Token usage reported by the provider for one completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Response from the generation capability: free-form text, nothing more
/// is guaranteed about its shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: Usage,
}

/// Errors from generation-capability providers.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
