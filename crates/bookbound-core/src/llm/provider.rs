//! LlmProvider trait definition.
//!
//! This is the core abstraction over the generation capability: a text
//! prompt or role-tagged turn sequence in, free-form text out. Uses native
//! async fn in traits (RPITIT); implementations live in bookbound-infra
//! (e.g., `GroqProvider`).

use bookbound_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for generation-capability backends.
///
/// Providers make no promise about the shape of the returned text; the
/// inference pipeline absorbs that unreliability at the extraction
/// boundary.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "groq").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
