//! Runtime configuration for the turn pipeline.

use std::time::Duration;

/// Tunables for one turn of the inference pipeline.
///
/// `context_budget_tokens` bounds the *estimated* token cost of past
/// history included in prompts; the estimate is a length proxy, not an
/// exact tokenizer count (see `bookbound_core::llm::context_window`).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model identifier passed to the generation capability.
    pub model: String,
    /// Budget for past-history context, in estimated tokens.
    pub context_budget_tokens: u32,
    /// Mandatory per-call deadline for every generation invocation.
    pub generation_timeout: Duration,
    /// Upper bound on user message length, enforced before any generation
    /// call.
    pub max_user_message_chars: usize,
    /// Output cap forwarded to the provider.
    pub max_tokens: u32,
    /// Sampling temperature forwarded to the provider.
    pub temperature: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            context_budget_tokens: 4_000,
            generation_timeout: Duration::from_secs(60),
            max_user_message_chars: 10_000,
            max_tokens: 1_024,
            temperature: 0.7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.context_budget_tokens, 4_000);
        assert_eq!(config.max_user_message_chars, 10_000);
        assert!(config.generation_timeout >= Duration::from_secs(1));
    }
}
