//! Token-budgeted context windows over stored history.
//!
//! Converts a chronological message list into a truncated window that
//! respects an estimated-token cap. The estimate is a cheap length proxy,
//! NOT an exact tokenizer count: downstream consumers must treat it as an
//! approximation. The only load-bearing guarantees are monotonicity
//! (longer text never costs less) and that the window is a contiguous
//! chronological suffix of the input.

use bookbound_types::chat::{MessageRole, StoredMessage};

/// Fixed overhead charged per message for its role prefix when rendered
/// into a prompt transcript.
const ROLE_OVERHEAD_TOKENS: u32 = 2;

/// Estimate the token cost of a piece of text.
///
/// Length proxy: one token per four bytes, minimum one. Deterministic and
/// monotone in text length; not tied to any specific tokenizer.
pub fn estimate_tokens(text: &str) -> u32 {
    ((text.len() / 4).max(1)) as u32
}

fn message_cost(message: &StoredMessage) -> u32 {
    estimate_tokens(&message.content) + ROLE_OVERHEAD_TOKENS
}

/// A bounded, ordered subsequence of a character's message history.
///
/// Recomputed per turn, never cached. Always a contiguous suffix of the
/// input: the window never includes an older message while excluding a
/// newer one that was kept.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    messages: Vec<StoredMessage>,
    estimated_tokens: u32,
}

impl ContextWindow {
    /// Build a window from chronological history (oldest first) under a
    /// token budget.
    ///
    /// Scans from newest to oldest, accumulating while the running total
    /// stays within budget, and stops the moment the next-older message
    /// would exceed it. An empty window (single newest message already
    /// over budget) is valid, not an error.
    pub fn assemble(history: &[StoredMessage], budget_tokens: u32) -> Self {
        let mut total = 0u32;
        let mut start = history.len();

        for message in history.iter().rev() {
            let cost = message_cost(message);
            if total + cost > budget_tokens {
                break;
            }
            total += cost;
            start -= 1;
        }

        Self {
            messages: history[start..].to_vec(),
            estimated_tokens: total,
        }
    }

    /// The kept messages, oldest first.
    pub fn messages(&self) -> &[StoredMessage] {
        &self.messages
    }

    /// Sum of estimated costs of the kept messages.
    pub fn estimated_tokens(&self) -> u32 {
        self.estimated_tokens
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Render the window as a prompt transcript, one line per message.
    ///
    /// User lines are prefixed `User:`, character lines with the
    /// character's display name.
    pub fn render(&self, character_name: &str) -> String {
        let lines: Vec<String> = self
            .messages
            .iter()
            .map(|m| match m.role {
                MessageRole::User => format!("User: {}", m.content),
                MessageRole::Character => format!("{}: {}", character_name, m.content),
            })
            .collect();
        lines.join("\n")
    }
}
