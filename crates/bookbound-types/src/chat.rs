//! Message and turn types for Bookbound.
//!
//! Messages form an append-only per-(user, character) log: immutable once
//! stored, totally ordered by their rowid, which equals insertion order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::psyche::{AffectState, PsychState};

/// Who authored a message: the human user or the simulated character.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('user', 'character'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Character,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Character => write!(f, "character"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "character" => Ok(MessageRole::Character),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A message as persisted in the history store.
///
/// `id` is the monotonically increasing sequence identity assigned at
/// insert time; chronological order within a (user, character) scope is
/// exactly ascending id order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub user_id: String,
    pub character_id: i64,
    pub role: MessageRole,
    pub content: String,
    /// Affect snapshot recorded with character-authored replies, for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affect: Option<AffectState>,
    pub created_at: DateTime<Utc>,
}

/// A message about to be appended; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub user_id: String,
    pub character_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub affect: Option<AffectState>,
}

/// A chronological slice of a character's history.
///
/// When `limit` cuts the read short, the oldest rows are kept and
/// `truncated` is set so a capped read is never silent.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub messages: Vec<StoredMessage>,
    pub truncated: bool,
}

/// One full turn request: user message in, character reply out.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user_id: String,
    pub character_id: i64,
    pub message: String,
    /// Live (not yet persisted) conversation turns supplied by the client,
    /// replayed verbatim ahead of the current message in stage three.
    pub session_turns: Vec<crate::llm::Turn>,
}

/// The successful outcome of a turn, as returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReply {
    pub reply: String,
    pub traits: String,
    pub parameters: PsychState,
    pub emotions: AffectState,
}
