//! MessageRepository trait definition.
//!
//! The append-only per-character history store. Implementations live in
//! bookbound-infra (e.g., `SqliteMessageRepository`). Uses native async
//! fn in traits (RPITIT).

use bookbound_types::chat::{HistoryPage, NewMessage};
use bookbound_types::error::RepositoryError;

/// Repository trait for the append-only message log.
///
/// Appends are atomic per call: a message's content and role commit
/// together or not at all. Messages are never updated or deleted.
pub trait MessageRepository: Send + Sync {
    /// Append one message, returning its sequence id synchronously from
    /// the insert itself.
    fn append(
        &self,
        message: &NewMessage,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    /// Append a completed turn: the user message then the character
    /// reply, as one unit. Both commit or neither does.
    fn append_turn(
        &self,
        user_message: &NewMessage,
        reply: &NewMessage,
    ) -> impl std::future::Future<Output = Result<(i64, i64), RepositoryError>> + Send;

    /// Messages for a character ordered oldest first. When `limit` cuts
    /// the read short, the oldest rows are kept and the page's
    /// `truncated` flag is set.
    fn list_chronological(
        &self,
        character_id: i64,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<HistoryPage, RepositoryError>> + Send;

    /// Total stored messages for a character.
    fn count_for_character(
        &self,
        character_id: i64,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
