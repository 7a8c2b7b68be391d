//! SQLite message repository implementation.
//!
//! Implements `MessageRepository` from `bookbound-core` using sqlx with
//! split read/write pools. The log is append-only: no UPDATE or DELETE
//! statements exist here. Each insert returns the new rowid via
//! RETURNING, and a completed turn's two inserts share one transaction.

use bookbound_core::chat::repository::MessageRepository;
use bookbound_types::chat::{HistoryPage, MessageRole, NewMessage, StoredMessage};
use bookbound_types::error::RepositoryError;
use bookbound_types::psyche::AffectState;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn message_from_row(row: &SqliteRow) -> Result<StoredMessage, RepositoryError> {
    let role_str: String = row
        .try_get("role")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let role: MessageRole = role_str
        .parse()
        .map_err(|e: String| RepositoryError::Query(e))?;

    let affect_json: Option<String> = row
        .try_get("affect")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let affect: Option<AffectState> = affect_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| RepositoryError::Query(format!("invalid affect JSON: {e}")))?;

    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    Ok(StoredMessage {
        id: row
            .try_get("id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        user_id: row
            .try_get("user_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        character_id: row
            .try_get("character_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        role,
        content: row
            .try_get("content")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        affect,
        created_at: parse_datetime(&created_at)?,
    })
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn affect_to_json(affect: &Option<AffectState>) -> Result<Option<String>, RepositoryError> {
    affect
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| RepositoryError::Query(format!("serialize affect: {e}")))
}

const INSERT_MESSAGE: &str = r#"INSERT INTO messages
   (user_id, character_id, role, content, affect, created_at)
   VALUES (?, ?, ?, ?, ?, ?)
   RETURNING id"#;

// ---------------------------------------------------------------------------
// MessageRepository impl
// ---------------------------------------------------------------------------

impl MessageRepository for SqliteMessageRepository {
    async fn append(&self, message: &NewMessage) -> Result<i64, RepositoryError> {
        let affect_json = affect_to_json(&message.affect)?;

        let id: i64 = sqlx::query_scalar(INSERT_MESSAGE)
            .bind(&message.user_id)
            .bind(message.character_id)
            .bind(message.role.to_string())
            .bind(&message.content)
            .bind(&affect_json)
            .bind(Utc::now().to_rfc3339())
            .fetch_one(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(id)
    }

    async fn append_turn(
        &self,
        user_message: &NewMessage,
        reply: &NewMessage,
    ) -> Result<(i64, i64), RepositoryError> {
        let user_affect = affect_to_json(&user_message.affect)?;
        let reply_affect = affect_to_json(&reply.affect)?;
        let now = Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let user_id: i64 = sqlx::query_scalar(INSERT_MESSAGE)
            .bind(&user_message.user_id)
            .bind(user_message.character_id)
            .bind(user_message.role.to_string())
            .bind(&user_message.content)
            .bind(&user_affect)
            .bind(&now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let reply_id: i64 = sqlx::query_scalar(INSERT_MESSAGE)
            .bind(&reply.user_id)
            .bind(reply.character_id)
            .bind(reply.role.to_string())
            .bind(&reply.content)
            .bind(&reply_affect)
            .bind(&now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok((user_id, reply_id))
    }

    async fn list_chronological(
        &self,
        character_id: i64,
        limit: u32,
    ) -> Result<HistoryPage, RepositoryError> {
        // Fetch one extra row so a capped read is detectable.
        let rows = sqlx::query(
            r#"SELECT * FROM messages
               WHERE character_id = ?
               ORDER BY id ASC
               LIMIT ?"#,
        )
        .bind(character_id)
        .bind(limit as i64 + 1)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let truncated = rows.len() > limit as usize;
        let mut messages = Vec::with_capacity(rows.len().min(limit as usize));
        for row in rows.iter().take(limit as usize) {
            messages.push(message_from_row(row)?);
        }

        Ok(HistoryPage {
            messages,
            truncated,
        })
    }

    async fn count_for_character(&self, character_id: i64) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE character_id = ?")
            .bind(character_id)
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(count as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
