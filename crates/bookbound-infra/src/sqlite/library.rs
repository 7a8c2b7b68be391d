//! SQLite library repository implementation.
//!
//! Implements `LibraryRepository` from `bookbound-core`. Every create
//! returns the new rowid from the INSERT's own RETURNING clause, so ids
//! are correct even when extraction requests for different books
//! interleave on the shared writer.

use bookbound_core::library::repository::LibraryRepository;
use bookbound_types::book::{Book, Character};
use bookbound_types::error::RepositoryError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `LibraryRepository`.
pub struct SqliteLibraryRepository {
    pool: DatabasePool,
}

impl SqliteLibraryRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn character_from_row(row: &SqliteRow) -> Result<Character, RepositoryError> {
    Ok(Character {
        id: row
            .try_get("id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        book_id: row
            .try_get("book_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        name: row
            .try_get("name")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
        traits: row
            .try_get("traits")
            .map_err(|e| RepositoryError::Query(e.to_string()))?,
    })
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

impl LibraryRepository for SqliteLibraryRepository {
    async fn create_book(&self, title: &str) -> Result<i64, RepositoryError> {
        let id: i64 =
            sqlx::query_scalar("INSERT INTO books (title, created_at) VALUES (?, ?) RETURNING id")
                .bind(title)
                .bind(Utc::now().to_rfc3339())
                .fetch_one(&self.pool.writer)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(id)
    }

    async fn create_character(
        &self,
        book_id: i64,
        name: &str,
        traits: &str,
    ) -> Result<i64, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO characters (book_id, name, traits) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(book_id)
        .bind(name)
        .bind(traits)
        .fetch_one(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(id)
    }

    async fn get_book(&self, id: i64) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM books WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| {
            let created_at: String = row
                .try_get("created_at")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            Ok(Book {
                id: row
                    .try_get("id")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                title: row
                    .try_get("title")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                created_at: parse_datetime(&created_at)?,
            })
        })
        .transpose()
    }

    async fn get_character(&self, id: i64) -> Result<Option<Character>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM characters WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(character_from_row).transpose()
    }

    async fn list_characters(&self, book_id: i64) -> Result<Vec<Character>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM characters WHERE book_id = ? ORDER BY id ASC")
            .bind(book_id)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut characters = Vec::with_capacity(rows.len());
        for row in &rows {
            characters.push(character_from_row(row)?);
        }
        Ok(characters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_book_and_characters_returns_stable_ids() {
        let pool = test_pool().await;
        let repo = SqliteLibraryRepository::new(pool);

        let book_id = repo.create_book("Sense and Sensibility").await.unwrap();
        let elinor = repo
            .create_character(book_id, "Elinor", "stoic, guarded")
            .await
            .unwrap();
        let marianne = repo
            .create_character(book_id, "Marianne", "passionate")
            .await
            .unwrap();

        assert_ne!(elinor, marianne);

        let fetched = repo.get_character(elinor).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Elinor");
        assert_eq!(fetched.book_id, book_id);

        let roster = repo.list_characters(book_id).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].name, "Elinor");
        assert_eq!(roster[1].name, "Marianne");
    }

    #[tokio::test]
    async fn test_concurrent_creation_for_different_books() {
        let pool = test_pool().await;
        let repo = std::sync::Arc::new(SqliteLibraryRepository::new(pool));

        let repo_a = std::sync::Arc::clone(&repo);
        let repo_b = std::sync::Arc::clone(&repo);

        let (a, b) = tokio::join!(
            async move {
                let book = repo_a.create_book("Book A").await.unwrap();
                repo_a.create_character(book, "A1", "t").await.unwrap()
            },
            async move {
                let book = repo_b.create_book("Book B").await.unwrap();
                repo_b.create_character(book, "B1", "t").await.unwrap()
            }
        );

        // Interleaved inserts still yield distinct, immediately usable ids.
        assert_ne!(a, b);
        let a_char = repo.get_character(a).await.unwrap().unwrap();
        let b_char = repo.get_character(b).await.unwrap().unwrap();
        assert_eq!(a_char.name, "A1");
        assert_eq!(b_char.name, "B1");
        assert_ne!(a_char.book_id, b_char.book_id);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let pool = test_pool().await;
        let repo = SqliteLibraryRepository::new(pool);

        assert!(repo.get_book(42).await.unwrap().is_none());
        assert!(repo.get_character(42).await.unwrap().is_none());
    }
}
