//! LibraryRepository trait definition.
//!
//! Persistence boundary for books and characters. Id issuance belongs to
//! the implementation: every create returns the new row's id synchronously
//! from the insert itself, never derived from a separately re-queried
//! counter that could race with concurrent inserts.

use bookbound_types::book::{Book, Character};
use bookbound_types::error::RepositoryError;

/// Repository trait for book and character persistence.
///
/// Implementations live in bookbound-infra (e.g., `SqliteLibraryRepository`).
/// Uses native async fn in traits (RPITIT).
pub trait LibraryRepository: Send + Sync {
    /// Create a book, returning its id.
    fn create_book(
        &self,
        title: &str,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    /// Create a character under a book, returning its id. The id is
    /// usable for message storage the moment this returns.
    fn create_character(
        &self,
        book_id: i64,
        name: &str,
        traits: &str,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    /// Fetch a book by id.
    fn get_book(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Book>, RepositoryError>> + Send;

    /// Fetch a character by id.
    fn get_character(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Character>, RepositoryError>> + Send;

    /// Characters of a book in creation order.
    fn list_characters(
        &self,
        book_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Character>, RepositoryError>> + Send;
}
