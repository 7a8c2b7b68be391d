//! Book and character types for Bookbound.
//!
//! A book is created once per extraction request and owns an ordered
//! collection of characters. Characters are immutable after creation
//! except by explicit re-extraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A source book from which characters were extracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// A character extracted from a book.
///
/// The numeric id is assigned by the persistence layer at insert time and
/// is stable from the moment `create_character` returns -- callers can use
/// it for message storage immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub book_id: i64,
    pub name: String,
    /// Free-text trait description, e.g. "stoic, guarded".
    pub traits: String,
}

/// A book together with its extracted characters, as returned by the
/// extraction service and the book read endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookWithCharacters {
    pub book: Book,
    pub characters: Vec<Character>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_serde_roundtrip() {
        let character = Character {
            id: 7,
            book_id: 1,
            name: "Elinor".to_string(),
            traits: "stoic, guarded".to_string(),
        };
        let json = serde_json::to_string(&character).unwrap();
        let parsed: Character = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, 7);
        assert_eq!(parsed.name, "Elinor");
        assert_eq!(parsed.traits, "stoic, guarded");
    }
}
