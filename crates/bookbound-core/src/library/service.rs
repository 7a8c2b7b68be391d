//! Character extraction from source text.
//!
//! One generation call over a capped slice of the source, then a
//! line-oriented parse of `Name: traits` pairs with a JSON-array
//! fallback. Document-to-text conversion is a collaborator's job; this
//! service consumes plain text.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use bookbound_types::book::{BookWithCharacters, Character};
use bookbound_types::config::PipelineConfig;
use bookbound_types::error::{LibraryError, RepositoryError};
use bookbound_types::llm::CompletionRequest;

use crate::llm::box_provider::BoxLlmProvider;

use super::repository::LibraryRepository;

/// Upper bound on source text fed into the extraction prompt.
const MAX_SOURCE_CHARS: usize = 15_000;

/// A character as parsed from generation output, before persistence.
#[derive(Debug, Deserialize, PartialEq)]
struct ParsedCharacter {
    name: String,
    traits: String,
}

/// Extracts a book's character roster from source text and persists it.
pub struct LibraryService<L: LibraryRepository> {
    library: L,
    provider: Arc<BoxLlmProvider>,
    config: PipelineConfig,
}

impl<L: LibraryRepository> LibraryService<L> {
    pub fn new(library: L, provider: Arc<BoxLlmProvider>, config: PipelineConfig) -> Self {
        Self {
            library,
            provider,
            config,
        }
    }

    /// Access the library repository.
    pub fn library_repo(&self) -> &L {
        &self.library
    }

    /// Extract characters from `text`, create the book, and insert each
    /// character. Every insert returns its id synchronously, so the
    /// returned roster is immediately usable for message storage.
    #[tracing::instrument(name = "extract_characters", skip_all, fields(title = %title))]
    pub async fn extract_from_text(
        &self,
        title: &str,
        text: &str,
    ) -> Result<BookWithCharacters, LibraryError> {
        let capped: String = text.chars().take(MAX_SOURCE_CHARS).collect();
        let prompt = format!(
            "Extract all characters from the following text and provide their names and key traits, one per line as 'Name: traits':\n\n{capped}"
        );

        let request = CompletionRequest::from_prompt(
            &self.config.model,
            prompt,
            self.config.max_tokens,
            self.config.temperature,
        );
        let deadline = self.config.generation_timeout;
        let response = match tokio::time::timeout(deadline, self.provider.complete(&request)).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(LibraryError::Timeout {
                    waited_ms: deadline.as_millis() as u64,
                });
            }
        };

        let mut parsed = parse_character_lines(&response.content);
        if parsed.is_empty() {
            warn!("no 'Name: traits' lines parsed; trying JSON array fallback");
            parsed = parse_character_array(&response.content);
        }
        if parsed.is_empty() {
            return Err(LibraryError::NoCharactersFound);
        }

        let book_id = self.library.create_book(title).await?;
        let mut characters = Vec::with_capacity(parsed.len());
        for candidate in parsed {
            let id = self
                .library
                .create_character(book_id, &candidate.name, &candidate.traits)
                .await?;
            characters.push(Character {
                id,
                book_id,
                name: candidate.name,
                traits: candidate.traits,
            });
        }

        let book = self
            .library
            .get_book(book_id)
            .await?
            .ok_or(LibraryError::Storage(RepositoryError::NotFound))?;

        info!(count = characters.len(), book_id, "characters extracted");
        Ok(BookWithCharacters { book, characters })
    }
}

/// Parse `Name: traits` lines, tolerating `1.`-style list numbering on
/// the name.
fn parse_character_lines(text: &str) -> Vec<ParsedCharacter> {
    let mut characters = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((name_part, traits_part)) = line.split_once(':') else {
            continue;
        };
        // Strip "1."-style list numbering, but leave honorifics like
        // "Mr. Darcy" alone.
        let name = match name_part.trim().split_once('.') {
            Some((prefix, rest))
                if !prefix.trim().is_empty()
                    && prefix.trim().chars().all(|c| c.is_ascii_digit()) =>
            {
                rest.trim()
            }
            _ => name_part.trim(),
        };
        let traits = traits_part.trim();
        if name.is_empty() || traits.is_empty() {
            continue;
        }
        characters.push(ParsedCharacter {
            name: name.to_string(),
            traits: traits.to_string(),
        });
    }
    characters
}

/// Fallback for models that answer with a JSON array of
/// `{"name": ..., "traits": ...}` objects instead of lines.
fn parse_character_array(text: &str) -> Vec<ParsedCharacter> {
    let Some(start) = text.find('[') else {
        return Vec::new();
    };
    let Some(end) = text.rfind(']').filter(|&end| end > start) else {
        return Vec::new();
    };
    serde_json::from_str::<Vec<ParsedCharacter>>(&text[start..=end]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;

    use bookbound_types::book::Book;
    use bookbound_types::llm::{CompletionResponse, LlmError, Usage};

    use crate::llm::provider::LlmProvider;

    struct MemoryLibraryRepo {
        next_id: AtomicI64,
        books: Mutex<Vec<Book>>,
        characters: Mutex<Vec<Character>>,
    }

    impl MemoryLibraryRepo {
        fn new() -> Self {
            Self {
                next_id: AtomicI64::new(1),
                books: Mutex::new(Vec::new()),
                characters: Mutex::new(Vec::new()),
            }
        }
    }

    impl LibraryRepository for &MemoryLibraryRepo {
        async fn create_book(&self, title: &str) -> Result<i64, RepositoryError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.books.lock().unwrap().push(Book {
                id,
                title: title.to_string(),
                created_at: Utc::now(),
            });
            Ok(id)
        }

        async fn create_character(
            &self,
            book_id: i64,
            name: &str,
            traits: &str,
        ) -> Result<i64, RepositoryError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.characters.lock().unwrap().push(Character {
                id,
                book_id,
                name: name.to_string(),
                traits: traits.to_string(),
            });
            Ok(id)
        }

        async fn get_book(&self, id: i64) -> Result<Option<Book>, RepositoryError> {
            Ok(self.books.lock().unwrap().iter().find(|b| b.id == id).cloned())
        }

        async fn get_character(&self, id: i64) -> Result<Option<Character>, RepositoryError> {
            Ok(self
                .characters
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == id)
                .cloned())
        }

        async fn list_characters(&self, book_id: i64) -> Result<Vec<Character>, RepositoryError> {
            Ok(self
                .characters
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.book_id == book_id)
                .cloned()
                .collect())
        }
    }

    struct OneShotProvider {
        replies: Mutex<VecDeque<String>>,
    }

    impl OneShotProvider {
        fn new(reply: &str) -> Self {
            Self {
                replies: Mutex::new(VecDeque::from([reply.to_string()])),
            }
        }
    }

    impl LlmProvider for OneShotProvider {
        fn name(&self) -> &str {
            "oneshot"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            let content = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::Provider {
                    message: "script exhausted".to_string(),
                })?;
            Ok(CompletionResponse {
                content,
                model: request.model.clone(),
                usage: Usage::default(),
            })
        }
    }

    #[test]
    fn test_parse_lines_with_numbering_and_colons_in_traits() {
        let parsed = parse_character_lines(
            "Here are the characters:\n1. Elinor: stoic, guarded\nMr. Darcy: proud, loyal\nMarianne: passionate; motto: feel everything\n\nnot a character line",
        );
        // The bare header line has no traits after its colon and is skipped.
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].name, "Elinor");
        assert_eq!(parsed[0].traits, "stoic, guarded");
        assert_eq!(parsed[1].name, "Mr. Darcy");
        assert_eq!(parsed[2].name, "Marianne");
        assert_eq!(parsed[2].traits, "passionate; motto: feel everything");
    }

    #[test]
    fn test_parse_json_array_fallback() {
        let parsed = parse_character_array(
            "I'd structure it as JSON: [{\"name\": \"Elinor\", \"traits\": \"stoic\"}, {\"name\": \"Marianne\", \"traits\": \"passionate\"}] -- done",
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "Elinor");
        assert_eq!(parsed[1].traits, "passionate");
    }

    #[test]
    fn test_parse_array_absent() {
        assert!(parse_character_array("no structured data here").is_empty());
    }

    #[tokio::test]
    async fn test_extraction_creates_book_and_distinct_ids() {
        let repo = MemoryLibraryRepo::new();
        let provider = Arc::new(BoxLlmProvider::new(OneShotProvider::new(
            "Elinor: stoic, guarded\nMarianne: passionate",
        )));
        let svc = LibraryService::new(&repo, provider, PipelineConfig::default());

        let result = svc
            .extract_from_text("Sense and Sensibility", "It is a truth...")
            .await
            .unwrap();

        assert_eq!(result.book.title, "Sense and Sensibility");
        assert_eq!(result.characters.len(), 2);
        assert_ne!(result.characters[0].id, result.characters[1].id);
        assert!(result.characters.iter().all(|c| c.book_id == result.book.id));

        // Ids are stable and immediately queryable.
        let fetched = (&repo)
            .get_character(result.characters[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.name, "Elinor");
    }

    #[tokio::test]
    async fn test_unusable_output_creates_nothing() {
        let repo = MemoryLibraryRepo::new();
        let provider = Arc::new(BoxLlmProvider::new(OneShotProvider::new(
            "I could not find any characters",
        )));
        let svc = LibraryService::new(&repo, provider, PipelineConfig::default());

        let err = svc.extract_from_text("Empty", "...").await.unwrap_err();
        assert!(matches!(err, LibraryError::NoCharactersFound));
        assert!(repo.books.lock().unwrap().is_empty());
    }
}
