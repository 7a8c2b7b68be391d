//! Shared application state for the HTTP API.

use std::sync::Arc;

use anyhow::Context;
use secrecy::SecretString;

use bookbound_core::chat::service::TurnService;
use bookbound_core::library::service::LibraryService;
use bookbound_core::llm::box_provider::BoxLlmProvider;
use bookbound_infra::llm::groq::GroqProvider;
use bookbound_infra::sqlite::library::SqliteLibraryRepository;
use bookbound_infra::sqlite::message::SqliteMessageRepository;
use bookbound_infra::sqlite::pool::{default_database_url, DatabasePool};
use bookbound_types::config::PipelineConfig;

/// Everything handlers need, cheaply cloneable.
#[derive(Clone)]
pub struct AppState {
    pub turn_service: Arc<TurnService<SqliteMessageRepository, SqliteLibraryRepository>>,
    pub library_service: Arc<LibraryService<SqliteLibraryRepository>>,
    pub library_repo: Arc<SqliteLibraryRepository>,
    pub message_repo: Arc<SqliteMessageRepository>,
}

impl AppState {
    /// Initialize database, provider, and services from the environment.
    ///
    /// Required: `GROQ_API_KEY`. Optional: `BOOKBOUND_DATA_DIR` (default
    /// `~/.bookbound`), `BOOKBOUND_MODEL`.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = std::env::var("BOOKBOUND_DATA_DIR").unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            format!("{home}/.bookbound")
        });
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data dir {data_dir}"))?;

        let pool = DatabasePool::new(&default_database_url())
            .await
            .context("failed to open database")?;
        tracing::info!(data_dir = %data_dir, "database ready");

        let api_key = std::env::var("GROQ_API_KEY")
            .context("GROQ_API_KEY environment variable not set")?;
        let mut config = PipelineConfig::default();
        if let Ok(model) = std::env::var("BOOKBOUND_MODEL") {
            config.model = model;
        }

        let provider = Arc::new(BoxLlmProvider::new(GroqProvider::new(
            SecretString::from(api_key),
            config.model.clone(),
        )));

        let turn_service = Arc::new(TurnService::new(
            SqliteMessageRepository::new(pool.clone()),
            SqliteLibraryRepository::new(pool.clone()),
            Arc::clone(&provider),
            config.clone(),
        ));
        let library_service = Arc::new(LibraryService::new(
            SqliteLibraryRepository::new(pool.clone()),
            provider,
            config,
        ));

        Ok(Self {
            turn_service,
            library_service,
            library_repo: Arc::new(SqliteLibraryRepository::new(pool.clone())),
            message_repo: Arc::new(SqliteMessageRepository::new(pool)),
        })
    }
}
