//! Turn service: one full request/response cycle per call.
//!
//! Validates input before any generation call, builds the bounded past
//! context, drives the three-stage pipeline, and persists the completed
//! turn as a unit. A failed turn leaves history exactly as it was, so
//! callers may resubmit the identical request.

use std::sync::Arc;

use tracing::{debug, info};

use bookbound_types::chat::{MessageRole, NewMessage, TurnReply, TurnRequest};
use bookbound_types::config::PipelineConfig;
use bookbound_types::error::TurnError;

use crate::infer::pipeline::{InferencePipeline, PipelineInput};
use crate::library::repository::LibraryRepository;
use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::context_window::ContextWindow;

use super::repository::MessageRepository;

/// How many stored messages to fetch before budgeting. The context
/// window rarely keeps this many; the cap exists to bound the read.
const HISTORY_FETCH_LIMIT: u32 = 200;

/// Orchestrates turns end to end.
///
/// Generic over `MessageRepository` and `LibraryRepository` so
/// bookbound-core never depends on bookbound-infra.
pub struct TurnService<M: MessageRepository, L: LibraryRepository> {
    messages: M,
    library: L,
    provider: Arc<BoxLlmProvider>,
    config: PipelineConfig,
}

impl<M: MessageRepository, L: LibraryRepository> TurnService<M, L> {
    pub fn new(
        messages: M,
        library: L,
        provider: Arc<BoxLlmProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            messages,
            library,
            provider,
            config,
        }
    }

    /// Access the message repository.
    pub fn message_repo(&self) -> &M {
        &self.messages
    }

    /// Run one turn: validate, infer, persist.
    ///
    /// Persistence happens only after all three stages succeed; any
    /// failure (including cancellation of this future) writes nothing.
    #[tracing::instrument(
        name = "run_turn",
        skip_all,
        fields(character_id = request.character_id)
    )]
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnReply, TurnError> {
        self.validate(&request)?;

        let character = self
            .library
            .get_character(request.character_id)
            .await?
            .ok_or(TurnError::CharacterNotFound(request.character_id))?;

        let page = self
            .messages
            .list_chronological(request.character_id, HISTORY_FETCH_LIMIT)
            .await?;
        if page.truncated {
            debug!(
                limit = HISTORY_FETCH_LIMIT,
                "history read capped before budgeting"
            );
        }

        let window = ContextWindow::assemble(&page.messages, self.config.context_budget_tokens);
        debug!(
            kept = window.messages().len(),
            estimated_tokens = window.estimated_tokens(),
            "context window assembled"
        );

        let pipeline = InferencePipeline::new(self.provider.as_ref(), &self.config);
        let input = PipelineInput {
            character: &character,
            context: &window,
            user_message: &request.message,
            session_turns: &request.session_turns,
        };
        let outcome = pipeline.run(&input).await?;

        let user_message = NewMessage {
            user_id: request.user_id.clone(),
            character_id: request.character_id,
            role: MessageRole::User,
            content: request.message.clone(),
            affect: None,
        };
        let reply_message = NewMessage {
            user_id: request.user_id.clone(),
            character_id: request.character_id,
            role: MessageRole::Character,
            content: outcome.reply.clone(),
            affect: Some(outcome.affect),
        };
        self.messages
            .append_turn(&user_message, &reply_message)
            .await?;

        info!(character = %character.name, "turn committed");
        Ok(TurnReply {
            reply: outcome.reply,
            traits: character.traits,
            parameters: outcome.psych,
            emotions: outcome.affect,
        })
    }

    /// Reject unusable input before the first generation call.
    fn validate(&self, request: &TurnRequest) -> Result<(), TurnError> {
        if request.user_id.trim().is_empty() {
            return Err(TurnError::InputValidation("user id is required".to_string()));
        }
        if request.message.trim().is_empty() {
            return Err(TurnError::InputValidation("message is empty".to_string()));
        }
        if request.message.len() > self.config.max_user_message_chars {
            return Err(TurnError::InputValidation(format!(
                "message exceeds {} characters",
                self.config.max_user_message_chars
            )));
        }
        Ok(())
    }
}
