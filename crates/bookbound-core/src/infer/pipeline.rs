//! The three-stage turn inference state machine.
//!
//! `AwaitingParams -> AwaitingAffect -> AwaitingResponse -> Done`, with
//! failure terminal from any stage. Each stage makes exactly one
//! generation call (under a mandatory deadline), and stages one and two
//! push the raw output through the structured extractor. The three calls
//! run strictly sequentially: every stage's prompt depends on the prior
//! stage's parsed output.
//!
//! No stage retries; a failure aborts the turn with a single error tagged
//! with the failing stage. Persistence is the caller's job and happens
//! only after `Done`.

use tracing::debug;

use bookbound_types::book::Character;
use bookbound_types::chat::MessageRole;
use bookbound_types::config::PipelineConfig;
use bookbound_types::error::{StageError, TurnError};
use bookbound_types::llm::{CompletionRequest, Turn};
use bookbound_types::psyche::{AffectState, PsychState, AFFECT_RANGE, PSYCH_RANGE};

use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::context_window::ContextWindow;

use super::extract::{extract_json_object, integer_field, FieldSpec, FieldType, Schema};
use super::prompt;

/// Expected shape of stage-one output: six integers in 1..=7.
const PSYCH_SCHEMA: Schema = Schema {
    fields: &[
        FieldSpec {
            name: "valence",
            ty: FieldType::Integer {
                range: Some(PSYCH_RANGE),
            },
        },
        FieldSpec {
            name: "arousal",
            ty: FieldType::Integer {
                range: Some(PSYCH_RANGE),
            },
        },
        FieldSpec {
            name: "selection_threshold",
            ty: FieldType::Integer {
                range: Some(PSYCH_RANGE),
            },
        },
        FieldSpec {
            name: "resolution",
            ty: FieldType::Integer {
                range: Some(PSYCH_RANGE),
            },
        },
        FieldSpec {
            name: "goal_directedness",
            ty: FieldType::Integer {
                range: Some(PSYCH_RANGE),
            },
        },
        FieldSpec {
            name: "securing_rate",
            ty: FieldType::Integer {
                range: Some(PSYCH_RANGE),
            },
        },
    ],
};

/// Expected shape of stage-two output: three integers in 1..=5.
const AFFECT_SCHEMA: Schema = Schema {
    fields: &[
        FieldSpec {
            name: "anger",
            ty: FieldType::Integer {
                range: Some(AFFECT_RANGE),
            },
        },
        FieldSpec {
            name: "sadness",
            ty: FieldType::Integer {
                range: Some(AFFECT_RANGE),
            },
        },
        FieldSpec {
            name: "joy",
            ty: FieldType::Integer {
                range: Some(AFFECT_RANGE),
            },
        },
    ],
};

/// Everything a turn's inference needs, borrowed from the caller.
#[derive(Debug)]
pub struct PipelineInput<'a> {
    pub character: &'a Character,
    /// Bounded past context from stored history.
    pub context: &'a ContextWindow,
    pub user_message: &'a str,
    /// Live session turns replayed before the user message in stage three.
    pub session_turns: &'a [Turn],
}

/// What the pipeline yields on `Done`.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub psych: PsychState,
    pub affect: AffectState,
}

/// Pipeline progress. Each stage's structured output rides along in the
/// state so the next stage can depend on it.
enum PipelineState {
    AwaitingParams,
    AwaitingAffect {
        psych: PsychState,
    },
    AwaitingResponse {
        psych: PsychState,
        affect: AffectState,
    },
    Done(TurnOutcome),
}

/// Drives one turn's three generation calls.
pub struct InferencePipeline<'a> {
    provider: &'a BoxLlmProvider,
    config: &'a PipelineConfig,
}

impl<'a> InferencePipeline<'a> {
    pub fn new(provider: &'a BoxLlmProvider, config: &'a PipelineConfig) -> Self {
        Self { provider, config }
    }

    /// Run the state machine to completion.
    #[tracing::instrument(
        name = "infer_turn",
        skip_all,
        fields(character_id = input.character.id)
    )]
    pub async fn run(&self, input: &PipelineInput<'_>) -> Result<TurnOutcome, TurnError> {
        let transcript = input.context.render(&input.character.name);
        let mut state = PipelineState::AwaitingParams;

        loop {
            match self.step(state, input, &transcript).await? {
                PipelineState::Done(outcome) => return Ok(outcome),
                next => state = next,
            }
        }
    }

    /// Advance the state machine by one stage.
    async fn step(
        &self,
        state: PipelineState,
        input: &PipelineInput<'_>,
        transcript: &str,
    ) -> Result<PipelineState, TurnError> {
        match state {
            PipelineState::AwaitingParams => {
                let prompt = prompt::parameter_prompt(
                    &input.character.traits,
                    transcript,
                    input.user_message,
                );
                let raw = self
                    .generate_from_prompt(prompt)
                    .await
                    .map_err(TurnError::ParameterInference)?;
                let psych = parse_psych(&raw).map_err(TurnError::ParameterInference)?;
                debug!(?psych, "parameter inference complete");
                Ok(PipelineState::AwaitingAffect { psych })
            }

            PipelineState::AwaitingAffect { psych } => {
                let prompt =
                    prompt::affect_prompt(&input.character.traits, &psych, input.user_message);
                let raw = self
                    .generate_from_prompt(prompt)
                    .await
                    .map_err(TurnError::AffectInference)?;
                let affect = parse_affect(&raw).map_err(TurnError::AffectInference)?;
                debug!(?affect, "affect inference complete");
                Ok(PipelineState::AwaitingResponse { psych, affect })
            }

            PipelineState::AwaitingResponse { psych, affect } => {
                let instruction = prompt::response_instruction(
                    &input.character.name,
                    &input.character.traits,
                    transcript,
                    &affect,
                );

                // Full ordered sequence: session turns as given, then the
                // user message as the final turn.
                let mut turns = Vec::with_capacity(input.session_turns.len() + 1);
                turns.extend_from_slice(input.session_turns);
                turns.push(Turn {
                    role: MessageRole::User,
                    content: input.user_message.to_string(),
                });

                let request = CompletionRequest::from_turns(
                    &self.config.model,
                    instruction,
                    turns,
                    self.config.max_tokens,
                    self.config.temperature,
                );
                let reply = self
                    .generate(request)
                    .await
                    .map_err(TurnError::ResponseGeneration)?;
                debug!(reply_chars = reply.len(), "response generation complete");
                Ok(PipelineState::Done(TurnOutcome {
                    reply,
                    psych,
                    affect,
                }))
            }

            done @ PipelineState::Done(_) => Ok(done),
        }
    }

    async fn generate_from_prompt(&self, prompt: String) -> Result<String, StageError> {
        let request = CompletionRequest::from_prompt(
            &self.config.model,
            prompt,
            self.config.max_tokens,
            self.config.temperature,
        );
        self.generate(request).await
    }

    /// One generation call under the mandatory per-call deadline. A
    /// timeout is handled exactly like unusable output for the stage.
    async fn generate(&self, request: CompletionRequest) -> Result<String, StageError> {
        let deadline = self.config.generation_timeout;
        match tokio::time::timeout(deadline, self.provider.complete(&request)).await {
            Ok(Ok(response)) => Ok(response.content),
            Ok(Err(e)) => Err(StageError::Provider(e)),
            Err(_) => Err(StageError::Timeout {
                waited_ms: deadline.as_millis() as u64,
            }),
        }
    }
}

fn parse_psych(raw: &str) -> Result<PsychState, StageError> {
    let map = extract_json_object(raw)?;
    PSYCH_SCHEMA.validate(&map)?;
    Ok(PsychState {
        valence: integer_field(&map, "valence")? as u8,
        arousal: integer_field(&map, "arousal")? as u8,
        selection_threshold: integer_field(&map, "selection_threshold")? as u8,
        resolution: integer_field(&map, "resolution")? as u8,
        goal_directedness: integer_field(&map, "goal_directedness")? as u8,
        securing_rate: integer_field(&map, "securing_rate")? as u8,
    })
}

fn parse_affect(raw: &str) -> Result<AffectState, StageError> {
    let map = extract_json_object(raw)?;
    AFFECT_SCHEMA.validate(&map)?;
    Ok(AffectState {
        anger: integer_field(&map, "anger")? as u8,
        sadness: integer_field(&map, "sadness")? as u8,
        joy: integer_field(&map, "joy")? as u8,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use bookbound_types::error::{ExtractionError, SchemaError};
    use bookbound_types::llm::{CompletionResponse, LlmError, Usage};

    use crate::llm::provider::LlmProvider;

    /// Provider that replays scripted responses and records every request
    /// in a shared log the test keeps a handle to.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<String>>,
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> (Self, Arc<Mutex<Vec<CompletionRequest>>>) {
            let requests = Arc::new(Mutex::new(Vec::new()));
            let provider = Self {
                replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
                requests: Arc::clone(&requests),
            };
            (provider, requests)
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
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

    /// Provider that never answers in time.
    struct StalledProvider;

    impl LlmProvider for StalledProvider {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
            unreachable!("sleep outlives every test deadline")
        }
    }

    fn character() -> Character {
        Character {
            id: 1,
            book_id: 1,
            name: "Elinor".to_string(),
            traits: "stoic, guarded".to_string(),
        }
    }

    const PSYCH_JSON: &str = r#"Here you go:
{"valence": 5, "arousal": 3, "selection_threshold": 4, "resolution": 6, "goal_directedness": 5, "securing_rate": 2}"#;

    const AFFECT_JSON: &str = r#"{"anger": 1, "sadness": 2, "joy": 4}"#;

    #[tokio::test]
    async fn test_happy_path_yields_outcome() {
        let (scripted, _requests) =
            ScriptedProvider::new(&[PSYCH_JSON, AFFECT_JSON, "I... thank you."]);
        let provider = BoxLlmProvider::new(scripted);
        let config = PipelineConfig::default();
        let pipeline = InferencePipeline::new(&provider, &config);

        let character = character();
        let window = ContextWindow::assemble(&[], config.context_budget_tokens);
        let input = PipelineInput {
            character: &character,
            context: &window,
            user_message: "I forgive you.",
            session_turns: &[],
        };

        let outcome = pipeline.run(&input).await.unwrap();
        assert_eq!(outcome.reply, "I... thank you.");
        assert_eq!(outcome.psych.valence, 5);
        assert_eq!(
            outcome.affect,
            AffectState {
                anger: 1,
                sadness: 2,
                joy: 4
            }
        );
    }

    #[tokio::test]
    async fn test_stages_run_in_order_with_expected_shapes() {
        let (scripted, requests) = ScriptedProvider::new(&[PSYCH_JSON, AFFECT_JSON, "reply"]);
        let provider = BoxLlmProvider::new(scripted);
        let config = PipelineConfig::default();
        let pipeline = InferencePipeline::new(&provider, &config);

        let character = character();
        let window = ContextWindow::assemble(&[], config.context_budget_tokens);
        let session_turns = vec![Turn {
            role: MessageRole::Character,
            content: "as I said".to_string(),
        }];
        let input = PipelineInput {
            character: &character,
            context: &window,
            user_message: "and now?",
            session_turns: &session_turns,
        };

        pipeline.run(&input).await.unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 3);

        // Stages one and two: single-string prompt shape, no instruction.
        assert!(requests[0].system.is_none());
        assert_eq!(requests[0].turns.len(), 1);
        assert!(requests[0].turns[0].content.contains("Psi Theory"));
        assert!(requests[1].system.is_none());
        assert!(requests[1].turns[0].content.contains("anger"));

        // Stage three: instruction + session turn + user message, in order.
        assert!(
            requests[2]
                .system
                .as_deref()
                .unwrap()
                .contains("You are Elinor")
        );
        assert_eq!(requests[2].turns.len(), 2);
        assert_eq!(requests[2].turns[0].role, MessageRole::Character);
        assert_eq!(requests[2].turns[0].content, "as I said");
        assert_eq!(requests[2].turns[1].role, MessageRole::User);
        assert_eq!(requests[2].turns[1].content, "and now?");
    }

    #[tokio::test]
    async fn test_affect_stage_failure_is_stage_tagged() {
        let (scripted, _requests) = ScriptedProvider::new(&[PSYCH_JSON, "I cannot comply."]);
        let provider = BoxLlmProvider::new(scripted);
        let config = PipelineConfig::default();
        let pipeline = InferencePipeline::new(&provider, &config);

        let character = character();
        let window = ContextWindow::assemble(&[], config.context_budget_tokens);
        let input = PipelineInput {
            character: &character,
            context: &window,
            user_message: "hello",
            session_turns: &[],
        };

        let err = pipeline.run(&input).await.unwrap_err();
        assert!(matches!(
            err,
            TurnError::AffectInference(StageError::Extraction(ExtractionError::NoJsonObject))
        ));
        assert_eq!(err.stage(), Some("affect_inference"));
    }

    #[tokio::test]
    async fn test_out_of_range_parameter_is_a_data_quality_error() {
        let bad_psych = r#"{"valence": 9, "arousal": 3, "selection_threshold": 4, "resolution": 6, "goal_directedness": 5, "securing_rate": 2}"#;
        let (scripted, _requests) = ScriptedProvider::new(&[bad_psych]);
        let provider = BoxLlmProvider::new(scripted);
        let config = PipelineConfig::default();
        let pipeline = InferencePipeline::new(&provider, &config);

        let character = character();
        let window = ContextWindow::assemble(&[], config.context_budget_tokens);
        let input = PipelineInput {
            character: &character,
            context: &window,
            user_message: "hello",
            session_turns: &[],
        };

        let err = pipeline.run(&input).await.unwrap_err();
        assert!(matches!(
            err,
            TurnError::ParameterInference(StageError::Schema(SchemaError::OutOfRange {
                field: "valence",
                value: 9,
                ..
            }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_aborts_the_stage() {
        let provider = BoxLlmProvider::new(StalledProvider);
        let config = PipelineConfig {
            generation_timeout: Duration::from_secs(5),
            ..PipelineConfig::default()
        };
        let pipeline = InferencePipeline::new(&provider, &config);

        let character = character();
        let window = ContextWindow::assemble(&[], config.context_budget_tokens);
        let input = PipelineInput {
            character: &character,
            context: &window,
            user_message: "hello",
            session_turns: &[],
        };

        let err = pipeline.run(&input).await.unwrap_err();
        assert!(matches!(
            err,
            TurnError::ParameterInference(StageError::Timeout { waited_ms: 5_000 })
        ));
    }
}
