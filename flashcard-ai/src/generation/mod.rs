//! Flashcard generation orchestrator
//!
//! Turns a block of source text into flashcard proposals through the
//! OpenRouter client, recording a `generations` row on success and an
//! `error_logs` row on failure.

use std::sync::Arc;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Result, ServiceError};
use crate::flashcards::FlashcardProposal;
use crate::services::openrouter::{
    ChatRequestBuilder, ModelParametersUpdate, OpenRouterClient, DEFAULT_MODEL,
};
use crate::storage::{Datastore, ERROR_LOGS_TABLE, GENERATIONS_TABLE};
use crate::util::{measure_time_async, text_hash, truncate_string};

/// Minimum accepted source text length, in characters
pub const MIN_SOURCE_TEXT_LENGTH: usize = 1000;

/// Maximum accepted source text length, in characters
pub const MAX_SOURCE_TEXT_LENGTH: usize = 10000;

/// Per-attempt timeout used for generation calls
pub const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 60_000;

const SYSTEM_PROMPT: &str = "You are an AI assistant specialized in creating high-quality flashcards from provided text.
Generate concise, clear, and effective flashcards that capture key concepts and knowledge.
Each flashcard should have a front (question/prompt) and back (answer/explanation).
Focus on important facts, definitions, concepts, and relationships.";

/// Settings for a `GenerationService`
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Owner of the recorded generations
    pub user_id: String,

    /// Model to request completions from
    pub model: String,
}

impl GenerationConfig {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Result of a successful generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationCreateResponse {
    pub generation_id: i64,
    pub flashcards_proposals: Vec<FlashcardProposal>,
    pub generated_count: usize,
}

/// Generates flashcard proposals and records each outcome
pub struct GenerationService {
    client: Arc<OpenRouterClient>,
    store: Arc<dyn Datastore>,
    config: GenerationConfig,
    template: ChatRequestBuilder,
}

impl GenerationService {
    pub fn new(
        client: Arc<OpenRouterClient>,
        store: Arc<dyn Datastore>,
        config: GenerationConfig,
    ) -> Result<Self> {
        if config.user_id.trim().is_empty() {
            return Err(ServiceError::configuration("User ID is required"));
        }

        let mut template = ChatRequestBuilder::new();
        template.set_model(
            config.model.clone(),
            Some(ModelParametersUpdate::default().temperature(0.7).top_p(1.0)),
        )?;
        template.set_system_message(SYSTEM_PROMPT)?;
        template.set_response_format(flashcards_schema())?;

        Ok(Self {
            client,
            store,
            config,
            template,
        })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate proposals for a source text
    pub async fn generate_flashcards(&self, source_text: &str) -> Result<GenerationCreateResponse> {
        validate_source_text(source_text)?;

        let source_text_hash = text_hash(source_text);
        let source_text_length = source_text.chars().count();

        let result = self
            .generate(source_text, &source_text_hash, source_text_length)
            .await;

        if let Err(ref err) = result {
            self.log_error(err, &source_text_hash, source_text_length).await;
        }
        result
    }

    async fn generate(
        &self,
        source_text: &str,
        source_text_hash: &str,
        source_text_length: usize,
    ) -> Result<GenerationCreateResponse> {
        let mut prompt = self.template.clone();
        prompt.set_user_message(format!(
            "Generate flashcards from the following text:\n\n{}",
            source_text
        ))?;

        let (reply, elapsed) =
            measure_time_async(|| self.client.send_chat_message(&prompt)).await;
        let proposals = parse_proposals(&reply?)?;
        let generated_count = proposals.len();

        let mut row = Map::new();
        row.insert("user_id".to_string(), Value::from(self.config.user_id.as_str()));
        row.insert("model".to_string(), Value::from(self.config.model.as_str()));
        row.insert("source_text_hash".to_string(), Value::from(source_text_hash));
        row.insert("source_text_length".to_string(), Value::from(source_text_length));
        row.insert("generated_count".to_string(), Value::from(generated_count));
        row.insert(
            "generation_duration".to_string(),
            Value::from(elapsed.as_millis() as u64),
        );

        let generation_id = self
            .store
            .insert(GENERATIONS_TABLE, vec![row])
            .await?
            .first()
            .and_then(|stored| stored.get("id"))
            .and_then(Value::as_i64)
            .ok_or_else(|| ServiceError::database("Generation insert returned no id"))?;

        info!(
            "Generation {} produced {} proposals in {}ms",
            generation_id,
            generated_count,
            elapsed.as_millis()
        );

        Ok(GenerationCreateResponse {
            generation_id,
            flashcards_proposals: proposals,
            generated_count,
        })
    }

    async fn log_error(&self, err: &ServiceError, source_text_hash: &str, source_text_length: usize) {
        let mut row = Map::new();
        row.insert("user_id".to_string(), Value::from(self.config.user_id.as_str()));
        row.insert("error_code".to_string(), Value::from(err.code()));
        row.insert("error_message".to_string(), Value::from(err.to_string()));
        row.insert("model".to_string(), Value::from(self.config.model.as_str()));
        row.insert("source_text_hash".to_string(), Value::from(source_text_hash));
        row.insert("source_text_length".to_string(), Value::from(source_text_length));

        match self.store.insert(ERROR_LOGS_TABLE, vec![row]).await {
            Ok(_) => debug!("Recorded generation failure [{}]", err.code()),
            Err(log_err) => error!(
                "Failed to record generation error [{}]: {}",
                err.code(),
                log_err
            ),
        }
    }
}

fn validate_source_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ServiceError::InvalidSourceText(
            "Source text cannot be empty".to_string(),
        ));
    }

    let length = text.chars().count();
    if !(MIN_SOURCE_TEXT_LENGTH..=MAX_SOURCE_TEXT_LENGTH).contains(&length) {
        return Err(ServiceError::InvalidSourceText(format!(
            "Source text must be between {} and {} characters, got {}",
            MIN_SOURCE_TEXT_LENGTH, MAX_SOURCE_TEXT_LENGTH, length
        )));
    }

    Ok(())
}

/// Parse the model's JSON reply into proposals
fn parse_proposals(content: &str) -> Result<Vec<FlashcardProposal>> {
    let invalid = |message: String| ServiceError::InvalidGenerationResponse(message);

    let body: Value = serde_json::from_str(content).map_err(|e| {
        invalid(format!(
            "reply is not valid JSON ({}): {}",
            e,
            truncate_string(content, 100)
        ))
    })?;

    let items = body
        .get("flashcards")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("reply is missing a flashcards array".to_string()))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let front = item.get("front").and_then(Value::as_str);
            let back = item.get("back").and_then(Value::as_str);
            match (front, back) {
                (Some(front), Some(back)) => Ok(FlashcardProposal::new(front, back)),
                _ => Err(invalid(format!(
                    "flashcards[{}] must have string front and back",
                    index
                ))),
            }
        })
        .collect()
}

fn flashcards_schema() -> Value {
    json!({
        "name": "flashcards",
        "schema": {
            "type": "object",
            "properties": {
                "flashcards": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "front": { "type": "string" },
                            "back": { "type": "string" }
                        },
                        "required": ["front", "back"]
                    }
                }
            },
            "required": ["flashcards"]
        }
    })
}
