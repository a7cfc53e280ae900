//! Flashcard CRUD on top of the `Datastore`
//!
//! Every operation is scoped to a user id; rows owned by another user are
//! reported as not found.

mod models;

pub use models::*;

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use log::{debug, warn};
use serde_json::{Map, Value};

use crate::error::{Result, ServiceError};
use crate::storage::{Datastore, Query, Row, FLASHCARDS_TABLE, GENERATIONS_TABLE};

/// Service for managing flashcards
pub struct FlashcardService {
    store: Arc<dyn Datastore>,
}

impl FlashcardService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Create a batch of flashcards for a user
    ///
    /// All cards are validated and every referenced generation must exist
    /// before anything is written.
    pub async fn create_batch(
        &self,
        user_id: &str,
        request: CreateFlashcardsRequest,
    ) -> Result<Vec<Flashcard>> {
        require_user(user_id)?;
        request.validate()?;

        let generation_ids: Vec<i64> = request
            .flashcards
            .iter()
            .filter_map(|card| card.generation_id)
            .collect();
        self.validate_generation_ids(&generation_ids).await?;

        let rows = request
            .flashcards
            .into_iter()
            .map(|card| {
                let mut row = Map::new();
                row.insert("front".to_string(), Value::from(card.front));
                row.insert("back".to_string(), Value::from(card.back));
                row.insert("source".to_string(), Value::from(card.source.as_str()));
                row.insert(
                    "generation_id".to_string(),
                    card.generation_id.map(Value::from).unwrap_or(Value::Null),
                );
                row.insert("user_id".to_string(), Value::from(user_id));
                row
            })
            .collect();

        let stored = self.store.insert(FLASHCARDS_TABLE, rows).await?;
        debug!("Created {} flashcards for user {}", stored.len(), user_id);

        stored.into_iter().map(row_to_flashcard).collect()
    }

    /// Check that every generation id exists
    pub async fn validate_generation_ids(&self, generation_ids: &[i64]) -> Result<()> {
        if generation_ids.is_empty() {
            return Ok(());
        }

        let mut unique = generation_ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let page = self
            .store
            .select(GENERATIONS_TABLE, &Query::new().id_in(unique.iter().copied()))
            .await?;

        if page.total != unique.len() {
            warn!(
                "Rejected flashcards referencing unknown generations ({} of {} found)",
                page.total,
                unique.len()
            );
            return Err(ServiceError::InvalidGenerationId(
                "One or more generation_ids do not exist".to_string(),
            ));
        }

        Ok(())
    }

    /// Paginated, filtered, sorted listing of a user's flashcards
    pub async fn list(
        &self,
        user_id: &str,
        query: &ListFlashcardsQuery,
    ) -> Result<FlashcardsListResponse> {
        require_user(user_id)?;
        query.validate()?;

        let offset = query.offset();
        let mut select = Query::new()
            .eq("user_id", user_id)
            .order_by(query.sort.column(), query.order)
            .range(offset, offset + query.limit as usize - 1);

        if let Some(source) = query.source {
            select = select.eq("source", source.as_str());
        }
        if let Some(generation_id) = query.generation_id {
            select = select.eq("generation_id", generation_id);
        }

        let page = self.store.select(FLASHCARDS_TABLE, &select).await?;
        let data = page
            .rows
            .into_iter()
            .map(row_to_flashcard)
            .collect::<Result<Vec<_>>>()?;

        Ok(FlashcardsListResponse {
            data,
            pagination: PaginationMeta {
                page: query.page,
                limit: query.limit,
                total: page.total,
            },
        })
    }

    /// Fetch one flashcard owned by the user
    pub async fn get(&self, user_id: &str, id: i64) -> Result<Flashcard> {
        require_user(user_id)?;
        let row = self.find_owned(user_id, id).await?;
        row_to_flashcard(row)
    }

    /// Update a card's text; AI-generated cards become `ai-gen-edited`
    pub async fn update(
        &self,
        user_id: &str,
        id: i64,
        request: UpdateFlashcardRequest,
    ) -> Result<Flashcard> {
        require_user(user_id)?;
        request.validate()?;

        let current = row_to_flashcard(self.find_owned(user_id, id).await?)?;
        let source = match current.source {
            Source::AiGenerated => Source::AiEdited,
            other => other,
        };

        let mut patch = Map::new();
        if let Some(front) = request.front {
            patch.insert("front".to_string(), Value::from(front));
        }
        if let Some(back) = request.back {
            patch.insert("back".to_string(), Value::from(back));
        }
        patch.insert("source".to_string(), Value::from(source.as_str()));
        patch.insert(
            "updated_at".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        );

        let updated = self
            .store
            .update(FLASHCARDS_TABLE, &owned_query(user_id, id), patch)
            .await?;

        updated
            .into_iter()
            .next()
            .ok_or_else(|| not_found(id))
            .and_then(row_to_flashcard)
    }

    /// Delete a card owned by the user
    pub async fn delete(&self, user_id: &str, id: i64) -> Result<()> {
        require_user(user_id)?;
        self.find_owned(user_id, id).await?;

        let removed = self.store.delete(FLASHCARDS_TABLE, &owned_query(user_id, id)).await?;
        if removed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn find_owned(&self, user_id: &str, id: i64) -> Result<Row> {
        self.store
            .select(FLASHCARDS_TABLE, &owned_query(user_id, id))
            .await?
            .rows
            .into_iter()
            .next()
            .ok_or_else(|| not_found(id))
    }
}

fn require_user(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(ServiceError::validation("User ID is required"));
    }
    Ok(())
}

fn owned_query(user_id: &str, id: i64) -> Query {
    Query::new().eq("id", id).eq("user_id", user_id)
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::not_found(format!("Flashcard {} not found or access denied", id))
}

/// Convert a stored row to the response DTO, dropping `user_id`
fn row_to_flashcard(mut row: Row) -> Result<Flashcard> {
    row.remove("user_id");
    serde_json::from_value(Value::Object(row))
        .map_err(|e| ServiceError::database(format!("Malformed flashcard row: {}", e)))
}
