//! Flashcard data transfer objects and their validation rules

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};
use crate::storage::SortOrder;

/// Maximum characters on the front of a card
pub const MAX_FRONT_LENGTH: usize = 200;

/// Maximum characters on the back of a card
pub const MAX_BACK_LENGTH: usize = 500;

/// Maximum cards per batch create
pub const MAX_BATCH_SIZE: usize = 50;

/// Maximum page size for listings
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Provenance of a flashcard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Source {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai-gen")]
    AiGenerated,
    #[serde(rename = "ai-gen-edited")]
    AiEdited,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::User => "user",
            Source::AiGenerated => "ai-gen",
            Source::AiEdited => "ai-gen-edited",
        }
    }

    /// Whether cards of this source must reference a generation
    pub fn is_ai(&self) -> bool {
        !matches!(self, Source::User)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Source::User),
            "ai-gen" => Ok(Source::AiGenerated),
            "ai-gen-edited" => Ok(Source::AiEdited),
            other => Err(ServiceError::validation(format!("Unknown flashcard source: {}", other))),
        }
    }
}

/// An AI-suggested flashcard pending user acceptance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlashcardProposal {
    pub front: String,
    pub back: String,
    /// Always `ai-gen`
    pub source: Source,
}

impl FlashcardProposal {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            source: Source::AiGenerated,
        }
    }
}

/// A stored flashcard as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flashcard {
    pub id: i64,
    pub front: String,
    pub back: String,
    pub source: Source,
    pub generation_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// One card of a batch create
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateFlashcardRequest {
    pub front: String,
    pub back: String,
    pub source: Source,
    #[serde(default)]
    pub generation_id: Option<i64>,
}

impl CreateFlashcardRequest {
    pub fn validate(&self) -> Result<()> {
        check_length("front", &self.front, MAX_FRONT_LENGTH)?;
        check_length("back", &self.back, MAX_BACK_LENGTH)?;

        match (self.source.is_ai(), self.generation_id) {
            (true, None) => Err(ServiceError::validation(
                "generation_id is required for AI-generated flashcards",
            )),
            (false, Some(_)) => Err(ServiceError::validation(
                "generation_id must not be provided for user-created flashcards",
            )),
            _ => Ok(()),
        }
    }
}

/// Batch create command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateFlashcardsRequest {
    pub flashcards: Vec<CreateFlashcardRequest>,
}

impl CreateFlashcardsRequest {
    pub fn validate(&self) -> Result<()> {
        if self.flashcards.is_empty() {
            return Err(ServiceError::validation("At least one flashcard is required"));
        }
        if self.flashcards.len() > MAX_BATCH_SIZE {
            return Err(ServiceError::validation(format!(
                "Maximum {} flashcards allowed per request",
                MAX_BATCH_SIZE
            )));
        }
        for (index, card) in self.flashcards.iter().enumerate() {
            card.validate()
                .map_err(|e| ServiceError::validation(format!("flashcards[{}]: {}", index, e)))?;
        }
        Ok(())
    }
}

/// Partial update of a card's text
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateFlashcardRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back: Option<String>,
}

impl UpdateFlashcardRequest {
    pub fn validate(&self) -> Result<()> {
        if self.front.is_none() && self.back.is_none() {
            return Err(ServiceError::validation(
                "At least one of 'front' or 'back' must be provided",
            ));
        }
        if let Some(ref front) = self.front {
            check_length("front", front, MAX_FRONT_LENGTH)?;
        }
        if let Some(ref back) = self.back {
            check_length("back", back, MAX_BACK_LENGTH)?;
        }
        Ok(())
    }
}

fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(ServiceError::validation(format!(
            "{} content cannot exceed {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Columns a listing can be sorted by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Front,
    Back,
    Source,
    GenerationId,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Front => "front",
            SortField::Back => "back",
            SortField::Source => "source",
            SortField::GenerationId => "generation_id",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

/// Listing parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListFlashcardsQuery {
    /// Page number, starting from 1
    pub page: u32,
    /// Items per page, 1..=100
    pub limit: u32,
    pub sort: SortField,
    #[serde(with = "sort_order_serde")]
    pub order: SortOrder,
    pub source: Option<Source>,
    pub generation_id: Option<i64>,
}

impl Default for ListFlashcardsQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            sort: SortField::default(),
            order: SortOrder::Asc,
            source: None,
            generation_id: None,
        }
    }
}

impl ListFlashcardsQuery {
    pub fn validate(&self) -> Result<()> {
        if self.page < 1 {
            return Err(ServiceError::validation("page must be at least 1"));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&self.limit) {
            return Err(ServiceError::validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        if let Some(id) = self.generation_id {
            if id <= 0 {
                return Err(ServiceError::validation("generation_id must be positive"));
            }
        }
        Ok(())
    }

    /// Offset of the first row of the requested page
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }
}

mod sort_order_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::storage::SortOrder;

    pub fn serialize<S: Serializer>(order: &SortOrder, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SortOrder, D::Error> {
        match String::deserialize(deserializer)?.as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(serde::de::Error::unknown_variant(other, &["asc", "desc"])),
        }
    }
}

/// Pagination details of a listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
}

/// A page of flashcards
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlashcardsListResponse {
    pub data: Vec<Flashcard>,
    pub pagination: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn card(source: Source, generation_id: Option<i64>) -> CreateFlashcardRequest {
        CreateFlashcardRequest {
            front: "Q".to_string(),
            back: "A".to_string(),
            source,
            generation_id,
        }
    }

    #[test]
    fn test_source_serialization() {
        assert_eq!(serde_json::to_value(Source::AiEdited).unwrap(), json!("ai-gen-edited"));
        assert_eq!("ai-gen".parse::<Source>().unwrap(), Source::AiGenerated);
        assert!("robot".parse::<Source>().is_err());
    }

    #[test]
    fn test_generation_id_rules() {
        assert!(card(Source::User, None).validate().is_ok());
        assert!(card(Source::User, Some(1)).validate().is_err());
        assert!(card(Source::AiGenerated, None).validate().is_err());
        assert!(card(Source::AiEdited, Some(3)).validate().is_ok());
    }

    #[test]
    fn test_length_limits() {
        let mut long = card(Source::User, None);
        long.front = "x".repeat(MAX_FRONT_LENGTH);
        assert!(long.validate().is_ok());
        long.front.push('x');
        assert!(long.validate().is_err());

        let mut long_back = card(Source::User, None);
        long_back.back = "y".repeat(MAX_BACK_LENGTH + 1);
        assert!(long_back.validate().is_err());
    }

    #[test]
    fn test_batch_size() {
        let empty = CreateFlashcardsRequest { flashcards: vec![] };
        assert!(empty.validate().is_err());

        let full = CreateFlashcardsRequest {
            flashcards: vec![card(Source::User, None); MAX_BATCH_SIZE],
        };
        assert!(full.validate().is_ok());

        let over = CreateFlashcardsRequest {
            flashcards: vec![card(Source::User, None); MAX_BATCH_SIZE + 1],
        };
        assert!(over.validate().is_err());
    }

    #[test]
    fn test_update_requires_a_field() {
        assert!(UpdateFlashcardRequest::default().validate().is_err());
        let update = UpdateFlashcardRequest {
            back: Some("new".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_list_query_defaults_and_bounds() {
        let query: ListFlashcardsQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(query, ListFlashcardsQuery::default());
        assert_eq!(query.offset(), 0);

        let query: ListFlashcardsQuery =
            serde_json::from_value(json!({ "page": 3, "limit": 20, "sort": "front", "order": "desc" }))
                .unwrap();
        assert_eq!(query.offset(), 40);
        assert_eq!(query.sort, SortField::Front);
        assert_eq!(query.order, SortOrder::Desc);

        let bad = ListFlashcardsQuery {
            limit: 101,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = ListFlashcardsQuery {
            page: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
