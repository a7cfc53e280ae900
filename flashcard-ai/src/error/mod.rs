//! Error handling for flashcard-ai
//!
//! This module provides a single error type that:
//! - Names every failure the client, orchestrator and storage can surface
//! - Carries a machine-readable code separate from the human message
//! - Classifies errors as transient (retried) or terminal
//! - Provides convenient Result type alias

use thiserror::Error;

pub mod mapping;

/// Result type for flashcard-ai operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for flashcard-ai
#[derive(Error, Debug)]
pub enum ServiceError {
    /// System message was empty or whitespace-only
    #[error("System message cannot be empty")]
    InvalidSystemMessage,

    /// User message was empty or whitespace-only
    #[error("User message cannot be empty")]
    InvalidUserMessage,

    /// Response format schema was not a JSON object
    #[error("Invalid JSON schema provided: {0}")]
    InvalidResponseFormat(String),

    /// Model name was empty or whitespace-only
    #[error("Model name cannot be empty")]
    InvalidModelName,

    /// A send was attempted before a user message was set
    #[error("User message is required")]
    MissingUserMessage,

    /// Outbound payload or inbound response failed shape validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// A single attempt exceeded the configured timeout
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Upstream answered with a non-2xx status
    #[error("API error: {status}: {body}")]
    Api { status: u16, body: String },

    /// Connection, transport or body decoding failure
    #[error("Network error: {0}")]
    Network(String),

    /// 2xx response without any choices
    #[error("No response received from the model")]
    EmptyResponse,

    /// Retry budget exhausted
    #[error("Failed after {attempts} attempts: {message}")]
    MaxRetriesExceeded { attempts: u32, message: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source text rejected before generation
    #[error("Invalid source text: {0}")]
    InvalidSourceText(String),

    /// Model output could not be turned into flashcard proposals
    #[error("Invalid generation response: {0}")]
    InvalidGenerationResponse(String),

    /// Flashcards referenced a generation that does not exist
    #[error("Invalid generation IDs: {0}")]
    InvalidGenerationId(String),

    /// Resource not found (or not owned by the caller)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Datastore failure
    #[error("Database error: {0}")]
    Database(String),
}

impl ServiceError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::Network(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Create an API error from a non-2xx response
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        ServiceError::Api {
            status,
            body: body.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    /// Create a database error
    pub fn database(message: impl Into<String>) -> Self {
        ServiceError::Database(message.into())
    }

    /// Machine-readable error code, stable across message wording changes
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidSystemMessage => "INVALID_SYSTEM_MESSAGE",
            ServiceError::InvalidUserMessage => "INVALID_USER_MESSAGE",
            ServiceError::InvalidResponseFormat(_) => "INVALID_RESPONSE_FORMAT",
            ServiceError::InvalidModelName => "INVALID_MODEL_NAME",
            ServiceError::MissingUserMessage => "MISSING_USER_MESSAGE",
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::Timeout { .. } => "TIMEOUT_ERROR",
            ServiceError::Api { .. } => "API_ERROR",
            ServiceError::Network(_) => "NETWORK_ERROR",
            ServiceError::EmptyResponse => "EMPTY_RESPONSE",
            ServiceError::MaxRetriesExceeded { .. } => "MAX_RETRIES_EXCEEDED",
            ServiceError::Configuration(_) => "CONFIGURATION_ERROR",
            ServiceError::InvalidSourceText(_) => "INVALID_SOURCE_TEXT",
            ServiceError::InvalidGenerationResponse(_) => "INVALID_GENERATION_RESPONSE",
            ServiceError::InvalidGenerationId(_) => "INVALID_GENERATION_ID",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// HTTP-equivalent status carried by the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::Timeout { .. } => Some(408),
            ServiceError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this is a retryable error
    ///
    /// Only HTTP-level failures are transient. Timeouts are terminal: a hung
    /// upstream is not expected to recover within the same request budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Api { .. } | ServiceError::Network(_))
    }

    /// Check if this is a permanent error (not retryable)
    pub fn is_permanent(&self) -> bool {
        !self.is_retryable()
    }
}

/// Convert reqwest errors to ServiceError
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ServiceError::configuration(format!("Invalid request: {}", err))
        } else if err.is_connect() {
            ServiceError::network(format!("Connection error: {}", err))
        } else if err.is_decode() {
            ServiceError::network(format!("Response decode error: {}", err))
        } else {
            ServiceError::network(format!("HTTP client error: {}", err))
        }
    }
}

/// Convert serde_json errors to ServiceError
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::validation(format!("JSON error: {}", err))
    }
}
