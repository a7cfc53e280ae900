//! # Flashcard AI
//!
//! Backend library for turning source text into flashcards with an LLM.
//!
//! This crate provides:
//!
//! - A typed OpenRouter chat-completions client with bounded retry
//! - The flashcard generation orchestrator
//! - Flashcard CRUD on top of a pluggable datastore
//! - Comprehensive error handling system
//! - Configuration management utilities
//!
//! ## Architecture
//!
//! - `ServiceClient`: The base trait for external service clients
//! - `ChatTransport`: The wire seam under `OpenRouterClient`
//! - `RetryExecutor`: Exponential backoff around one logical send
//! - `Datastore`: Table-style persistence used by the services
//! - `ServiceError`: Comprehensive error handling system

// Re-export core modules
pub mod core;
pub use crate::core::ServiceClient;

// Re-export service-specific modules
pub mod services;
pub use services::openrouter;
pub use services::openrouter::{ChatRequestBuilder, OpenRouterClient};

// Re-export error handling
pub mod error;
pub use error::{Result, ServiceError};

// Re-export resilience patterns
pub mod resilience;
pub use resilience::{RetryConfig, RetryExecutor};

// Re-export configuration management
pub mod config;
pub use config::{ConfigProvider, OpenRouterConfig, ServiceConfig};

pub mod storage;
pub use storage::{Datastore, MemoryDatastore};

pub mod flashcards;
pub use flashcards::FlashcardService;

pub mod generation;
pub use generation::{GenerationConfig, GenerationCreateResponse, GenerationService};

// Utility module for common functionality
pub mod util;

/// Create an OpenRouter client configured from the environment
pub fn openrouter_client() -> Result<OpenRouterClient> {
    OpenRouterClient::from_env()
}

#[cfg(test)]
mod tests;
