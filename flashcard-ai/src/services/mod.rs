//! Service-specific client implementations
//!
//! This module contains client implementations for specific external services.

pub mod common;
pub mod openrouter;

pub use common::UserAgent;
