//! Unit tests for flashcard-ai
//!
//! This module contains tests for various components of the crate.

// Re-export test modules
pub mod config_tests;
pub mod generation_tests;
