//! Resilience patterns for the OpenRouter client
//!
//! Bounded retry with capped exponential backoff. Per-attempt timeouts are
//! enforced by the client itself, since a timeout ends the send instead of
//! scheduling another attempt.

mod retry;

pub use retry::{RetryConfig, RetryExecutor};
