//! Common utilities for service clients
//!
//! This module provides shared functionality for all service clients.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::{header, Client};

use crate::error::{Result, ServiceError};

/// UserAgent structure for identifying the client to upstream services
#[derive(Debug, Clone)]
pub struct UserAgent {
    /// Application name
    pub app_name: String,

    /// Version string
    pub version: String,

    /// Optional extra info
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "flashcard-ai".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: Some("openrouter-client".to_string()),
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;

        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }

        Ok(())
    }
}

/// Build a standard HTTP client with default settings
pub fn build_http_client(user_agent: Option<UserAgent>, timeout: Option<Duration>) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    let ua = user_agent.unwrap_or_default().to_string();

    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(&ua)
            .map_err(|e| ServiceError::configuration(format!("Invalid user agent: {}", e)))?,
    );

    let mut builder = reqwest::Client::builder().default_headers(headers).gzip(true);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Counters kept by a client across sends
#[derive(Debug, Default)]
pub struct ClientMetrics {
    /// `send_chat_message` calls
    request_count: AtomicU64,

    /// Individual transport attempts
    attempt_count: AtomicU64,

    /// Attempts after the first one of a send
    retry_count: AtomicU64,

    /// Sends that returned content
    success_count: AtomicU64,

    /// Sends that failed, for any reason
    error_count: AtomicU64,

    /// Attempts cut off by the timeout
    timeout_count: AtomicU64,
}

impl ClientMetrics {
    pub fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attempt(&self, attempt: u32) {
        self.attempt_count.fetch_add(1, Ordering::Relaxed);
        if attempt > 1 {
            self.retry_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_success(&self) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeout_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of all counters as a map
    pub fn as_map(&self) -> HashMap<String, String> {
        [
            ("request_count", &self.request_count),
            ("attempt_count", &self.attempt_count),
            ("retry_count", &self.retry_count),
            ("success_count", &self.success_count),
            ("error_count", &self.error_count),
            ("timeout_count", &self.timeout_count),
        ]
        .into_iter()
        .map(|(key, counter)| (key.to_string(), counter.load(Ordering::Relaxed).to_string()))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_format() {
        let ua = UserAgent {
            app_name: "flashcard-ai".to_string(),
            version: "1.2.3".to_string(),
            extra: None,
        };
        assert_eq!(ua.to_string(), "flashcard-ai/1.2.3");
        assert!(UserAgent::default().to_string().ends_with("(openrouter-client)"));
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = ClientMetrics::default();
        metrics.record_request();
        metrics.record_attempt(1);
        metrics.record_attempt(2);
        metrics.record_success();

        let map = metrics.as_map();
        assert_eq!(map["request_count"], "1");
        assert_eq!(map["attempt_count"], "2");
        assert_eq!(map["retry_count"], "1");
        assert_eq!(map["success_count"], "1");
        assert_eq!(map["error_count"], "0");
    }
}
