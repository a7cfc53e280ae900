//! OpenRouter API client implementation
//!
//! This module provides a strongly-typed client for OpenRouter chat
//! completions. One `send_chat_message` call yields one validated text
//! completion, hiding transient upstream failures behind a bounded retry
//! budget and surfacing everything else immediately.

mod models;
mod transport;

pub use models::*;
pub use transport::{ChatTransport, HttpTransport, TransportResponse, HTTP_REFERER};

#[cfg(test)]
pub use transport::MockChatTransport;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::{OpenRouterConfig, ServiceConfig};
use crate::core::ServiceClient;
use crate::error::mapping::classify_http_error;
use crate::error::{Result, ServiceError};
use crate::resilience::{RetryConfig, RetryExecutor};
use crate::services::common::ClientMetrics;
use crate::util::{generate_request_id, sanitize_for_logging, truncate_string};

/// OpenRouter API client
///
/// Holds only immutable configuration and atomic counters, so a single
/// instance can be shared across concurrent sends.
pub struct OpenRouterClient {
    config: OpenRouterConfig,
    transport: Arc<dyn ChatTransport>,
    retry: RetryExecutor,
    metrics: ClientMetrics,
}

impl OpenRouterClient {
    /// Create a client talking HTTP to the configured endpoint
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::assemble(config, Arc::new(transport)))
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: OpenRouterConfig, transport: Arc<dyn ChatTransport>) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, transport))
    }

    /// Create a client from `OPENROUTER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenRouterConfig::from_env()?)
    }

    /// Create a new builder for the OpenRouter client
    pub fn builder() -> OpenRouterClientBuilder {
        OpenRouterClientBuilder::default()
    }

    fn assemble(config: OpenRouterConfig, transport: Arc<dyn ChatTransport>) -> Self {
        let retry = RetryExecutor::new(RetryConfig::with_max_attempts(config.max_retries));
        Self {
            config,
            transport,
            retry,
            metrics: ClientMetrics::default(),
        }
    }

    /// The validated configuration this client runs with
    pub fn config(&self) -> &OpenRouterConfig {
        &self.config
    }

    /// Send the described chat request and return the first choice's content
    ///
    /// Fails with `MissingUserMessage` when the builder has no user message,
    /// `Validation` for malformed payloads or responses, `Timeout` when an
    /// attempt exceeds the configured deadline, `EmptyResponse` for a reply
    /// without choices, and `MaxRetriesExceeded` once every attempt failed
    /// transiently.
    pub async fn send_chat_message(&self, prompt: &ChatRequestBuilder) -> Result<String> {
        let request_id = generate_request_id();
        self.metrics.record_request();

        let result = self.send(prompt, &request_id).await;
        match result {
            Ok(_) => self.metrics.record_success(),
            Err(ref err) => {
                self.metrics.record_error();
                error!(
                    "OpenRouter request {} failed [{}]: {} (model={}, has_system_message={}, user_message_length={}, has_response_format={})",
                    request_id,
                    err.code(),
                    truncate_string(&sanitize_for_logging(&err.to_string()), 300),
                    prompt.model(),
                    prompt.system_message().is_some(),
                    prompt.user_message().map(str::len).unwrap_or(0),
                    prompt.has_response_format(),
                );
            }
        }
        result
    }

    async fn send(&self, prompt: &ChatRequestBuilder, request_id: &str) -> Result<String> {
        let request = prompt.build()?;
        request.validate()?;

        debug!(
            "OpenRouter request {}: model={}, messages={}, max_attempts={}",
            request_id,
            request.model,
            request.messages.len(),
            self.retry.config().max_attempts
        );

        let response = self
            .retry
            .execute(|attempt| self.attempt(&request, attempt))
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ServiceError::EmptyResponse)
    }

    /// One bounded exchange: timeout, status check, body decode, shape check
    async fn attempt(&self, request: &ChatRequest, attempt: u32) -> Result<ChatResponse> {
        self.metrics.record_attempt(attempt);

        let deadline = Duration::from_millis(self.config.timeout_ms);
        let response =
            match tokio::time::timeout(deadline, self.transport.post_chat_completion(request)).await {
                Ok(outcome) => outcome?,
                Err(_) => {
                    self.metrics.record_timeout();
                    return Err(ServiceError::Timeout {
                        timeout_ms: self.config.timeout_ms,
                    });
                }
            };

        if !response.is_success() {
            let category = StatusCode::from_u16(response.status)
                .map(classify_http_error)
                .unwrap_or("unknown");
            debug!(
                "OpenRouter attempt {} answered {} ({})",
                attempt, response.status, category
            );
            return Err(ServiceError::api(response.status, response.body));
        }

        let body: Value = serde_json::from_str(&response.body)
            .map_err(|e| ServiceError::network(format!("Failed to decode response body: {}", e)))?;

        ChatResponse::from_value(&body)
    }
}

impl ServiceClient for OpenRouterClient {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn metrics(&self) -> Option<HashMap<String, String>> {
        Some(self.metrics.as_map())
    }
}

/// Builder for OpenRouter client
#[derive(Default)]
pub struct OpenRouterClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_ms: Option<u64>,
    max_retries: Option<u32>,
    transport: Option<Arc<dyn ChatTransport>>,
}

impl OpenRouterClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the per-attempt timeout in milliseconds
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Set the total attempt budget
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Use a custom transport instead of HTTP
    pub fn transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the OpenRouter client
    pub fn build(self) -> Result<OpenRouterClient> {
        let mut config = OpenRouterConfig::new(self.api_key.unwrap_or_default());

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }

        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }

        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }

        match self.transport {
            Some(transport) => OpenRouterClient::with_transport(config, transport),
            None => OpenRouterClient::new(config),
        }
    }
}
