//! Outbound transport for chat completion requests
//!
//! The client talks to a `ChatTransport` so the retry/timeout logic can be
//! exercised without a network. `HttpTransport` is the reqwest-backed
//! implementation used in production.

use async_trait::async_trait;
use log::debug;
use reqwest::{header, Client};

use crate::config::OpenRouterConfig;
use crate::error::{Result, ServiceError};
use crate::services::common::{build_http_client, UserAgent};

use super::models::ChatRequest;

/// Fixed referer OpenRouter uses to attribute traffic
pub const HTTP_REFERER: &str = "https://openrouter.ai/";

/// Raw outcome of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,

    /// Response body, verbatim
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single chat completion exchange
///
/// Implementations return `Err` only for transport failures; any HTTP
/// status, including errors, comes back as a `TransportResponse`. Dropping
/// the returned future must abort the call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post_chat_completion(&self, request: &ChatRequest) -> Result<TransportResponse>;
}

/// reqwest-backed transport posting to `{base_url}/chat/completions`
pub struct HttpTransport {
    http_client: Client,
    url: String,
    api_key: String,
}

impl HttpTransport {
    /// Build a transport from a validated configuration
    ///
    /// The per-attempt deadline is enforced by the caller, so the underlying
    /// client carries no timeout of its own.
    pub fn new(config: &OpenRouterConfig) -> Result<Self> {
        let http_client = build_http_client(Some(UserAgent::default()), None)?;

        Ok(Self {
            http_client,
            url: config.chat_completions_url(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn post_chat_completion(&self, request: &ChatRequest) -> Result<TransportResponse> {
        let body = serde_json::to_string(request)
            .map_err(|e| ServiceError::validation(format!("Failed to serialize request: {}", e)))?;

        debug!("Sending request to OpenRouter: POST {} ({} bytes)", self.url, body.len());

        let response = self
            .http_client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", HTTP_REFERER)
            .body(body)
            .send()
            .await
            .map_err(|e| ServiceError::network(format!("Failed to send request: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::network(format!("Failed to read response body: {}", e)))?;

        Ok(TransportResponse { status, body })
    }
}
