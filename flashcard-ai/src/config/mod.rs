//! Configuration management for service clients
//!
//! This module provides utilities for loading and validating configuration
//! for the OpenRouter client and the generation service, with support for
//! environment variables.

use std::collections::HashMap;
use std::env;
use std::fmt::Debug;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Default OpenRouter API endpoint
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default per-attempt timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default number of attempts (first attempt included)
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Look up a string value; `Ok(None)` only when the key is absent
    fn lookup(&self, key: &str) -> Result<Option<String>>;

    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String> {
        self.lookup(key)?.ok_or_else(|| {
            ServiceError::configuration(format!("Configuration key not found: {}", key))
        })
    }
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value, falling back only when the key is absent
    ///
    /// A present but malformed value is an error rather than a silent default.
    fn get_int_opt(&self, key: &str) -> Result<Option<i64>> {
        match self.lookup(key)? {
            Some(value) => value.trim().parse::<i64>().map(Some).map_err(|e| {
                ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e))
            }),
            None => Ok(None),
        }
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,

    /// Optional namespace for variables (e.g., "OPENROUTER")
    namespace: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set a namespace for environment variables
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Format a configuration key as an environment variable
    pub(crate) fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        if let Some(ref namespace) = self.namespace {
            env_key.push_str(namespace);
            env_key.push('_');
        }

        env_key.push_str(
            &key.to_uppercase()
                .replace(|c: char| !c.is_ascii_alphanumeric(), "_"),
        );

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn lookup(&self, key: &str) -> Result<Option<String>> {
        let env_key = self.format_key(key);

        match env::var(&env_key) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(ServiceError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            ))),
        }
    }

    fn get_string(&self, key: &str) -> Result<String> {
        self.lookup(key)?.ok_or_else(|| {
            ServiceError::configuration(format!(
                "Environment variable not set: {}",
                self.format_key(key)
            ))
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory config provider with initial values
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn lookup(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }
}

/// A composite config provider that tries multiple providers in order
#[derive(Default)]
pub struct CompositeConfigProvider {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    /// Create a new composite config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the end of the chain
    pub fn add_provider(&mut self, provider: impl ConfigProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    /// Builder-style variant of `add_provider`
    pub fn with_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.add_provider(provider);
        self
    }
}

impl ConfigProvider for CompositeConfigProvider {
    /// First provider holding the key wins; a failing provider stops the search
    fn lookup(&self, key: &str) -> Result<Option<String>> {
        for provider in &self.providers {
            if let Some(value) = provider.lookup(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn get_string(&self, key: &str) -> Result<String> {
        self.lookup(key)?.ok_or_else(|| {
            ServiceError::configuration(format!(
                "Configuration key not found in any provider: {}",
                key
            ))
        })
    }
}

/// Provider chain for front ends: explicit overrides, then the process
/// environment, then fallback defaults
pub fn layered_provider(
    overrides: HashMap<String, String>,
    defaults: HashMap<String, String>,
) -> CompositeConfigProvider {
    CompositeConfigProvider::new()
        .with_provider(MemoryConfigProvider::with_values(overrides))
        .with_provider(EnvConfigProvider::new())
        .with_provider(MemoryConfigProvider::with_values(defaults))
}

/// Global default configuration provider (plain environment variables)
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new()));

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

/// Configuration for the OpenRouter chat completions client
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenRouterConfig {
    /// API key
    pub api_key: String,

    /// Base URL (can be changed for proxies or tests)
    pub base_url: String,

    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,

    /// Total attempts, first attempt included
    pub max_retries: u32,
}

impl Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl OpenRouterConfig {
    /// Create a configuration with the given key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Override the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-attempt timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Override the attempt budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Load configuration from a config provider
    ///
    /// Keys: `openrouter_api_key` (required), `openrouter_base_url`,
    /// `openrouter_timeout_ms`, `openrouter_max_retries`.
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let api_key = provider.get_string("openrouter_api_key")?;
        let base_url = provider
            .lookup("openrouter_base_url")?
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout_ms = provider
            .get_int_opt("openrouter_timeout_ms")?
            .map(|v| non_negative(v, "openrouter_timeout_ms"))
            .transpose()?
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let max_retries = provider
            .get_int_opt("openrouter_max_retries")?
            .map(|v| non_negative(v, "openrouter_max_retries"))
            .transpose()?
            .map(|v| {
                u32::try_from(v).map_err(|_| {
                    ServiceError::configuration(format!(
                        "openrouter_max_retries is out of range: {}",
                        v
                    ))
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let config = Self {
            api_key,
            base_url,
            timeout_ms,
            max_retries,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_provider(&**DEFAULT_PROVIDER)
    }

    /// Endpoint for chat completions under the configured base URL
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

fn non_negative(value: i64, key: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| ServiceError::configuration(format!("{} must not be negative", key)))
}

impl ServiceConfig for OpenRouterConfig {
    fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ServiceError::configuration("API key is required"));
        }

        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            ServiceError::configuration(format!("Invalid base URL {}: {}", self.base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ServiceError::configuration(format!(
                "Base URL must use http or https: {}",
                self.base_url
            )));
        }

        if self.timeout_ms == 0 {
            return Err(ServiceError::configuration("Timeout must be positive"));
        }

        if self.max_retries == 0 {
            return Err(ServiceError::configuration("Max retries must be positive"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "openrouter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openrouter_config_defaults() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("openrouter_api_key", "k");

        let config = OpenRouterConfig::from_provider(&provider).unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_openrouter_config_validation() {
        assert!(OpenRouterConfig::new("").validate().is_err());
        assert!(OpenRouterConfig::new("   ").validate().is_err());
        assert!(OpenRouterConfig::new("k").with_timeout_ms(0).validate().is_err());
        assert!(OpenRouterConfig::new("k").with_max_retries(0).validate().is_err());
        assert!(OpenRouterConfig::new("k").with_base_url("not a url").validate().is_err());
        assert!(OpenRouterConfig::new("k").with_base_url("ftp://host").validate().is_err());
        assert!(OpenRouterConfig::new("k").validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = OpenRouterConfig::new("sk-secret-value");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret-value"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_chat_completions_url() {
        let config = OpenRouterConfig::new("k").with_base_url("http://localhost:8080/v1/");
        assert_eq!(config.chat_completions_url(), "http://localhost:8080/v1/chat/completions");
    }
}
