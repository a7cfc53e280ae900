//! Tests for configuration management functionality
//!
//! These tests verify that the configuration providers and the OpenRouter
//! settings loaded through them behave correctly.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env;

    use crate::config::{
        layered_provider, CompositeConfigProvider, ConfigProvider, ConfigProviderExt,
        EnvConfigProvider, MemoryConfigProvider, OpenRouterConfig, ServiceConfig,
    };
    use crate::error::ServiceError;

    #[test]
    fn test_memory_config_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("api_key", "test_key");
        provider.set("timeout", "30");

        assert_eq!(provider.get_string("api_key").unwrap(), "test_key");
        assert_eq!(provider.get_int_opt("timeout").unwrap(), Some(30));
        assert_eq!(provider.lookup("missing").unwrap(), None);
        assert_eq!(provider.get_int_opt("missing").unwrap(), None);

        assert!(provider.get_string("missing").is_err());
        assert!(provider.get_int_opt("api_key").is_err());
    }

    #[test]
    fn test_env_config_provider() {
        env::set_var("FCTEST_ENV_API_KEY", "env_test_key");
        env::set_var("FCTEST_ENV_MAX_RETRIES", "5");

        let provider = EnvConfigProvider::new()
            .with_prefix("FCTEST")
            .with_namespace("ENV");

        assert_eq!(provider.get_string("api_key").unwrap(), "env_test_key");
        assert_eq!(provider.get_int_opt("MAX_RETRIES").unwrap(), Some(5));
        assert_eq!(provider.lookup("debug_mode").unwrap(), None);
        assert_eq!(provider.format_key("api-key"), "FCTEST_ENV_API_KEY");
        assert!(provider.get_string("NON_EXISTENT").is_err());

        env::remove_var("FCTEST_ENV_API_KEY");
        env::remove_var("FCTEST_ENV_MAX_RETRIES");
    }

    #[test]
    fn test_composite_config_provider() {
        let mut memory_provider = MemoryConfigProvider::new();
        memory_provider.set("key1", "memory_value");
        memory_provider.set("COMMON", "memory_value");

        env::set_var("FCTEST_COMPOSITE_KEY2", "env_value");
        env::set_var("FCTEST_COMPOSITE_COMMON", "env_value");

        let composite = CompositeConfigProvider::new()
            .with_provider(memory_provider)
            .with_provider(
                EnvConfigProvider::new()
                    .with_prefix("FCTEST")
                    .with_namespace("COMPOSITE"),
            );

        assert_eq!(composite.get_string("key1").unwrap(), "memory_value");
        assert_eq!(composite.get_string("KEY2").unwrap(), "env_value");
        assert_eq!(composite.get_string("COMMON").unwrap(), "memory_value");
        assert!(composite.get_string("NON_EXISTENT").is_err());

        env::remove_var("FCTEST_COMPOSITE_KEY2");
        env::remove_var("FCTEST_COMPOSITE_COMMON");
    }

    #[test]
    fn test_openrouter_config_from_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("openrouter_api_key", "sk-or-test");
        provider.set("openrouter_base_url", "http://localhost:9999/api/v1");
        provider.set("openrouter_timeout_ms", 60_000);
        provider.set("openrouter_max_retries", 5);

        let config = OpenRouterConfig::from_provider(&provider).unwrap();
        assert_eq!(config.api_key, "sk-or-test");
        assert_eq!(config.timeout_ms, 60_000);
        assert_eq!(config.max_retries, 5);
        assert_eq!(
            config.chat_completions_url(),
            "http://localhost:9999/api/v1/chat/completions"
        );
        assert_eq!(config.service_name(), "openrouter");
    }

    #[test]
    fn test_openrouter_config_rejects_bad_values() {
        let missing_key = MemoryConfigProvider::new();
        assert!(matches!(
            OpenRouterConfig::from_provider(&missing_key),
            Err(ServiceError::Configuration(_))
        ));

        let mut negative = MemoryConfigProvider::new();
        negative.set("openrouter_api_key", "k");
        negative.set("openrouter_timeout_ms", -1);
        assert!(OpenRouterConfig::from_provider(&negative).is_err());

        let mut malformed = MemoryConfigProvider::new();
        malformed.set("openrouter_api_key", "k");
        malformed.set("openrouter_max_retries", "three");
        assert!(OpenRouterConfig::from_provider(&malformed).is_err());

        let mut zero = MemoryConfigProvider::new();
        zero.set("openrouter_api_key", "k");
        zero.set("openrouter_max_retries", 0);
        assert!(OpenRouterConfig::from_provider(&zero).is_err());
    }

    #[test]
    fn test_out_of_range_max_retries_is_rejected() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("openrouter_api_key", "k");
        provider.set("openrouter_max_retries", u64::from(u32::MAX) + 1);

        assert!(matches!(
            OpenRouterConfig::from_provider(&provider),
            Err(ServiceError::Configuration(_))
        ));

        provider.set("openrouter_max_retries", u32::MAX);
        assert_eq!(
            OpenRouterConfig::from_provider(&provider).unwrap().max_retries,
            u32::MAX
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_env_value_is_an_error() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        env::set_var("FCTEST_BINARY_TIMEOUT_MS", OsString::from_vec(vec![0x33, 0xff, 0x30]));
        let provider = EnvConfigProvider::new().with_prefix("FCTEST").with_namespace("BINARY");

        assert!(matches!(
            provider.lookup("timeout_ms"),
            Err(ServiceError::Configuration(_))
        ));
        assert!(provider.get_int_opt("timeout_ms").is_err());

        let composite = CompositeConfigProvider::new()
            .with_provider(provider)
            .with_provider(MemoryConfigProvider::with_values(HashMap::from([(
                "timeout_ms".to_string(),
                "100".to_string(),
            )])));
        assert!(composite.get_int_opt("timeout_ms").is_err());

        env::remove_var("FCTEST_BINARY_TIMEOUT_MS");
    }

    #[test]
    fn test_layered_provider_precedence() {
        env::set_var("FCTEST_LAYERED_FROM_ENV", "env");
        env::set_var("FCTEST_LAYERED_SHADOWED", "env");

        let overrides = HashMap::from([
            ("fctest_layered_shadowed".to_string(), "override".to_string()),
        ]);
        let defaults = HashMap::from([
            ("fctest_layered_from_env".to_string(), "default".to_string()),
            ("fctest_layered_fallback".to_string(), "default".to_string()),
        ]);
        let provider = layered_provider(overrides, defaults);

        assert_eq!(provider.get_string("fctest_layered_shadowed").unwrap(), "override");
        assert_eq!(provider.get_string("fctest_layered_from_env").unwrap(), "env");
        assert_eq!(provider.get_string("fctest_layered_fallback").unwrap(), "default");
        assert_eq!(provider.lookup("fctest_layered_missing").unwrap(), None);

        env::remove_var("FCTEST_LAYERED_FROM_ENV");
        env::remove_var("FCTEST_LAYERED_SHADOWED");
    }
}
