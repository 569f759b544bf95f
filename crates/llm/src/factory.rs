//! LLM provider factory.
//!
//! Picks the client implementation named by the configuration. An OpenAI
//! provider without an API key degrades to the mock client so that the rest
//! of the pipeline can still run offline.

use crate::client::LlmClient;
use crate::providers::{MockClient, OllamaClient, OpenAiClient, DEFAULT_OLLAMA_URL};
use rulegen_core::config::LlmConfig;
use rulegen_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the configured provider.
///
/// # Errors
/// Returns `AppError::Config` for an unknown provider and `AppError::Llm`
/// when the HTTP client cannot be built.
pub fn create_client(config: &LlmConfig, api_key: Option<&str>) -> AppResult<Arc<dyn LlmClient>> {
    let timeout = Duration::from_secs(config.timeout_secs.max(1));

    match config.provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = config
                .endpoint
                .clone()
                .or_else(|| std::env::var("OLLAMA_URL").ok())
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            tracing::info!("Using Ollama model {} at {}", config.model, base_url);
            Ok(Arc::new(OllamaClient::with_base_url(base_url, timeout)?))
        }
        "openai" => match api_key.filter(|key| !key.is_empty()) {
            Some(key) => {
                tracing::info!("Using OpenAI model {}", config.model);
                Ok(Arc::new(OpenAiClient::new(
                    config.endpoint.as_deref(),
                    key,
                    timeout,
                )?))
            }
            None => {
                tracing::warn!("{} not set, using mock provider", config.api_key_env);
                Ok(Arc::new(MockClient::new()))
            }
        },
        "mock" => Ok(Arc::new(MockClient::new())),
        other => Err(AppError::Config(format!("Unknown LLM provider: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_ollama_client() {
        let client = create_client(&config("ollama"), None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_openai_without_key_falls_back_to_mock() {
        let client = create_client(&config("openai"), None).unwrap();
        assert_eq!(client.provider_name(), "mock");

        let client = create_client(&config("openai"), Some("")).unwrap();
        assert_eq!(client.provider_name(), "mock");
    }

    #[test]
    fn test_openai_with_key() {
        let client = create_client(&config("OpenAI"), Some("sk-test")).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client(&config("claude"), None) {
            Err(AppError::Config(msg)) => assert!(msg.contains("Unknown LLM provider")),
            other => panic!("Expected config error, got {:?}", other),
        }
    }
}
