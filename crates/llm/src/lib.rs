//! Language-model access for rule generation.
//!
//! A provider-agnostic [`LlmClient`] trait with Ollama, OpenAI and mock
//! implementations, selected from configuration by [`create_client`].
//!
//! # Example
//! ```no_run
//! use rulegen_core::config::LlmConfig;
//! use rulegen_llm::{create_client, LlmRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LlmConfig::default();
//! let client = create_client(&config, None)?;
//! let request = LlmRequest::from_config("Adults only", &config);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockClient, OllamaClient, OpenAiClient, MOCK_REPLY};
