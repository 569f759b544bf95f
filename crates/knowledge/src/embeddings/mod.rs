//! Embedding providers.
//!
//! Providers turn text into fixed-dimension vectors. The closed set of
//! implementations is selected from [`EmbeddingConfig`] by [`create_provider`].

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use rulegen_core::config::EmbeddingConfig;
