//! Rulegen Core Library
//!
//! This crate provides the foundational utilities shared by every rulegen crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management
//! - The data-key vocabulary

pub mod config;
pub mod error;
pub mod logging;
pub mod vocabulary;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use vocabulary::Vocabulary;
