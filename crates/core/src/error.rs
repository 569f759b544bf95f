//! Error types for rulegen.
//!
//! This module defines a unified error enum that covers all error categories
//! in the workspace: configuration, I/O, embeddings, vector indices, rules,
//! prompts and the language-model boundary.

use thiserror::Error;

/// Unified error type for rulegen.
///
/// All fallible functions return `Result<T, AppError>`.
/// Malformed data (unmapped phrases, invalid rule trees) is reported as
/// values, never as panics; these variants cover contract violations and
/// failures of external collaborators.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding, mapping and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Vector index errors (persistence, duplicate ids, uninitialised index)
    #[error("Index error: {0}")]
    Index(String),

    /// A vector does not match the dimension established for its index
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Rule builder was asked for an operator outside the allowed set
    #[error("Operator '{0}' is not allowed")]
    InvalidOperator(String),

    /// `and` / `or` built from zero conditions
    #[error("'{0}' rule requires at least one condition")]
    EmptyConditionSet(String),

    /// Rule tree handling errors
    #[error("Rule error: {0}")]
    Rule(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = AppError::DimensionMismatch {
            expected: 384,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 384, got 3");
    }

    #[test]
    fn test_builder_contract_messages() {
        assert_eq!(
            AppError::InvalidOperator("xor".to_string()).to_string(),
            "Operator 'xor' is not allowed"
        );
        assert!(AppError::EmptyConditionSet("and".to_string())
            .to_string()
            .contains("at least one condition"));
    }

    #[test]
    fn test_from_serde_json() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
