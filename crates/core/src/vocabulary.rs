//! The fixed set of data keys rules may reference.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Ordered, de-duplicated, immutable set of data keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    keys: Vec<String>,
    lookup: HashSet<String>,
}

/// On-disk layout: `{"keys": [{"key": "...", "type": "...", ...}]}`.
#[derive(Debug, Deserialize)]
struct StoreKeysFile {
    #[serde(default)]
    keys: Vec<StoreKeyEntry>,
}

#[derive(Debug, Deserialize)]
struct StoreKeyEntry {
    key: String,
}

impl Vocabulary {
    /// Build a vocabulary, keeping the first occurrence of each key.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocabulary = Self::default();
        for key in keys {
            let key = key.into();
            if vocabulary.lookup.insert(key.clone()) {
                vocabulary.keys.push(key);
            }
        }
        vocabulary
    }

    /// Load a store-keys JSON file.
    ///
    /// A missing file yields an empty vocabulary; malformed JSON is an error.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::warn!("Vocabulary file not found: {:?}", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let vocabulary = Self::from_json(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse vocabulary {:?}: {}", path, e))
        })?;

        tracing::info!("Loaded {} keys from {:?}", vocabulary.len(), path);
        Ok(vocabulary)
    }

    /// Parse the store-keys JSON layout.
    pub fn from_json(contents: &str) -> AppResult<Self> {
        let file: StoreKeysFile = serde_json::from_str(contents)?;
        Ok(Self::new(file.keys.into_iter().map(|entry| entry.key)))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dedup_preserves_order() {
        let vocab = Vocabulary::new(["age", "region", "age", "status"]);
        assert_eq!(vocab.keys(), &["age", "region", "status"]);
        assert!(vocab.contains("region"));
        assert!(!vocab.contains("Region"));
    }

    #[test]
    fn test_from_json_ignores_extra_fields() {
        let vocab = Vocabulary::from_json(
            r#"{"keys": [
                {"key": "purchase_amount", "type": "number", "description": "Total"},
                {"key": "is_premium_member", "type": "boolean"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(vocab.len(), 2);
        assert_eq!(
            vocab.iter().collect::<Vec<_>>(),
            vec!["purchase_amount", "is_premium_member"]
        );
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let vocab = Vocabulary::load(&temp.path().join("missing.json")).unwrap();
        assert!(vocab.is_empty());
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("keys.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Vocabulary::load(&path), Err(AppError::Config(_))));
    }
}
