//! Maps phrases from a rule statement onto vocabulary keys.
//!
//! Every vocabulary key is embedded once and stored in a dedicated vector
//! index whose entries are the keys themselves. Each extracted phrase is then
//! embedded and matched against that index.

use crate::embeddings::EmbeddingProvider;
use crate::phrases::PhraseExtractor;
use crate::vector_index::{IndexedEntry, SearchHit, VectorIndex};
use rulegen_core::config::MapperConfig;
use rulegen_core::{AppError, AppResult, Vocabulary};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A phrase grounded to a vocabulary key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMapping {
    pub user_phrase: String,
    pub mapped_to: String,
    pub similarity: f32,
}

/// A candidate key offered for a phrase that did not clear the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub key: String,
    pub similarity: f32,
}

/// A phrase that could not be grounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingMiss {
    pub phrase: String,
    /// Best score seen, `None` when the index returned nothing
    pub best_similarity: Option<f32>,
    pub suggestions: Vec<Suggestion>,
}

impl fmt::Display for MappingMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.best_similarity {
            None => write!(f, "No matches found for phrase: {}", self.phrase),
            Some(best) => {
                let keys: Vec<String> = self
                    .suggestions
                    .iter()
                    .map(|s| format!("'{}'", s.key))
                    .collect();
                write!(
                    f,
                    "Phrase '{}' mapping confidence too low ({:.2}). Suggestions: [{}]",
                    self.phrase,
                    best,
                    keys.join(", ")
                )
            }
        }
    }
}

/// Result of mapping one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappingOutcome {
    pub mappings: Vec<KeyMapping>,
    pub misses: Vec<MappingMiss>,
}

impl MappingOutcome {
    /// Every phrase missed: there is no variable grounding to work with.
    pub fn is_fatal(&self) -> bool {
        self.mappings.is_empty() && !self.misses.is_empty()
    }

    /// Distinct mapped keys in first-seen order.
    pub fn used_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for mapping in &self.mappings {
            if !keys.contains(&mapping.mapped_to) {
                keys.push(mapping.mapped_to.clone());
            }
        }
        keys
    }

    /// Mean mapping similarity, 0.5 when nothing was mapped.
    pub fn confidence(&self) -> f32 {
        if self.mappings.is_empty() {
            return 0.5;
        }
        let total: f32 = self.mappings.iter().map(|m| m.similarity).sum();
        total / self.mappings.len() as f32
    }
}

/// Key mapper over one vocabulary.
#[derive(Debug)]
pub struct KeyMapper {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Box<dyn VectorIndex>,
    extractor: PhraseExtractor,
    config: MapperConfig,
}

impl KeyMapper {
    /// Embed every vocabulary key and index it under its own name.
    pub async fn build(
        vocabulary: &Vocabulary,
        embedder: Arc<dyn EmbeddingProvider>,
        mut index: Box<dyn VectorIndex>,
        config: MapperConfig,
    ) -> AppResult<Self> {
        tracing::info!(
            "Indexing {} vocabulary keys with {} ({})",
            vocabulary.len(),
            embedder.provider_name(),
            index.kind()
        );

        let vectors = embedder.embed_batch(vocabulary.keys()).await?;
        if vectors.len() != vocabulary.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding provider returned {} vectors for {} keys",
                vectors.len(),
                vocabulary.len()
            )));
        }

        let entries = vocabulary
            .iter()
            .zip(vectors)
            .map(|(key, vector)| IndexedEntry::new(key, vector, key))
            .collect();
        index.insert(entries).await?;

        Ok(Self {
            embedder,
            index,
            extractor: PhraseExtractor::new()?,
            config,
        })
    }

    /// Map the phrases of `text` onto vocabulary keys.
    ///
    /// Phrases are embedded in one batch; mappings and misses keep extraction order.
    pub async fn map_phrases(&self, text: &str) -> AppResult<MappingOutcome> {
        let phrases = self.extractor.extract_phrases(text);
        tracing::debug!("Extracted {} phrases from text", phrases.len());

        if phrases.is_empty() {
            return Ok(MappingOutcome::default());
        }

        let vectors = self.embedder.embed_batch(&phrases).await?;
        if vectors.len() != phrases.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding provider returned {} vectors for {} phrases",
                vectors.len(),
                phrases.len()
            )));
        }
        let mut outcome = MappingOutcome::default();

        for (phrase, vector) in phrases.into_iter().zip(vectors) {
            let hits = self.index.query(&vector, self.config.top_k).await?;

            let Some(best) = hits.first() else {
                tracing::warn!("No matches found for phrase: {}", phrase);
                outcome.misses.push(MappingMiss {
                    phrase,
                    best_similarity: None,
                    suggestions: Vec::new(),
                });
                continue;
            };

            if best.similarity >= self.config.similarity_threshold {
                tracing::debug!(
                    "Mapped '{}' to '{}' (similarity: {:.4})",
                    phrase,
                    best.id,
                    best.similarity
                );
                outcome.mappings.push(KeyMapping {
                    user_phrase: phrase,
                    mapped_to: best.id.clone(),
                    similarity: best.similarity,
                });
            } else {
                let miss = MappingMiss {
                    best_similarity: Some(best.similarity),
                    suggestions: hits
                        .iter()
                        .map(|hit| Suggestion {
                            key: hit.id.clone(),
                            similarity: hit.similarity,
                        })
                        .collect(),
                    phrase,
                };
                tracing::warn!("{}", miss);
                outcome.misses.push(miss);
            }
        }

        Ok(outcome)
    }

    /// Ranked candidate keys for a single phrase.
    pub async fn potential_matches(
        &self,
        phrase: &str,
        top_k: Option<usize>,
    ) -> AppResult<Vec<SearchHit>> {
        let vector = self.embedder.embed(phrase).await?;
        self.index
            .query(&vector, top_k.unwrap_or(self.config.top_k))
            .await
    }

    pub fn extractor(&self) -> &PhraseExtractor {
        &self.extractor
    }

    /// The vocabulary index, e.g. for persisting it.
    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::vector_index::{create_index, IndexKind};

    async fn trigram_mapper(threshold: f32) -> KeyMapper {
        let vocabulary = Vocabulary::new(["user_age", "is_premium_member", "purchase_amount"]);
        KeyMapper::build(
            &vocabulary,
            Arc::new(TrigramProvider::new(384)),
            create_index(IndexKind::Cosine),
            MapperConfig {
                similarity_threshold: threshold,
                top_k: 3,
            },
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_miss_messages() {
        let empty = MappingMiss {
            phrase: "Apply".to_string(),
            best_similarity: None,
            suggestions: vec![],
        };
        assert_eq!(empty.to_string(), "No matches found for phrase: Apply");

        let low = MappingMiss {
            phrase: "Apply".to_string(),
            best_similarity: Some(0.1234),
            suggestions: vec![
                Suggestion {
                    key: "user_age".to_string(),
                    similarity: 0.1234,
                },
                Suggestion {
                    key: "region".to_string(),
                    similarity: 0.1,
                },
            ],
        };
        assert_eq!(
            low.to_string(),
            "Phrase 'Apply' mapping confidence too low (0.12). Suggestions: ['user_age', 'region']"
        );
    }

    #[test]
    fn test_outcome_summaries() {
        let mapping = |phrase: &str, key: &str, similarity: f32| KeyMapping {
            user_phrase: phrase.to_string(),
            mapped_to: key.to_string(),
            similarity,
        };
        let outcome = MappingOutcome {
            mappings: vec![
                mapping("premium", "is_premium_member", 0.9),
                mapping("member", "is_premium_member", 0.8),
                mapping("purchase", "purchase_amount", 1.0),
            ],
            misses: vec![],
        };
        assert_eq!(outcome.used_keys(), vec!["is_premium_member", "purchase_amount"]);
        assert!((outcome.confidence() - 0.9).abs() < 1e-6);
        assert!(!outcome.is_fatal());

        assert_eq!(MappingOutcome::default().confidence(), 0.5);
        assert!(!MappingOutcome::default().is_fatal());
    }

    #[tokio::test]
    async fn test_no_phrases_is_not_an_error() {
        let mapper = trigram_mapper(0.75).await;
        let outcome = mapper.map_phrases("if x > 5").await.unwrap();
        assert!(outcome.mappings.is_empty());
        assert!(outcome.misses.is_empty());
    }

    #[tokio::test]
    async fn test_trigram_maps_purchase() {
        let mapper = trigram_mapper(0.3).await;
        let hits = mapper.potential_matches("purchase", None).await.unwrap();
        assert_eq!(hits[0].id, "purchase_amount");
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_threshold_is_fatal() {
        let mapper = trigram_mapper(1.0).await;
        let outcome = mapper.map_phrases("Apply the order rule").await.unwrap();
        assert!(outcome.mappings.is_empty());
        assert!(outcome.is_fatal());
        assert!(outcome.misses.iter().all(|m| m.suggestions.len() <= 3));
    }

    /// Embeds at most one text per batch.
    #[derive(Debug)]
    struct SingleVectorProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for SingleVectorProvider {
        fn provider_name(&self) -> &str {
            "single"
        }

        fn model_name(&self) -> &str {
            "single"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts.iter().take(1).map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_short_phrase_batch_is_an_error() {
        let mapper = KeyMapper::build(
            &Vocabulary::new(["user_age"]),
            Arc::new(SingleVectorProvider),
            create_index(IndexKind::Cosine),
            MapperConfig::default(),
        )
        .await
        .unwrap();

        let result = mapper.map_phrases("premium member").await;
        assert!(matches!(result, Err(AppError::Knowledge(_))));
    }

    #[tokio::test]
    async fn test_empty_vocabulary_reports_no_matches() {
        let mapper = KeyMapper::build(
            &Vocabulary::default(),
            Arc::new(TrigramProvider::new(64)),
            create_index(IndexKind::Cosine),
            MapperConfig::default(),
        )
        .await
        .unwrap();

        let outcome = mapper.map_phrases("premium").await.unwrap();
        assert_eq!(outcome.misses.len(), 1);
        assert_eq!(outcome.misses[0].best_similarity, None);
    }
}
