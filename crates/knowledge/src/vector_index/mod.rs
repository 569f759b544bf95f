//! Nearest-neighbour vector index.
//!
//! Two interchangeable strategies share the [`VectorIndex`] contract:
//! - [`CosineIndex`]: brute-force cosine similarity over every stored vector
//! - [`FlatL2Index`]: a LanceDB table searched with exhaustive squared
//!   euclidean distance, reported as `similarity = 1 / (1 + distance)`
//!
//! Callers should depend only on ordering and the similarity contract, never
//! on which strategy is active.

mod cosine;
mod flat_l2;
pub mod store;

pub use cosine::CosineIndex;
pub use flat_l2::FlatL2Index;

use async_trait::async_trait;
use rulegen_core::AppResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Index strategy selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexKind {
    Cosine,
    FlatL2,
}

impl IndexKind {
    /// Parse a configured store type.
    ///
    /// Accepts `cosine`/`in-memory` and `flat-l2`/`faiss`. Anything else falls
    /// back to cosine with a warning.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "cosine" | "in-memory" | "in_memory" | "memory" => IndexKind::Cosine,
            "flat-l2" | "flat_l2" | "faiss" => IndexKind::FlatL2,
            other => {
                tracing::warn!("Unknown vector store type '{}', using cosine", other);
                IndexKind::Cosine
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Cosine => "cosine",
            IndexKind::FlatL2 => "flat-l2",
        }
    }
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored item: an id, its vector and the text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
}

impl IndexedEntry {
    pub fn new(id: impl Into<String>, vector: Vec<f32>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vector,
            text: text.into(),
        }
    }
}

/// A ranked query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub similarity: f32,
    /// 0-based place in the result list
    pub rank: usize,
    /// Insertion position of the entry, usable with [`VectorIndex::source_text`]
    pub position: usize,
}

/// Trait for vector index backends.
///
/// Mutation takes `&mut self`; a populated index is read-only and can be
/// shared across tasks behind an `Arc`.
#[async_trait]
pub trait VectorIndex: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> IndexKind;

    /// Dimension established by the first insertion, `None` while empty.
    fn dimension(&self) -> Option<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a batch of entries.
    ///
    /// The whole batch is validated first; on error nothing is stored.
    async fn insert(&mut self, entries: Vec<IndexedEntry>) -> AppResult<()>;

    /// Up to `k` hits in descending similarity. Exact ties keep insertion order.
    async fn query(&self, vector: &[f32], k: usize) -> AppResult<Vec<SearchHit>>;

    /// Source text of the entry at an insertion position.
    fn source_text(&self, position: usize) -> Option<&str>;

    /// Persist to a directory (created if missing).
    async fn save(&self, dir: &Path) -> AppResult<()>;

    /// Replace the contents with an index previously written by `save`.
    async fn load(&mut self, dir: &Path) -> AppResult<()>;

    /// Remove every entry and forget the dimension.
    fn reset(&mut self);
}

/// Create an empty index of the given kind.
pub fn create_index(kind: IndexKind) -> Box<dyn VectorIndex> {
    match kind {
        IndexKind::Cosine => Box::new(CosineIndex::new()),
        IndexKind::FlatL2 => Box::new(FlatL2Index::new()),
    }
}

pub(crate) fn hits_from_ranked(
    ranked: Vec<(usize, f32)>,
    table: &store::EntryTable,
) -> Vec<SearchHit> {
    ranked
        .into_iter()
        .enumerate()
        .filter_map(|(rank, (position, similarity))| {
            table.id(position).map(|id| SearchHit {
                id: id.to_string(),
                similarity,
                rank,
                position,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulegen_core::AppError;
    use tempfile::TempDir;

    fn sample_entries() -> Vec<IndexedEntry> {
        vec![
            IndexedEntry::new("user_age", vec![1.0, 0.0, 0.0], "user_age"),
            IndexedEntry::new("is_premium_member", vec![0.0, 1.0, 0.0], "is_premium_member"),
            IndexedEntry::new("purchase_amount", vec![0.6, 0.8, 0.0], "purchase_amount"),
        ]
    }

    fn both_kinds() -> [Box<dyn VectorIndex>; 2] {
        [create_index(IndexKind::Cosine), create_index(IndexKind::FlatL2)]
    }

    #[test]
    fn test_parse_kind_aliases() {
        assert_eq!(IndexKind::parse("in-memory"), IndexKind::Cosine);
        assert_eq!(IndexKind::parse("FAISS"), IndexKind::FlatL2);
        assert_eq!(IndexKind::parse("flat-l2"), IndexKind::FlatL2);
        assert_eq!(IndexKind::parse("annoy"), IndexKind::Cosine);
    }

    #[tokio::test]
    async fn test_query_contract_for_every_kind() {
        for mut index in both_kinds() {
            index.insert(sample_entries()).await.unwrap();
            assert_eq!(index.dimension(), Some(3));

            let hits = index.query(&[0.0, 1.0, 0.0], 2).await.unwrap();
            assert_eq!(hits.len(), 2, "{}", index.kind());
            assert_eq!(hits[0].id, "is_premium_member");
            assert_eq!(hits[0].rank, 0);
            assert_eq!(hits[1].id, "purchase_amount");
            assert!(hits[0].similarity >= hits[1].similarity);
            assert_eq!(index.source_text(hits[1].position), Some("purchase_amount"));
        }
    }

    #[tokio::test]
    async fn test_query_edge_cases_for_every_kind() {
        for mut index in both_kinds() {
            assert!(index.query(&[1.0, 0.0, 0.0], 3).await.unwrap().is_empty());

            index.insert(sample_entries()).await.unwrap();
            assert_eq!(index.query(&[1.0, 0.0, 0.0], 10).await.unwrap().len(), 3);
            assert!(index.query(&[1.0, 0.0, 0.0], 0).await.unwrap().is_empty());
            assert!(matches!(
                index.query(&[1.0, 0.0], 1).await,
                Err(AppError::DimensionMismatch {
                    expected: 3,
                    actual: 2
                })
            ));
        }
    }

    #[tokio::test]
    async fn test_mismatched_insert_leaves_index_unchanged() {
        for mut index in both_kinds() {
            index.insert(sample_entries()).await.unwrap();
            let before = index.query(&[1.0, 0.0, 0.0], 3).await.unwrap();

            let result = index
                .insert(vec![
                    IndexedEntry::new("region", vec![0.0, 0.0, 1.0], "region"),
                    IndexedEntry::new("status", vec![0.0, 1.0], "status"),
                ])
                .await;
            assert!(matches!(result, Err(AppError::DimensionMismatch { .. })));
            assert_eq!(index.len(), 3);
            assert_eq!(index.query(&[1.0, 0.0, 0.0], 3).await.unwrap(), before);
        }
    }

    #[tokio::test]
    async fn test_exact_ties_keep_insertion_order() {
        for mut index in both_kinds() {
            index
                .insert(vec![
                    IndexedEntry::new("first", vec![0.0, 1.0], "first"),
                    IndexedEntry::new("second", vec![0.0, 1.0], "second"),
                    IndexedEntry::new("third", vec![0.0, 1.0], "third"),
                ])
                .await
                .unwrap();

            let ids: Vec<String> = index
                .query(&[0.0, 1.0], 3)
                .await
                .unwrap()
                .into_iter()
                .map(|hit| hit.id)
                .collect();
            assert_eq!(ids, vec!["first", "second", "third"]);
        }
    }

    #[tokio::test]
    async fn test_reindexing_keeps_prior_entries() {
        for mut index in both_kinds() {
            index.insert(sample_entries()).await.unwrap();
            index.insert(sample_entries()).await.unwrap();
            assert_eq!(index.len(), 6);

            let hits = index.query(&[1.0, 0.0, 0.0], 2).await.unwrap();
            assert!(hits.iter().all(|hit| hit.id == "user_age"));
        }
    }

    #[tokio::test]
    async fn test_save_load_reproduces_queries() {
        let query_vector = [0.3, 0.9, 0.1];
        for kind in [IndexKind::Cosine, IndexKind::FlatL2] {
            let temp = TempDir::new().unwrap();
            let mut index = create_index(kind);
            index.insert(sample_entries()).await.unwrap();
            index.save(temp.path()).await.unwrap();

            let mut reloaded = create_index(kind);
            reloaded.load(temp.path()).await.unwrap();

            assert_eq!(reloaded.len(), 3);
            assert_eq!(reloaded.dimension(), Some(3));
            assert_eq!(
                reloaded.query(&query_vector, 3).await.unwrap(),
                index.query(&query_vector, 3).await.unwrap()
            );
        }
    }

    #[tokio::test]
    async fn test_load_missing_directory_fails() {
        for mut index in both_kinds() {
            let temp = TempDir::new().unwrap();
            let result = index.load(&temp.path().join("absent")).await;
            assert!(matches!(result, Err(AppError::Index(_))));
        }
    }

    #[tokio::test]
    async fn test_reset_forgets_dimension() {
        for mut index in both_kinds() {
            index.insert(sample_entries()).await.unwrap();
            index.reset();
            assert!(index.is_empty());
            assert_eq!(index.dimension(), None);
            index
                .insert(vec![IndexedEntry::new("x", vec![1.0], "x")])
                .await
                .unwrap();
            assert_eq!(index.dimension(), Some(1));
        }
    }
}
