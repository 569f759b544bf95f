//! Brute-force cosine similarity index.

use super::store::{self, EntryTable};
use super::{hits_from_ranked, IndexKind, IndexedEntry, SearchHit, VectorIndex};
use async_trait::async_trait;
use rulegen_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

const VECTORS_FILE: &str = "vectors.bin";
const MAGIC: &[u8; 4] = b"RGV1";
const HEADER_LEN: usize = 4 + 8 + 8;

/// Exact O(n*d) search over every stored vector.
#[derive(Debug, Default)]
pub struct CosineIndex {
    dimension: Option<usize>,
    vectors: Vec<Vec<f32>>,
    entries: EntryTable,
}

impl CosineIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Calculate cosine similarity between two vectors.
///
/// A zero vector has similarity 0 with everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for CosineIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Cosine
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    async fn insert(&mut self, entries: Vec<IndexedEntry>) -> AppResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let dimension = store::validate_batch(self.dimension, &entries)?;
        self.dimension = Some(dimension);

        for entry in entries {
            self.vectors.push(entry.vector);
            self.entries.push(entry.id, entry.text);
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        store::check_query(self.dimension, vector)?;

        let scores = self.vectors.iter().map(|v| cosine_similarity(vector, v));
        Ok(hits_from_ranked(store::top_k(scores, k), &self.entries))
    }

    fn source_text(&self, position: usize) -> Option<&str> {
        self.entries.text(position)
    }

    async fn save(&self, dir: &Path) -> AppResult<()> {
        fs::create_dir_all(dir)?;

        let dimension = self.dimension.unwrap_or(0);
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.vectors.len() * dimension * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&(self.vectors.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&(dimension as u64).to_le_bytes());
        for value in self.vectors.iter().flatten() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        store::write_atomic(&dir.join(VECTORS_FILE), &bytes)?;
        self.entries.write_metadata(dir)?;

        tracing::info!("Saved {} vectors to {:?}", self.vectors.len(), dir);
        Ok(())
    }

    async fn load(&mut self, dir: &Path) -> AppResult<()> {
        let path = dir.join(VECTORS_FILE);
        let bytes = fs::read(&path)
            .map_err(|e| AppError::Index(format!("Failed to read {:?}: {}", path, e)))?;
        let (count, dimension) = parse_header(&bytes)?;
        let expected = count
            .checked_mul(dimension)
            .and_then(|values| values.checked_mul(4))
            .ok_or_else(|| {
                AppError::Index(format!(
                    "Vector file {:?} declares an impossible size: {} x {}",
                    path, count, dimension
                ))
            })?;

        let body = &bytes[HEADER_LEN..];
        if body.len() != expected {
            return Err(AppError::Index(format!(
                "Vector file {:?} is truncated: expected {} vectors of {} dimensions",
                path, count, dimension
            )));
        }

        let values: Vec<f32> = body
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let vectors: Vec<Vec<f32>> = if dimension == 0 {
            Vec::new()
        } else {
            values.chunks_exact(dimension).map(<[f32]>::to_vec).collect()
        };

        let entries = EntryTable::read_metadata(dir)?;
        if entries.len() != vectors.len() {
            return Err(AppError::Index(format!(
                "Metadata lists {} entries but {} vectors were stored",
                entries.len(),
                vectors.len()
            )));
        }

        self.dimension = (!vectors.is_empty()).then_some(dimension);
        self.vectors = vectors;
        self.entries = entries;

        tracing::info!("Loaded {} vectors from {:?}", self.vectors.len(), dir);
        Ok(())
    }

    fn reset(&mut self) {
        self.dimension = None;
        self.vectors.clear();
        self.entries.clear();
    }
}

fn parse_header(bytes: &[u8]) -> AppResult<(usize, usize)> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(AppError::Index(
            "Not a cosine index vector file".to_string(),
        ));
    }
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[4..12]);
    let count = u64::from_le_bytes(word);
    word.copy_from_slice(&bytes[12..20]);
    let dimension = u64::from_le_bytes(word);

    let too_large = |_| AppError::Index("Vector file header does not fit this platform".to_string());
    Ok((
        usize::try_from(count).map_err(too_large)?,
        usize::try_from(dimension).map_err(too_large)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c) - 0.0).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_vectors_are_bit_exact_after_reload() {
        let temp = TempDir::new().unwrap();
        let tricky = vec![f32::MIN_POSITIVE, 1.0 / 3.0, -0.0, 1e-38];

        let mut index = CosineIndex::new();
        index
            .insert(vec![IndexedEntry::new("a", tricky.clone(), "a")])
            .await
            .unwrap();
        index.save(temp.path()).await.unwrap();

        let mut reloaded = CosineIndex::new();
        reloaded.load(temp.path()).await.unwrap();
        let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&reloaded.vectors[0]), bits(&tricky));
    }

    #[tokio::test]
    async fn test_load_rejects_foreign_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(VECTORS_FILE), b"not an index").unwrap();

        let mut index = CosineIndex::new();
        assert!(matches!(index.load(temp.path()).await, Err(AppError::Index(_))));
    }

    #[tokio::test]
    async fn test_load_rejects_oversized_header() {
        let temp = TempDir::new().unwrap();
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        fs::write(temp.path().join(VECTORS_FILE), bytes).unwrap();

        let mut index = CosineIndex::new();
        assert!(matches!(index.load(temp.path()).await, Err(AppError::Index(_))));
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_zero_norm_vectors_score_zero() {
        let mut index = CosineIndex::new();
        index
            .insert(vec![
                IndexedEntry::new("blank", vec![0.0, 0.0], "blank"),
                IndexedEntry::new("axis", vec![1.0, 0.0], "axis"),
            ])
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].id, "axis");
        assert_eq!(hits[1].id, "blank");
        assert_eq!(hits[1].similarity, 0.0);

        let from_blank = index.query(&[0.0, 0.0], 2).await.unwrap();
        assert!(from_blank.iter().all(|hit| hit.similarity == 0.0));
    }

    #[tokio::test]
    async fn test_empty_index_roundtrip() {
        let temp = TempDir::new().unwrap();
        CosineIndex::new().save(temp.path()).await.unwrap();

        let mut reloaded = CosineIndex::new();
        reloaded.load(temp.path()).await.unwrap();
        assert!(reloaded.is_empty());
        assert_eq!(reloaded.dimension(), None);
    }
}
