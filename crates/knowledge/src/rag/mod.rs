//! Policy-document retrieval.
//!
//! Documents are chunked by section, embedded and stored in a vector index.
//! A query returns the closest chunks that clear the similarity threshold,
//! formatted as context for prompt construction. Retrieval soft-fails: an
//! unindexed corpus or a query with no close chunks yields an empty result.

pub mod types;

pub use types::{format_context, RetrievedSnippet};

use crate::chunker::chunk_sections;
use crate::embeddings::EmbeddingProvider;
use crate::vector_index::{IndexedEntry, VectorIndex};
use rulegen_core::config::RagConfig;
use rulegen_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

#[derive(Debug)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Box<dyn VectorIndex>,
    /// Section title per index position
    titles: Vec<String>,
    config: RagConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Box<dyn VectorIndex>,
        config: RagConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            titles: Vec::new(),
            config,
        }
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Chunk and index one document. Returns the number of chunks added.
    pub async fn index_document(&mut self, content: &str) -> AppResult<usize> {
        let chunks = chunk_sections(content, self.config.chunk_size);
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let offset = self.index.len();
        let mut titles = Vec::with_capacity(chunks.len());
        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                titles.push(chunk.title);
                IndexedEntry::new(
                    format!("policy_{}", offset + chunk.position as usize),
                    vector,
                    chunk.text,
                )
            })
            .collect::<Vec<_>>();

        let added = entries.len();
        self.index.insert(entries).await?;
        self.titles.extend(titles);

        tracing::info!("Indexed {} policy document chunks", added);
        Ok(added)
    }

    /// Index a policy file, or every `.md` file under a directory.
    ///
    /// A missing path logs a warning and indexes nothing.
    pub async fn index_file(&mut self, path: &Path) -> AppResult<usize> {
        if !path.exists() {
            tracing::warn!("Policy docs not found: {:?}", path);
            return Ok(0);
        }

        if path.is_file() {
            let content = std::fs::read_to_string(path)?;
            return self.index_document(&content).await;
        }

        let mut files: Vec<_> = WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        files.sort();

        let mut total = 0;
        for file in files {
            tracing::debug!("Indexing policy file {:?}", file);
            let content = std::fs::read_to_string(&file)?;
            total += self.index_document(&content).await?;
        }
        Ok(total)
    }

    /// Chunks that clear the threshold, best first, with their scores.
    pub async fn retrieve_with_scores(&self, query: &str) -> AppResult<Vec<RetrievedSnippet>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let hits = self.index.query(&vector, self.config.top_k).await?;

        let snippets: Vec<RetrievedSnippet> = hits
            .into_iter()
            .filter(|hit| hit.similarity >= self.config.similarity_threshold)
            .filter_map(|hit| {
                let text = self.index.source_text(hit.position)?.to_string();
                Some(RetrievedSnippet {
                    title: self.titles.get(hit.position).cloned(),
                    id: hit.id,
                    text,
                    similarity: hit.similarity,
                })
            })
            .collect();

        tracing::debug!(
            "Retrieved {} policy snippets above {:.2}",
            snippets.len(),
            self.config.similarity_threshold
        );
        Ok(snippets)
    }

    /// Retrieved chunks rendered as `- <text>` bullets separated by blank lines.
    pub async fn retrieve(&self, query: &str) -> AppResult<String> {
        let snippets = self.retrieve_with_scores(query).await?;
        Ok(format_context(&snippets))
    }
}
