//! Vector knowledge for rule generation.
//!
//! Provides embedding providers, a pluggable nearest-neighbour index, the
//! phrase extractor and key mapper that ground rule statements in the
//! vocabulary, and policy-document retrieval.

pub mod chunker;
pub mod embeddings;
pub mod mapper;
pub mod phrases;
pub mod rag;
pub mod vector_index;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingProvider};
pub use mapper::{KeyMapper, KeyMapping, MappingMiss, MappingOutcome, Suggestion};
pub use phrases::{BooleanIndicator, NumericValue, PhraseExtractor};
pub use rag::{RetrievedSnippet, Retriever};
pub use vector_index::{create_index, IndexKind, IndexedEntry, SearchHit, VectorIndex};
