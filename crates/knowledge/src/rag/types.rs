//! Retrieval result types.

use serde::Serialize;

/// A policy chunk that cleared the similarity threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedSnippet {
    /// Chunk id (`policy_<n>`)
    pub id: String,

    /// Title of the section the chunk came from, when known
    pub title: Option<String>,

    pub text: String,

    pub similarity: f32,
}

/// Render snippets as the bullet list handed to prompt construction.
///
/// Bullets are separated by a blank line; no snippets yields an empty string.
pub fn format_context(snippets: &[RetrievedSnippet]) -> String {
    snippets
        .iter()
        .map(|snippet| format!("- {}", snippet.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
