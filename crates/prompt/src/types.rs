//! Data handed to the system-prompt template.

use rulegen_core::Vocabulary;
use serde::Serialize;

/// Template variables for the rule-generation system prompt.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    /// Allowed data keys, in vocabulary order
    pub keys: Vec<String>,

    /// Retrieved policy context, omitted when empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rag_context: Option<String>,

    /// Extra caller-supplied documents
    pub context_docs: Vec<String>,
}

impl PromptContext {
    pub fn new(vocabulary: &Vocabulary, rag_context: &str, context_docs: &[String]) -> Self {
        let rag_context = rag_context.trim();
        Self {
            keys: vocabulary.keys().to_vec(),
            rag_context: (!rag_context.is_empty()).then(|| rag_context.to_string()),
            context_docs: context_docs
                .iter()
                .filter(|doc| !doc.trim().is_empty())
                .cloned()
                .collect(),
        }
    }
}
