//! Components shared by the commands, built once from the configuration.

use rulegen_core::{config::AppConfig, AppResult, Vocabulary};
use rulegen_knowledge::{create_index, create_provider, EmbeddingProvider, IndexKind, KeyMapper, Retriever};
use rulegen_llm::{create_client, LlmClient};
use rulegen_prompt::PromptBuilder;
use rulegen_rules::RuleValidator;
use std::sync::Arc;

#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub vocabulary: Vocabulary,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl AppContext {
    /// Load the vocabulary and create the embedding provider.
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        let vocabulary_path = config.resolve_path(&config.vocabulary_path);
        let vocabulary = Vocabulary::load(&vocabulary_path)?;
        tracing::info!("Loaded {} vocabulary keys", vocabulary.len());

        let api_key = config.resolve_embedding_api_key();
        let embedder = create_provider(&config.embedding, api_key.as_deref()).await?;

        Ok(Self {
            config,
            vocabulary,
            embedder,
        })
    }

    pub fn index_kind(&self) -> IndexKind {
        IndexKind::parse(&self.config.vector_store.kind)
    }

    pub async fn key_mapper(&self) -> AppResult<KeyMapper> {
        KeyMapper::build(
            &self.vocabulary,
            Arc::clone(&self.embedder),
            create_index(self.index_kind()),
            self.config.mapper.clone(),
        )
        .await
    }

    /// Retriever over the configured policy documents.
    pub async fn retriever(&self) -> AppResult<Retriever> {
        let mut retriever = Retriever::new(
            Arc::clone(&self.embedder),
            create_index(self.index_kind()),
            self.config.rag.clone(),
        );
        let docs_path = self.config.resolve_path(&self.config.rag.docs_path);
        let chunks = retriever.index_file(&docs_path).await?;
        tracing::info!("Indexed {} policy chunks from {:?}", chunks, docs_path);
        Ok(retriever)
    }

    pub fn validator(&self) -> RuleValidator {
        RuleValidator::new(self.vocabulary.clone(), self.config.jsonlogic.clone())
    }

    pub fn llm_client(&self) -> AppResult<Arc<dyn LlmClient>> {
        let api_key = self.config.resolve_llm_api_key();
        create_client(&self.config.llm, api_key.as_deref())
    }

    pub fn prompt_builder(&self) -> AppResult<PromptBuilder> {
        rulegen_prompt::builder_for(&self.config.rulegen_dir())
    }
}
