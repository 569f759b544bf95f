//! OpenAI embedding provider (`POST {endpoint}/v1/embeddings`).
//!
//! Texts are sent in batches of `batch_size`; the API returns one item per
//! input tagged with its index, which is used to restore input order.

use crate::embeddings::EmbeddingConfig;
use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use reqwest::header;
use rulegen_core::AppError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    /// Build the provider with a bearer-token HTTP client.
    pub fn new(config: EmbeddingConfig, api_key: &str) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| AppError::Knowledge(format!("Invalid API key header: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .map_err(|e| {
                AppError::Knowledge(format!("Failed to create HTTP client for OpenAI: {}", e))
            })?;

        let base = config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_URL)
            .trim_end_matches('/');

        Ok(Self {
            client,
            url: format!("{}/v1/embeddings", base),
            model: config.model,
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        })
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let started = Instant::now();
        let body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        debug!("POST {}", self.url);

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Knowledge(format!("OpenAI request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(%status, latency_ms = started.elapsed().as_millis(), "OpenAI /v1/embeddings returned non-success status");
            return Err(AppError::Knowledge(format!(
                "OpenAI API error ({}): {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let out: EmbeddingsResponse = resp.json().await.map_err(|e| {
            AppError::Knowledge(format!("Failed to decode OpenAI embeddings response: {}", e))
        })?;

        order_embeddings(out, texts.len(), self.dimensions)
    }
}

/// Restore input order and enforce the configured dimension.
fn order_embeddings(
    mut out: EmbeddingsResponse,
    expected_len: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>, AppError> {
    if out.data.len() != expected_len {
        return Err(AppError::Knowledge(format!(
            "OpenAI returned {} embeddings for {} inputs",
            out.data.len(),
            expected_len
        )));
    }

    out.data.sort_by_key(|item| item.index);
    out.data
        .into_iter()
        .map(|item| {
            if item.embedding.len() != dimensions {
                return Err(AppError::DimensionMismatch {
                    expected: dimensions,
                    actual: item.embedding.len(),
                });
            }
            Ok(item.embedding)
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_chunk(chunk).await?);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> EmbeddingsResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_order_embeddings_by_index() {
        let out = response(
            r#"{"data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]}"#,
        );
        let ordered = order_embeddings(out, 2, 2).unwrap();
        assert_eq!(ordered, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_order_embeddings_dimension_mismatch() {
        let out = response(r#"{"data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]}"#);
        assert!(matches!(
            order_embeddings(out, 1, 2),
            Err(AppError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_order_embeddings_count_mismatch() {
        let out = response(r#"{"data": []}"#);
        assert!(order_embeddings(out, 1, 2).is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            endpoint: Some("http://127.0.0.1:9".to_string()),
            ..Default::default()
        };
        let provider = OpenAiProvider::new(config, "sk-test").unwrap();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
