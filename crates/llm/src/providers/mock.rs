//! Offline provider that always answers with a fixed reply.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use rulegen_core::AppResult;

pub const MOCK_REPLY: &str = "This is a mock response.";

#[derive(Debug, Clone)]
pub struct MockClient {
    reply: String,
}

impl MockClient {
    pub fn new() -> Self {
        Self::with_reply(MOCK_REPLY)
    }

    /// Mock answering with `reply` instead of the default text.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Using mock LLM provider");
        Ok(LlmResponse {
            content: self.reply.clone(),
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_reply() {
        let response = MockClient::new()
            .complete(&LlmRequest::new("anything", "none"))
            .await
            .unwrap();
        assert_eq!(response.content, MOCK_REPLY);
        assert_eq!(response.model, "none");
    }

    #[tokio::test]
    async fn test_custom_reply() {
        let client = MockClient::with_reply(r#"{"json_logic": true}"#);
        let response = client.complete(&LlmRequest::new("x", "m")).await.unwrap();
        assert_eq!(response.content, r#"{"json_logic": true}"#);
    }
}
