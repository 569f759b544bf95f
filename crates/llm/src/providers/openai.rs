//! OpenAI chat completions (`POST {endpoint}/v1/chat/completions`).

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use reqwest::header;
use rulegen_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

#[derive(Debug)]
pub struct OpenAiClient {
    client: reqwest::Client,
    url_chat: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_request(request: &'a LlmRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        Self {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl OpenAiClient {
    /// Build a client with bearer authentication and a request timeout.
    pub fn new(endpoint: Option<&str>, api_key: &str, timeout: Duration) -> AppResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| AppError::Llm(format!("Invalid API key header: {}", e)))?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        let base = endpoint.unwrap_or(DEFAULT_OPENAI_URL).trim_end_matches('/');
        let url_chat = format!("{}/v1/chat/completions", base);
        info!(url = %url_chat, timeout_secs = timeout.as_secs(), "OpenAI client initialized");

        Ok(Self { client, url_chat })
    }
}

fn into_response(out: ChatCompletionResponse, requested_model: &str) -> AppResult<LlmResponse> {
    let content = out
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AppError::Llm("OpenAI returned no choices".to_string()))?;

    let usage = out
        .usage
        .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    Ok(LlmResponse {
        content,
        model: out.model.unwrap_or_else(|| requested_model.to_string()),
        usage,
    })
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let started = Instant::now();
        let body = ChatCompletionRequest::from_request(request);

        debug!(
            model = %request.model,
            prompt_len = request.prompt.len(),
            has_system = request.system.is_some(),
            "POST {}", self.url_chat
        );

        let resp = self
            .client
            .post(&self.url_chat)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("OpenAI request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(
                %status,
                latency_ms = started.elapsed().as_millis(),
                "OpenAI /v1/chat/completions returned non-success status"
            );
            return Err(AppError::Llm(format!(
                "OpenAI API error ({}): {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let out: ChatCompletionResponse = resp.json().await.map_err(|e| {
            AppError::Llm(format!(
                "Failed to decode OpenAI response: {}; expected `choices[0].message.content`",
                e
            ))
        })?;

        debug!(latency_ms = started.elapsed().as_millis(), "OpenAI completion received");
        into_response(out, &request.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_messages() {
        let request = LlmRequest::new("Adults only", "gpt-4-turbo").with_system("Use JSON Logic");
        let body = serde_json::to_value(ChatCompletionRequest::from_request(&request)).unwrap();

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Adults only");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_empty_system_prompt_is_omitted() {
        let request = LlmRequest::new("x", "m").with_system("");
        let body = serde_json::to_value(ChatCompletionRequest::from_request(&request)).unwrap();
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_response_decoding() {
        let out: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}],
                "usage":{"prompt_tokens":5,"completion_tokens":1,"total_tokens":6}}"#,
        )
        .unwrap();
        let response = into_response(out, "gpt-4-turbo").unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(response.model, "gpt-4-turbo");
        assert_eq!(response.usage.total_tokens, 6);
    }

    #[test]
    fn test_no_choices_is_an_error() {
        let out: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            into_response(out, "m"),
            Err(AppError::Llm(_))
        ));
    }

    #[test]
    fn test_endpoint_normalization() {
        let client =
            OpenAiClient::new(Some("http://proxy:8080/"), "sk-test", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.url_chat, "http://proxy:8080/v1/chat/completions");
    }
}
