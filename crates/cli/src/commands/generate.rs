//! Generate command handler.
//!
//! Runs the full pipeline: key mapping, policy retrieval, prompt
//! construction, model call, output parsing and validation.

use crate::commands::{print_json, read_input};
use crate::context::AppContext;
use clap::Args;
use rulegen_core::{AppError, AppResult};
use rulegen_knowledge::{KeyMapping, MappingMiss, MappingOutcome};
use rulegen_llm::LlmRequest;
use rulegen_rules::{parse_model_output, ModelOutput, ValidationReport};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

const MAX_REPORTED_MISSES: usize = 3;

/// Generate a JSON Logic rule from a natural-language statement
#[derive(Args, Debug)]
pub struct GenerateCommand {
    /// Natural-language rule statement
    pub prompt: String,

    /// Extra context document text (repeatable)
    #[arg(long = "context")]
    pub context_docs: Vec<String>,

    /// Extra context document files (repeatable, `-` for stdin)
    #[arg(long = "context-file")]
    pub context_files: Vec<PathBuf>,

    /// Skip policy retrieval even when enabled in config
    #[arg(long)]
    pub no_rag: bool,
}

/// Result of one generation, printed as JSON.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub json_logic: Value,
    pub explanation: String,
    pub used_keys: Vec<String>,
    pub key_mappings: Vec<KeyMapping>,
    pub confidence_score: f64,
    pub validation_errors: Vec<String>,
}

impl GenerateResponse {
    fn assemble(outcome: MappingOutcome, output: ModelOutput, report: &ValidationReport) -> Self {
        let confidence = f64::from(outcome.confidence());
        Self {
            json_logic: output
                .json_logic
                .unwrap_or_else(|| Value::Object(Default::default())),
            explanation: output.explanation,
            used_keys: outcome.used_keys(),
            key_mappings: outcome.mappings,
            confidence_score: (confidence * 10_000.0).round() / 10_000.0,
            validation_errors: report.messages(),
        }
    }
}

impl GenerateCommand {
    pub async fn execute(&self, ctx: &AppContext) -> AppResult<()> {
        let preview: String = self.prompt.chars().take(100).collect();
        tracing::info!("Generating rule for prompt: {}...", preview);

        let mapper = ctx.key_mapper().await?;
        let outcome = mapper.map_phrases(&self.prompt).await?;
        if outcome.is_fatal() {
            return Err(AppError::Rule(format!(
                "Phrase mapping confidence below threshold. Suggestions: {}",
                summarize_misses(&outcome.misses)
            )));
        }

        let rag_context = if ctx.config.rag.enabled && !self.no_rag {
            ctx.retriever().await?.retrieve(&self.prompt).await?
        } else {
            String::new()
        };

        let mut context_docs = self.context_docs.clone();
        for path in &self.context_files {
            context_docs.push(read_input(path)?);
        }

        let system_prompt = ctx
            .prompt_builder()?
            .build(&ctx.vocabulary, &rag_context, &context_docs)?;

        let client = ctx.llm_client()?;
        let request =
            LlmRequest::from_config(self.prompt.clone(), &ctx.config.llm).with_system(system_prompt);
        let response = client.complete(&request).await?;
        tracing::debug!(
            provider = client.provider_name(),
            tokens = response.usage.total_tokens,
            "Model replied"
        );

        let output = parse_model_output(&response.content);
        let no_rule = Value::Object(Default::default());
        let report = ctx
            .validator()
            .validate_value(output.json_logic.as_ref().unwrap_or(&no_rule));
        if !report.is_ok() {
            tracing::warn!("Validation errors: {:?}", report.messages());
        }

        let result = GenerateResponse::assemble(outcome, output, &report);
        tracing::info!("Generated rule with confidence: {}", result.confidence_score);
        print_json(&result)
    }
}

/// Join miss messages, keeping at most three.
fn summarize_misses(misses: &[MappingMiss]) -> String {
    let shown: Vec<String> = misses
        .iter()
        .take(MAX_REPORTED_MISSES)
        .map(ToString::to_string)
        .collect();
    let mut summary = shown.join(". ");
    if misses.len() > MAX_REPORTED_MISSES {
        summary.push_str("...");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulegen_core::config::ValidatorConfig;
    use rulegen_core::Vocabulary;
    use rulegen_rules::RuleValidator;

    fn miss(phrase: &str) -> MappingMiss {
        MappingMiss {
            phrase: phrase.to_string(),
            best_similarity: None,
            suggestions: Vec::new(),
        }
    }

    #[test]
    fn test_summarize_at_most_three_misses() {
        let two = summarize_misses(&[miss("a"), miss("b")]);
        assert_eq!(
            two,
            "No matches found for phrase: a. No matches found for phrase: b"
        );

        let five: Vec<MappingMiss> = ["a", "b", "c", "d", "e"].into_iter().map(miss).collect();
        let summary = summarize_misses(&five);
        assert!(summary.ends_with("phrase: c..."));
        assert!(!summary.contains("phrase: d"));
    }

    #[test]
    fn test_assemble_response() {
        let outcome = MappingOutcome {
            mappings: vec![
                KeyMapping {
                    user_phrase: "premium".to_string(),
                    mapped_to: "is_premium_member".to_string(),
                    similarity: 0.9,
                },
                KeyMapping {
                    user_phrase: "member".to_string(),
                    mapped_to: "is_premium_member".to_string(),
                    similarity: 0.8,
                },
            ],
            misses: vec![miss("Apply")],
        };
        let output = parse_model_output(
            r#"{"json_logic": {"==": [{"var": "is_premium_member"}, true]}, "explanation": "Members."}"#,
        );
        let validator = RuleValidator::new(
            Vocabulary::new(["is_premium_member"]),
            ValidatorConfig::default(),
        );
        let report = validator.validate_value(output.json_logic.as_ref().unwrap());

        let response = GenerateResponse::assemble(outcome, output, &report);
        assert_eq!(response.used_keys, vec!["is_premium_member"]);
        assert_eq!(response.key_mappings.len(), 2);
        assert!((response.confidence_score - 0.85).abs() < 1e-4);
        assert!(response.validation_errors.is_empty());
        assert_eq!(response.explanation, "Members.");
    }

    #[test]
    fn test_missing_rule_becomes_empty_object() {
        let outcome = MappingOutcome {
            mappings: Vec::new(),
            misses: Vec::new(),
        };
        let output = parse_model_output("This is a mock response.");
        let report = RuleValidator::new(Vocabulary::default(), ValidatorConfig::default())
            .validate_value(&Value::Object(Default::default()));

        let response = GenerateResponse::assemble(outcome, output, &report);
        assert_eq!(response.json_logic, serde_json::json!({}));
        assert_eq!(response.confidence_score, 0.5);
        assert!(response.validation_errors.is_empty());
        assert_eq!(response.explanation, "This is a mock response.");
    }
}
