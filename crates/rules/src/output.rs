//! Parsing of language-model replies into a candidate rule.

use serde::Serialize;
use serde_json::Value;

const DEFAULT_EXPLANATION: &str = "Generated rule";

/// A model reply split into the candidate rule and its explanation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelOutput {
    /// Raw rule document; absent when the reply held no JSON at all.
    pub json_logic: Option<Value>,
    pub explanation: String,
}

/// Decode a raw model reply.
///
/// The reply may be wrapped in a Markdown code fence. A JSON object with a
/// `json_logic` member is read as the `{json_logic, explanation}` envelope;
/// any other JSON document is taken as the rule itself. Non-JSON replies
/// yield no rule and keep the text as the explanation.
pub fn parse_model_output(text: &str) -> ModelOutput {
    let body = strip_code_fence(text);

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Model reply is not JSON: {}", e);
            return ModelOutput {
                json_logic: None,
                explanation: text.trim().to_string(),
            };
        }
    };

    match value {
        Value::Object(mut map) if map.contains_key("json_logic") => {
            let json_logic = map.remove("json_logic");
            let explanation = match map.remove("explanation") {
                Some(Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => String::new(),
            };
            ModelOutput {
                json_logic,
                explanation,
            }
        }
        other => {
            tracing::debug!("Model reply has no envelope; using it as the rule");
            ModelOutput {
                json_logic: Some(other),
                explanation: DEFAULT_EXPLANATION.to_string(),
            }
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the opening line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}
