//! System-prompt rendering.

use crate::types::PromptContext;
use handlebars::Handlebars;
use rulegen_core::{AppError, AppResult, Vocabulary};

const TEMPLATE_NAME: &str = "system";

/// Default system prompt for rule generation.
pub const DEFAULT_TEMPLATE: &str = r#"You are an expert at converting natural language business rules into JSON Logic format.

JSON Logic is a format for representing logical rules. You must use ONLY these operators:
- Logical: and, or, if
- Comparison: >, >=, <, <=, ==, !=
- Membership: in
- Arithmetic: +, -, *, /

Available data keys: {{#each keys}}"{{this}}"{{#unless @last}}, {{/unless}}{{/each}}

All variable references must use the format: {"var": "<KEY_NAME>"}

Rules for generating JSON Logic:
1. Parse the user's business rule carefully
2. Identify the conditions and operators
3. Build a valid JSON Logic AST
4. Only use the allowed operators and keys listed above
5. Ensure proper nesting and syntax
6. Provide a brief 1-3 sentence explanation

Output must be valid JSON with this structure:
{
  "json_logic": { ... your JSON Logic rule ... },
  "explanation": "Brief 1-3 sentence explanation in plain English"
}

Example:
User: "Apply discount if user is premium member AND purchase amount is greater than 100"
{
  "json_logic": {
    "and": [
      {"var": "is_premium_member"},
      {">": [{"var": "purchase_amount"}, 100]}
    ]
  },
  "explanation": "This rule applies a discount when the user is a premium member and their purchase amount exceeds $100."
}
{{#if rag_context}}

Relevant Policy Context (use this to inform your rule generation):
{{rag_context}}
{{/if}}
{{#if context_docs}}

Additional Context Documents:
{{#each context_docs}}
{{this}}
{{/each}}
{{/if}}
"#;

/// Renders the system prompt from a Handlebars template.
#[derive(Debug)]
pub struct PromptBuilder {
    handlebars: Handlebars<'static>,
}

impl PromptBuilder {
    /// Builder using [`DEFAULT_TEMPLATE`].
    pub fn new() -> AppResult<Self> {
        Self::with_template(DEFAULT_TEMPLATE)
    }

    /// Builder using a custom template; fails if the template does not parse.
    pub fn with_template(template: &str) -> AppResult<Self> {
        let mut handlebars = Handlebars::new();

        // Disable HTML escaping for plain text
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

        Ok(Self { handlebars })
    }

    pub fn render(&self, context: &PromptContext) -> AppResult<String> {
        self.handlebars
            .render(TEMPLATE_NAME, context)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
    }

    pub fn build(
        &self,
        vocabulary: &Vocabulary,
        rag_context: &str,
        context_docs: &[String],
    ) -> AppResult<String> {
        let context = PromptContext::new(vocabulary, rag_context, context_docs);
        tracing::debug!(
            keys = context.keys.len(),
            has_rag = context.rag_context.is_some(),
            docs = context.context_docs.len(),
            "Building system prompt"
        );
        self.render(&context)
    }
}

/// Render the default system prompt.
///
/// # Example
/// ```
/// use rulegen_core::Vocabulary;
/// use rulegen_prompt::build_system_prompt;
///
/// let vocabulary = Vocabulary::new(["user_age"]);
/// let prompt = build_system_prompt(&vocabulary, "", &[]).unwrap();
/// assert!(prompt.contains(r#"Available data keys: "user_age""#));
/// ```
pub fn build_system_prompt(
    vocabulary: &Vocabulary,
    rag_context: &str,
    context_docs: &[String],
) -> AppResult<String> {
    PromptBuilder::new()?.build(vocabulary, rag_context, context_docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary() -> Vocabulary {
        Vocabulary::new(["user_age", "is_premium_member"])
    }

    #[test]
    fn test_keys_are_quoted_and_joined() {
        let prompt = build_system_prompt(&vocabulary(), "", &[]).unwrap();
        assert!(prompt.contains(r#"Available data keys: "user_age", "is_premium_member""#));
        assert!(prompt.contains(r#"{"var": "<KEY_NAME>"}"#));
        assert!(prompt.contains("- Membership: in"));
    }

    #[test]
    fn test_optional_sections() {
        let bare = build_system_prompt(&vocabulary(), "", &[]).unwrap();
        assert!(!bare.contains("Relevant Policy Context"));
        assert!(!bare.contains("Additional Context Documents"));

        let full = build_system_prompt(
            &vocabulary(),
            "- Premium members get 10% off.",
            &["Orders ship weekly.".to_string()],
        )
        .unwrap();
        let policy = full.find("Relevant Policy Context").unwrap();
        let docs = full.find("Additional Context Documents").unwrap();
        assert!(policy < docs);
        assert!(full.contains("- Premium members get 10% off."));
        assert!(full.contains("Orders ship weekly."));
    }

    #[test]
    fn test_no_html_escaping() {
        let prompt = build_system_prompt(&vocabulary(), "age >= 18 & \"adult\"", &[]).unwrap();
        assert!(prompt.contains("age >= 18 & \"adult\""));
    }

    #[test]
    fn test_custom_template() {
        let builder = PromptBuilder::with_template("keys={{#each keys}}{{this}};{{/each}}").unwrap();
        let rendered = builder.build(&vocabulary(), "", &[]).unwrap();
        assert_eq!(rendered, "keys=user_age;is_premium_member;");
    }

    #[test]
    fn test_invalid_template() {
        let err = PromptBuilder::with_template("{{#if rag_context}}unclosed").unwrap_err();
        assert!(matches!(err, AppError::Prompt(_)));
    }
}
