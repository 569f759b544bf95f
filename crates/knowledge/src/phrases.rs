//! Heuristic phrase extraction from free-text rule statements.
//!
//! Three passes feed the key mapper: quoted substrings, capitalised tokens and
//! a fixed list of domain terms. Numeric values and boolean polarity are
//! extracted separately as informational output.

use regex::Regex;
use rulegen_core::{AppError, AppResult};
use serde::Serialize;
use std::collections::HashSet;

/// Domain terms matched as case-insensitive substrings.
pub const DOMAIN_TERMS: [&str; 14] = [
    "age",
    "status",
    "purchase",
    "premium",
    "member",
    "account",
    "order",
    "return",
    "email",
    "tag",
    "business",
    "region",
    "loyalty",
    "subscription",
];

/// A number or two-number range found in the text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NumericValue {
    Single(f64),
    Range(f64, f64),
}

/// Coarse polarity signal: `("is", true)` or `("not", false)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BooleanIndicator {
    pub word: &'static str,
    pub value: bool,
}

/// Compiled patterns for the extraction passes.
#[derive(Debug, Clone)]
pub struct PhraseExtractor {
    quoted: Regex,
    non_word: Regex,
    number: Regex,
    range: Regex,
    affirmation: Regex,
    negation: Regex,
}

impl PhraseExtractor {
    pub fn new() -> AppResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| AppError::Knowledge(format!("Invalid pattern {}: {}", pattern, e)))
        };

        Ok(Self {
            quoted: compile(r#""([^"]+)""#)?,
            non_word: compile(r"\W")?,
            number: compile(r"\d+(?:\.\d+)?")?,
            range: compile(
                r"(\d+(?:\.\d+)?)\s*(?:to|through|than|less|more)\s*(\d+(?:\.\d+)?)",
            )?,
            affirmation: compile(r"(?i)\b(?:is|must be|should be|can be)\b")?,
            negation: compile(r"(?i)\b(?:not|cannot|must not)\b")?,
        })
    }

    /// Union of the three passes, each distinct phrase once, in first-seen order.
    pub fn extract_phrases(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut phrases = Vec::new();
        let mut add = |phrase: String| {
            if !phrase.is_empty() && seen.insert(phrase.clone()) {
                phrases.push(phrase);
            }
        };

        for caps in self.quoted.captures_iter(text) {
            add(caps[1].to_string());
        }

        for token in text.split_whitespace() {
            if token.chars().count() <= 3 {
                continue;
            }
            let clean = self.non_word.replace_all(token, "").into_owned();
            let capitalised = clean
                .chars()
                .find(|c| c.is_alphabetic())
                .is_some_and(char::is_uppercase);
            if capitalised {
                add(clean);
            }
        }

        let lower = text.to_lowercase();
        for term in DOMAIN_TERMS {
            if lower.contains(term) {
                add(term.to_string());
            }
        }

        tracing::debug!("Extracted {} phrases", phrases.len());
        phrases
    }

    /// Every decimal number, then every two-number range.
    pub fn extract_numeric_values(&self, text: &str) -> Vec<NumericValue> {
        let singles = self
            .number
            .find_iter(text)
            .filter_map(|m| m.as_str().parse().ok())
            .map(NumericValue::Single);

        let ranges = self.range.captures_iter(text).filter_map(|caps| {
            let start = caps[1].parse().ok()?;
            let end = caps[2].parse().ok()?;
            Some(NumericValue::Range(start, end))
        });

        singles.chain(ranges).collect()
    }

    /// Affirmation and negation words, matched on word boundaries.
    pub fn extract_booleans(&self, text: &str) -> Vec<BooleanIndicator> {
        let mut indicators = Vec::new();
        if self.affirmation.is_match(text) {
            indicators.push(BooleanIndicator {
                word: "is",
                value: true,
            });
        }
        if self.negation.is_match(text) {
            indicators.push(BooleanIndicator {
                word: "not",
                value: false,
            });
        }
        indicators
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> PhraseExtractor {
        PhraseExtractor::new().unwrap()
    }

    #[test]
    fn test_discount_prompt_phrases() {
        let phrases = extractor().extract_phrases(
            "Apply discount if user is premium member and purchase amount is greater than 100",
        );
        assert_eq!(phrases, vec!["Apply", "purchase", "premium", "member"]);
    }

    #[test]
    fn test_quoted_and_capitalised_tokens() {
        let phrases = extractor().extract_phrases(r#"Flag "loyalty tier" when Country, is set"#);
        assert_eq!(phrases[0], "loyalty tier");
        assert!(phrases.contains(&"Flag".to_string()));
        // punctuation is stripped before the capitalisation check
        assert!(phrases.contains(&"Country".to_string()));
        assert!(phrases.contains(&"loyalty".to_string()));
        // short tokens are ignored even when capitalised
        assert!(!phrases.iter().any(|p| p == "Is"));
    }

    #[test]
    fn test_each_phrase_once() {
        let phrases = extractor().extract_phrases("Premium premium PREMIUM \"premium\"");
        let premium = phrases.iter().filter(|p| p.as_str() == "premium").count();
        assert_eq!(premium, 1);
        assert!(phrases.contains(&"Premium".to_string()));
        assert!(phrases.contains(&"PREMIUM".to_string()));
    }

    #[test]
    fn test_no_phrases() {
        assert!(extractor().extract_phrases("if x > 5").is_empty());
        assert!(extractor().extract_phrases("").is_empty());
    }

    #[test]
    fn test_numeric_values_and_ranges() {
        let values = extractor().extract_numeric_values("age from 18 to 65, spend more than 99.5");
        assert_eq!(
            values,
            vec![
                NumericValue::Single(18.0),
                NumericValue::Single(65.0),
                NumericValue::Single(99.5),
                NumericValue::Range(18.0, 65.0),
            ]
        );
    }

    #[test]
    fn test_booleans_on_word_boundaries() {
        let e = extractor();
        assert_eq!(
            e.extract_booleans("user must not be banned"),
            vec![BooleanIndicator {
                word: "not",
                value: false
            }]
        );
        assert_eq!(e.extract_booleans("account is active").len(), 1);
        // "this" and "notice" contain the words but not on boundaries
        assert!(e.extract_booleans("this notice").is_empty());
        assert_eq!(e.extract_booleans("it is, but cannot be").len(), 2);
    }
}
