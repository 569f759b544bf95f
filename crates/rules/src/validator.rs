//! Grammar enforcement for untrusted rule trees.
//!
//! Five checks run in order: syntax, size, depth, variables and operators.
//! A syntax failure short-circuits because nothing else can run on text that
//! is not JSON; every other violation is collected. Objects with several
//! operator keys are checked key by key.

use crate::ast::{escape_pointer, OpTag, Operands, Operator, OperatorNode, RuleNode};
use rulegen_core::config::ValidatorConfig;
use rulegen_core::Vocabulary;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    Syntax,
    Size,
    Depth,
    Variable,
    Operator,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::Syntax => "syntax",
            ViolationKind::Size => "size",
            ViolationKind::Depth => "depth",
            ViolationKind::Variable => "variable",
            ViolationKind::Operator => "operator",
        };
        f.write_str(name)
    }
}

/// One grammar violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    /// JSON pointer of the offending node (`""` is the root)
    pub path: String,
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, path: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "[{}] {}: {}", self.kind, path, self.message)
    }
}

/// Aggregated result of [`RuleValidator::validate_complete`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_parts(self) -> (bool, Vec<Violation>) {
        (self.is_ok(), self.violations)
    }

    /// Violation messages as plain strings.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }

    fn syntax(path: &str, message: impl Into<String>) -> Self {
        Self {
            violations: vec![Violation::new(ViolationKind::Syntax, path, message)],
        }
    }
}

/// Validates rule trees against a vocabulary and size/depth limits.
#[derive(Debug, Clone)]
pub struct RuleValidator {
    vocabulary: Vocabulary,
    config: ValidatorConfig,
}

impl RuleValidator {
    pub fn new(vocabulary: Vocabulary, config: ValidatorConfig) -> Self {
        if !config.enable_strict_mode {
            tracing::debug!("Strict mode disabled; it currently changes no checks");
        }
        Self { vocabulary, config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate raw JSON text.
    pub fn validate_str(&self, text: &str) -> ValidationReport {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.validate_value(&value),
            Err(e) => ValidationReport::syntax("", format!("Invalid JSON syntax: {}", e)),
        }
    }

    /// Validate a decoded JSON document.
    pub fn validate_value(&self, value: &Value) -> ValidationReport {
        self.validate_complete(&RuleNode::from_value(value))
    }

    /// Run every check on a decided tree.
    pub fn validate_complete(&self, tree: &RuleNode) -> ValidationReport {
        let serialized = match check_syntax(tree) {
            Ok(text) => text,
            Err(violation) => {
                return ValidationReport {
                    violations: vec![violation],
                }
            }
        };

        let mut violations = Vec::new();
        violations.extend(check_size(&serialized, self.config.max_size));
        violations.extend(check_depth(tree, "", 0, self.config.max_depth));
        violations.extend(check_variables(tree, "", &self.vocabulary));
        violations.extend(check_operators(tree, ""));

        if violations.is_empty() {
            tracing::debug!("Rule passed validation ({} chars)", serialized.chars().count());
        } else {
            tracing::debug!("Rule failed validation with {} violations", violations.len());
        }

        ValidationReport { violations }
    }
}

/// The tree must survive a text round trip; returns its compact JSON.
fn check_syntax(tree: &RuleNode) -> Result<String, Violation> {
    let text = serde_json::to_string(tree).map_err(|e| {
        Violation::new(
            ViolationKind::Syntax,
            "",
            format!("Rule is not serializable: {}", e),
        )
    })?;
    serde_json::from_str::<RuleNode>(&text).map_err(|e| {
        Violation::new(
            ViolationKind::Syntax,
            "",
            format!("Rule does not decode after serialization: {}", e),
        )
    })?;
    Ok(text)
}

fn check_size(serialized: &str, max_size: usize) -> Vec<Violation> {
    let size = serialized.chars().count();
    if size > max_size {
        vec![Violation::new(
            ViolationKind::Size,
            "",
            format!(
                "Rule size ({} chars) exceeds maximum ({} chars)",
                size, max_size
            ),
        )]
    } else {
        Vec::new()
    }
}

/// Depth counts only through allowed operators.
///
/// Logical operators descend into list or single operands; the others only
/// into list operands. Unknown operators, variables and bare lists are not
/// traversed. A node past the limit records one violation and stops that
/// branch.
fn check_depth(node: &RuleNode, path: &str, depth: usize, max_depth: usize) -> Vec<Violation> {
    if depth > max_depth {
        return vec![Violation::new(
            ViolationKind::Depth,
            path,
            format!("Rule nesting depth exceeds maximum ({})", max_depth),
        )];
    }

    node.operations()
        .iter()
        .flat_map(|op| operation_depth(op, path, depth, max_depth))
        .collect()
}

fn operation_depth(
    node: &OperatorNode,
    path: &str,
    depth: usize,
    max_depth: usize,
) -> Vec<Violation> {
    let OpTag::Known(op) = &node.tag else {
        return Vec::new();
    };

    let child_path = operand_path(path, op.as_str());
    match &node.operands {
        Operands::List(items) => items
            .iter()
            .enumerate()
            .flat_map(|(i, item)| {
                check_depth(item, &format!("{}/{}", child_path, i), depth + 1, max_depth)
            })
            .collect(),
        Operands::Single(inner) if op.is_logical() => {
            check_depth(inner, &child_path, depth + 1, max_depth)
        }
        Operands::Single(_) => Vec::new(),
    }
}

fn check_variables(node: &RuleNode, path: &str, vocabulary: &Vocabulary) -> Vec<Violation> {
    match node {
        RuleNode::Var(key) if vocabulary.contains(key) => Vec::new(),
        RuleNode::Var(key) => vec![Violation::new(
            ViolationKind::Variable,
            path,
            format!(
                "Unknown variable '{}'. Allowed: [{}]",
                key,
                sorted_keys(vocabulary)
            ),
        )],
        RuleNode::Literal(_) => Vec::new(),
        RuleNode::List(items) => items
            .iter()
            .enumerate()
            .flat_map(|(i, item)| check_variables(item, &format!("{}/{}", path, i), vocabulary))
            .collect(),
        RuleNode::Operation(_) | RuleNode::Object(_) => node
            .operations()
            .iter()
            .flat_map(|op| {
                for_each_operand(op, path, |child, child_path| {
                    check_variables(child, child_path, vocabulary)
                })
            })
            .collect(),
    }
}

fn check_operators(node: &RuleNode, path: &str) -> Vec<Violation> {
    match node {
        RuleNode::Var(_) | RuleNode::Literal(_) => Vec::new(),
        RuleNode::List(items) => items
            .iter()
            .enumerate()
            .flat_map(|(i, item)| check_operators(item, &format!("{}/{}", path, i)))
            .collect(),
        RuleNode::Operation(_) | RuleNode::Object(_) => {
            let mut violations = Vec::new();
            for op in node.operations() {
                if let OpTag::Unknown(tag) = &op.tag {
                    tracing::warn!("Unknown operator: {}", tag);
                    violations.push(Violation::new(
                        ViolationKind::Operator,
                        path,
                        format!("Operator '{}' is not allowed", tag),
                    ));
                }
                violations.extend(for_each_operand(op, path, check_operators));
            }
            violations
        }
    }
}

/// Apply `check` to every operand of an operation, with its path.
fn for_each_operand<F>(op: &OperatorNode, path: &str, check: F) -> Vec<Violation>
where
    F: Fn(&RuleNode, &str) -> Vec<Violation>,
{
    let child_path = operand_path(path, op.tag.as_str());
    match &op.operands {
        Operands::Single(inner) => check(inner, &child_path),
        Operands::List(items) => items
            .iter()
            .enumerate()
            .flat_map(|(i, item)| check(item, &format!("{}/{}", child_path, i)))
            .collect(),
    }
}

fn operand_path(path: &str, tag: &str) -> String {
    format!("{}/{}", path, escape_pointer(tag))
}

fn sorted_keys(vocabulary: &Vocabulary) -> String {
    let mut keys: Vec<&str> = vocabulary.iter().collect();
    keys.sort_unstable();
    keys.join(", ")
}

/// Allowed operator tags, in canonical order.
pub fn allowed_operators() -> impl Iterator<Item = &'static str> {
    Operator::ALL.into_iter().map(|op| op.as_str())
}
