//! Expression tree for JSON Logic rules.
//!
//! A rule document is decided once into a [`RuleNode`]; later passes match on
//! the enum instead of re-inspecting raw JSON. Every JSON value has a tree:
//! operator keys outside the allowed set are kept as [`OpTag::Unknown`] so the
//! validator can report them, and objects with zero or several operator keys
//! become [`RuleNode::Object`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Allowed operator tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
    If,
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
    In,
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub const ALL: [Operator; 14] = [
        Operator::And,
        Operator::Or,
        Operator::If,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Eq,
        Operator::Ne,
        Operator::In,
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
    ];

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == tag)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::If => "if",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::In => "in",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
        }
    }

    /// `and`, `or` and `if`.
    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::And | Operator::Or | Operator::If)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte | Operator::Eq | Operator::Ne
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator key of an operation node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpTag {
    Known(Operator),
    /// Any key outside the allowed set, kept verbatim
    Unknown(String),
}

impl OpTag {
    pub fn parse(tag: &str) -> Self {
        Operator::parse(tag)
            .map(OpTag::Known)
            .unwrap_or_else(|| OpTag::Unknown(tag.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            OpTag::Known(op) => op.as_str(),
            OpTag::Unknown(tag) => tag,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Literal {
    fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(n.clone()),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

/// Operands of an operation: one node, or an ordered list.
#[derive(Debug, Clone, PartialEq)]
pub enum Operands {
    Single(Box<RuleNode>),
    List(Vec<RuleNode>),
}

impl Operands {
    fn to_value(&self) -> Value {
        match self {
            Operands::Single(inner) => inner.to_value(),
            Operands::List(items) => Value::Array(items.iter().map(RuleNode::to_value).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorNode {
    pub tag: OpTag,
    pub operands: Operands,
}

/// One node of a rule tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    /// `{"var": "<key>"}`; any sibling keys are ignored
    Var(String),
    Literal(Literal),
    /// Bare array, e.g. the haystack of `in`
    List(Vec<RuleNode>),
    /// Object with exactly one operator key
    Operation(OperatorNode),
    /// Object with zero or several operator keys, in key order
    Object(Vec<OperatorNode>),
}

impl RuleNode {
    pub fn var(key: impl Into<String>) -> Self {
        RuleNode::Var(key.into())
    }

    pub fn operation(op: Operator, operands: Vec<RuleNode>) -> Self {
        RuleNode::Operation(OperatorNode {
            tag: OpTag::Known(op),
            operands: Operands::List(operands),
        })
    }

    /// Decide a JSON document as a rule tree.
    ///
    /// An object holding `var` is a variable. A `var` whose argument is not a
    /// string keeps the argument's JSON text as its key, which the vocabulary
    /// check will then reject.
    pub fn from_value(value: &Value) -> Self {
        parse_node(value)
    }

    /// Operator entries of an object node; empty for every other node.
    pub fn operations(&self) -> &[OperatorNode] {
        match self {
            RuleNode::Operation(op) => std::slice::from_ref(op),
            RuleNode::Object(ops) => ops,
            _ => &[],
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RuleNode::Var(key) => {
                let mut map = Map::new();
                map.insert("var".to_string(), Value::String(key.clone()));
                Value::Object(map)
            }
            RuleNode::Literal(literal) => literal.to_value(),
            RuleNode::List(items) => Value::Array(items.iter().map(RuleNode::to_value).collect()),
            RuleNode::Operation(_) | RuleNode::Object(_) => Value::Object(
                self.operations()
                    .iter()
                    .map(|op| (op.tag.as_str().to_string(), op.operands.to_value()))
                    .collect(),
            ),
        }
    }

    /// Compact JSON text of the tree.
    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }
}

fn parse_node(value: &Value) -> RuleNode {
    match value {
        Value::Null => RuleNode::Literal(Literal::Null),
        Value::Bool(b) => RuleNode::Literal(Literal::Bool(*b)),
        Value::Number(n) => RuleNode::Literal(Literal::Number(n.clone())),
        Value::String(s) => RuleNode::Literal(Literal::String(s.clone())),
        Value::Array(items) => RuleNode::List(items.iter().map(parse_node).collect()),
        Value::Object(map) => {
            if let Some(operand) = map.get("var") {
                let name = match operand {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                return RuleNode::Var(name);
            }

            let operations: Vec<OperatorNode> = map
                .iter()
                .map(|(key, operand)| OperatorNode {
                    tag: OpTag::parse(key),
                    operands: match operand {
                        Value::Array(items) => Operands::List(items.iter().map(parse_node).collect()),
                        other => Operands::Single(Box::new(parse_node(other))),
                    },
                })
                .collect();

            match <[OperatorNode; 1]>::try_from(operations) {
                Ok([only]) => RuleNode::Operation(only),
                Err(operations) => RuleNode::Object(operations),
            }
        }
    }
}

/// Escape a key as a JSON pointer segment (`~` and `/`).
pub fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

impl Serialize for RuleNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RuleNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(RuleNode::from_value(&value))
    }
}

impl From<bool> for RuleNode {
    fn from(value: bool) -> Self {
        RuleNode::Literal(Literal::Bool(value))
    }
}

impl From<i64> for RuleNode {
    fn from(value: i64) -> Self {
        RuleNode::Literal(Literal::Number(value.into()))
    }
}

impl From<i32> for RuleNode {
    fn from(value: i32) -> Self {
        RuleNode::Literal(Literal::Number(value.into()))
    }
}

impl From<f64> for RuleNode {
    /// Non-finite numbers have no JSON form and become `null`.
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(|n| RuleNode::Literal(Literal::Number(n)))
            .unwrap_or(RuleNode::Literal(Literal::Null))
    }
}

impl From<&str> for RuleNode {
    fn from(value: &str) -> Self {
        RuleNode::Literal(Literal::String(value.to_string()))
    }
}

impl From<String> for RuleNode {
    fn from(value: String) -> Self {
        RuleNode::Literal(Literal::String(value))
    }
}
