//! Construction helpers for well-formed rule trees.
//!
//! The builder never consults the vocabulary; variable keys are checked by
//! the validator.

use crate::ast::{Operator, RuleNode};
use rulegen_core::{AppError, AppResult};

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBuilder;

impl RuleBuilder {
    pub fn new() -> Self {
        Self
    }

    /// `{"<op>": [{"var": key}, value]}`.
    ///
    /// # Example
    /// ```
    /// use rulegen_rules::RuleBuilder;
    ///
    /// let rule = RuleBuilder::new().condition("user_age", ">", 18).unwrap();
    /// assert_eq!(rule.to_json_string(), r#"{">":[{"var":"user_age"},18]}"#);
    /// ```
    pub fn condition(
        &self,
        key: &str,
        operator: &str,
        value: impl Into<RuleNode>,
    ) -> AppResult<RuleNode> {
        let op = Operator::parse(operator)
            .ok_or_else(|| AppError::InvalidOperator(operator.to_string()))?;
        Ok(RuleNode::operation(op, vec![RuleNode::var(key), value.into()]))
    }

    /// Conjunction; a single condition is returned unwrapped.
    pub fn and(&self, conditions: Vec<RuleNode>) -> AppResult<RuleNode> {
        combine(Operator::And, conditions)
    }

    /// Disjunction; a single condition is returned unwrapped.
    pub fn or(&self, conditions: Vec<RuleNode>) -> AppResult<RuleNode> {
        combine(Operator::Or, conditions)
    }

    pub fn if_then(
        &self,
        condition: RuleNode,
        then: RuleNode,
        otherwise: Option<RuleNode>,
    ) -> RuleNode {
        let mut operands = vec![condition, then];
        operands.extend(otherwise);
        RuleNode::operation(Operator::If, operands)
    }

    /// `{"in": [value, [items...]]}`.
    pub fn membership(&self, value: impl Into<RuleNode>, array: Vec<RuleNode>) -> RuleNode {
        RuleNode::operation(Operator::In, vec![value.into(), RuleNode::List(array)])
    }

    /// `{"<op>": [lhs, rhs]}` for `+ - * /`.
    pub fn arithmetic(
        &self,
        operator: &str,
        lhs: impl Into<RuleNode>,
        rhs: impl Into<RuleNode>,
    ) -> AppResult<RuleNode> {
        match Operator::parse(operator) {
            Some(op) if op.is_arithmetic() => {
                Ok(RuleNode::operation(op, vec![lhs.into(), rhs.into()]))
            }
            _ => Err(AppError::InvalidOperator(operator.to_string())),
        }
    }
}

fn combine(op: Operator, mut conditions: Vec<RuleNode>) -> AppResult<RuleNode> {
    match conditions.len() {
        0 => Err(AppError::EmptyConditionSet(op.as_str().to_string())),
        1 => Ok(conditions.remove(0)),
        _ => Ok(RuleNode::operation(op, conditions)),
    }
}
