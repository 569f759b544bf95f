//! Rule trees, construction helpers and grammar validation.
//!
//! Rules are JSON Logic documents restricted to a small operator set and a
//! vocabulary of variable keys.

pub mod ast;
pub mod builder;
pub mod output;
pub mod validator;

pub use ast::{Literal, OpTag, Operands, Operator, OperatorNode, RuleNode};
pub use builder::RuleBuilder;
pub use output::{parse_model_output, ModelOutput};
pub use validator::{RuleValidator, ValidationReport, Violation, ViolationKind};
