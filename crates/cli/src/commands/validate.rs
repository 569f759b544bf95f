//! Validate command handler.

use crate::commands::{print_json, read_input};
use crate::context::AppContext;
use clap::Args;
use rulegen_core::{AppError, AppResult};
use std::path::PathBuf;

/// Check a JSON Logic document against the operator set and vocabulary
#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Rule file, or `-` for stdin
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ValidateCommand {
    pub async fn execute(&self, ctx: &AppContext) -> AppResult<()> {
        tracing::info!("Executing validate command for {:?}", self.file);

        let text = read_input(&self.file)?;
        let report = ctx.validator().validate_str(&text);

        if self.json {
            print_json(&serde_json::json!({
                "valid": report.is_ok(),
                "violations": report.violations,
            }))?;
        } else if report.is_ok() {
            println!("Rule is valid.");
        } else {
            for message in report.messages() {
                println!("{}", message);
            }
        }

        if report.is_ok() {
            Ok(())
        } else {
            Err(AppError::Rule(format!(
                "Rule failed validation with {} violation(s)",
                report.violations.len()
            )))
        }
    }
}
