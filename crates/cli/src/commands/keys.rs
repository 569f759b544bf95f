//! Keys command handler.

use crate::commands::print_json;
use crate::context::AppContext;
use clap::Args;
use rulegen_core::AppResult;

/// List the vocabulary keys rules may reference
#[derive(Args, Debug)]
pub struct KeysCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KeysCommand {
    pub async fn execute(&self, ctx: &AppContext) -> AppResult<()> {
        tracing::info!("Executing keys command");

        if self.json {
            let output = serde_json::json!({
                "keys": ctx.vocabulary.keys(),
                "count": ctx.vocabulary.len(),
            });
            return print_json(&output);
        }

        if ctx.vocabulary.is_empty() {
            println!(
                "No keys loaded from {:?}",
                ctx.config.resolve_path(&ctx.config.vocabulary_path)
            );
            return Ok(());
        }

        for key in ctx.vocabulary.iter() {
            println!("{}", key);
        }
        println!("\n{} keys", ctx.vocabulary.len());
        Ok(())
    }
}
