//! Map command handler.

use crate::commands::print_json;
use crate::context::AppContext;
use clap::Args;
use rulegen_core::AppResult;

/// Ground the phrases of a rule statement in vocabulary keys
#[derive(Args, Debug)]
pub struct MapCommand {
    /// Natural-language rule statement
    pub text: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl MapCommand {
    pub async fn execute(&self, ctx: &AppContext) -> AppResult<()> {
        tracing::info!("Executing map command");

        let mapper = ctx.key_mapper().await?;
        let outcome = mapper.map_phrases(&self.text).await?;

        if self.json {
            let output = serde_json::json!({
                "mappings": outcome.mappings,
                "misses": outcome.misses,
                "used_keys": outcome.used_keys(),
                "confidence_score": outcome.confidence(),
            });
            return print_json(&output);
        }

        if outcome.mappings.is_empty() {
            println!("No phrases mapped.");
        }
        for mapping in &outcome.mappings {
            println!(
                "{:<24} -> {:<24} ({:.3})",
                mapping.user_phrase, mapping.mapped_to, mapping.similarity
            );
        }
        for miss in &outcome.misses {
            println!("  ! {}", miss);
        }
        println!("\nConfidence: {:.4}", outcome.confidence());

        Ok(())
    }
}
