//! Retrieve command handler.

use crate::commands::print_json;
use crate::context::AppContext;
use clap::Args;
use rulegen_core::AppResult;

/// Show the policy context retrieved for a query
#[derive(Args, Debug)]
pub struct RetrieveCommand {
    /// Query text
    pub query: String,

    /// Output as JSON (with similarity scores)
    #[arg(long)]
    pub json: bool,
}

impl RetrieveCommand {
    pub async fn execute(&self, ctx: &AppContext) -> AppResult<()> {
        tracing::info!("Executing retrieve command");

        let retriever = ctx.retriever().await?;

        if self.json {
            let snippets = retriever.retrieve_with_scores(&self.query).await?;
            return print_json(&snippets);
        }

        let context = retriever.retrieve(&self.query).await?;
        if context.is_empty() {
            println!("No relevant policy context found.");
        } else {
            println!("{}", context);
        }
        Ok(())
    }
}
