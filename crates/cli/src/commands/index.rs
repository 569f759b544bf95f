//! Index command handler.

use crate::context::AppContext;
use clap::{Args, Subcommand};
use rulegen_core::AppResult;
use std::path::PathBuf;

/// Vocabulary index management
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Embed the vocabulary and persist its index to a directory
    Save(IndexSaveCommand),
}

#[derive(Args, Debug)]
pub struct IndexSaveCommand {
    /// Target directory (created if missing)
    pub dir: PathBuf,
}

impl IndexCommand {
    pub async fn execute(&self, ctx: &AppContext) -> AppResult<()> {
        match &self.action {
            IndexAction::Save(cmd) => cmd.execute(ctx).await,
        }
    }
}

impl IndexSaveCommand {
    pub async fn execute(&self, ctx: &AppContext) -> AppResult<()> {
        tracing::info!("Executing index save command");

        let mapper = ctx.key_mapper().await?;
        let index = mapper.index();
        let dir = ctx.config.resolve_path(&self.dir);
        index.save(&dir).await?;

        println!(
            "Saved {} index with {} keys ({} dimensions) to {}",
            index.kind(),
            index.len(),
            index.dimension().unwrap_or(0),
            dir.display()
        );
        Ok(())
    }
}
