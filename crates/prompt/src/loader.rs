//! Workspace template overrides.

use crate::builder::PromptBuilder;
use rulegen_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Location of the system-prompt override under a `.rulegen` directory.
pub fn template_path(rulegen_dir: &Path) -> PathBuf {
    rulegen_dir.join("prompts").join("system.hbs")
}

/// Load the override template from `.rulegen/prompts/system.hbs`, if any.
///
/// An empty file counts as absent.
pub fn load_template(rulegen_dir: &Path) -> AppResult<Option<String>> {
    let path = template_path(rulegen_dir);

    if !path.exists() {
        tracing::debug!("No prompt override at {:?}", path);
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| {
        AppError::Prompt(format!("Failed to read prompt template {:?}: {}", path, e))
    })?;

    if contents.trim().is_empty() {
        tracing::warn!("Prompt template {:?} is empty; using the default", path);
        return Ok(None);
    }

    tracing::info!("Loaded prompt template: {:?}", path);
    Ok(Some(contents))
}

/// Builder for a workspace: the override template when present, else the default.
pub fn builder_for(rulegen_dir: &Path) -> AppResult<PromptBuilder> {
    match load_template(rulegen_dir)? {
        Some(template) => PromptBuilder::with_template(&template),
        None => PromptBuilder::new(),
    }
}
