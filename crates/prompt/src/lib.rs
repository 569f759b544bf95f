//! System-prompt construction for rule generation.
//!
//! The prompt lists the allowed operators and data keys, the expected output
//! envelope, and optional policy context. It is rendered with Handlebars; a
//! workspace may override the template in `.rulegen/prompts/system.hbs`.

pub mod builder;
pub mod loader;
pub mod types;

pub use builder::{build_system_prompt, PromptBuilder, DEFAULT_TEMPLATE};
pub use loader::{builder_for, load_template, template_path};
pub use types::PromptContext;
