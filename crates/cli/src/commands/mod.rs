//! Command handlers for the rulegen CLI.

pub mod generate;
pub mod index;
pub mod keys;
pub mod map;
pub mod retrieve;
pub mod validate;

pub use generate::GenerateCommand;
pub use index::IndexCommand;
pub use keys::KeysCommand;
pub use map::MapCommand;
pub use retrieve::RetrieveCommand;
pub use validate::ValidateCommand;

use rulegen_core::{AppError, AppResult};
use serde::Serialize;

/// Pretty-print a value as JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    println!("{}", text);
    Ok(())
}

/// Read a document from a path, or from stdin when the path is `-`.
pub(crate) fn read_input(path: &std::path::Path) -> AppResult<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {:?}: {}", path, e)))
    }
}
