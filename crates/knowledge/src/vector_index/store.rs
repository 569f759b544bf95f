//! Entry bookkeeping and on-disk helpers shared by the index strategies.

use super::IndexedEntry;
use rulegen_core::{AppError, AppResult};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Name of the `id<TAB>text` metadata file written next to the vectors.
pub const METADATA_FILE: &str = "metadata.tsv";

/// Ids and source texts in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryTable {
    ids: Vec<String>,
    texts: Vec<String>,
}

impl EntryTable {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn id(&self, position: usize) -> Option<&str> {
        self.ids.get(position).map(String::as_str)
    }

    pub fn text(&self, position: usize) -> Option<&str> {
        self.texts.get(position).map(String::as_str)
    }

    pub fn push(&mut self, id: String, text: String) {
        self.ids.push(id);
        self.texts.push(text);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.texts.clear();
    }

    /// Write the metadata file, one escaped `id<TAB>text` line per entry.
    pub fn write_metadata(&self, dir: &Path) -> AppResult<()> {
        let mut out = String::new();
        for (id, text) in self.ids.iter().zip(&self.texts) {
            out.push_str(&escape_field(id));
            out.push('\t');
            out.push_str(&escape_field(text));
            out.push('\n');
        }
        write_atomic(&dir.join(METADATA_FILE), out.as_bytes())
    }

    /// Read a metadata file written by [`EntryTable::write_metadata`].
    pub fn read_metadata(dir: &Path) -> AppResult<Self> {
        let path = dir.join(METADATA_FILE);
        let contents = fs::read_to_string(&path).map_err(|e| {
            AppError::Index(format!("Failed to read metadata {:?}: {}", path, e))
        })?;

        let mut table = Self::default();
        for (line_no, line) in contents.lines().enumerate() {
            let (id, text) = line.split_once('\t').ok_or_else(|| {
                AppError::Index(format!(
                    "Malformed metadata line {} in {:?}: missing tab separator",
                    line_no + 1,
                    path
                ))
            })?;
            table.push(unescape_field(id), unescape_field(text));
        }
        Ok(table)
    }
}

/// Check a batch before anything is stored.
///
/// Returns the dimension the index has after the batch: the established
/// one, or the first vector's when the index is still empty.
pub fn validate_batch(established: Option<usize>, entries: &[IndexedEntry]) -> AppResult<usize> {
    let dimension = match (established, entries.first()) {
        (Some(dim), _) => dim,
        (None, Some(first)) => first.vector.len(),
        (None, None) => 0,
    };

    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if entry.vector.len() != dimension {
            return Err(AppError::DimensionMismatch {
                expected: dimension,
                actual: entry.vector.len(),
            });
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(AppError::Index(format!(
                "Duplicate id '{}' in insertion batch",
                entry.id
            )));
        }
    }

    if dimension == 0 && !entries.is_empty() {
        return Err(AppError::Index(
            "Cannot index zero-length vectors".to_string(),
        ));
    }

    Ok(dimension)
}

/// Check a query vector against the established dimension.
pub fn check_query(established: Option<usize>, vector: &[f32]) -> AppResult<()> {
    match established {
        Some(expected) if expected != vector.len() => Err(AppError::DimensionMismatch {
            expected,
            actual: vector.len(),
        }),
        _ => Ok(()),
    }
}

/// Rank `(position, similarity)` pairs by descending similarity, keeping the top `k`.
///
/// The sort is stable, so exact ties keep insertion order.
pub fn top_k(scores: impl Iterator<Item = f32>, k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let temp = path.with_extension("tmp");
    fs::write(&temp, bytes)?;
    fs::rename(&temp, path)?;
    Ok(())
}

fn escape_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_field(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
