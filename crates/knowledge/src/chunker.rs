//! Section-aware chunking for policy documents.

use serde::Serialize;

/// Section marker that starts a new section; the rest of its line is the title.
pub const SECTION_MARKER: &str = "##";

/// A chunk ready for embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkCandidate {
    /// Position of the chunk within the document
    pub position: u32,
    /// Title line of the section the chunk came from
    pub title: String,
    pub text: String,
}

/// Split a document into sections, then pack each section's lines into chunks.
///
/// Lines are never split: a chunk boundary falls only between lines, and a
/// single line longer than `chunk_size` becomes a chunk of its own. Lengths
/// are counted in characters.
pub fn chunk_sections(content: &str, chunk_size: usize) -> Vec<ChunkCandidate> {
    let mut chunks = Vec::new();
    let mut position = 0u32;

    let mut push = |title: &str, text: &str| {
        let text = text.trim();
        if !text.is_empty() {
            chunks.push(ChunkCandidate {
                position,
                title: title.to_string(),
                text: text.to_string(),
            });
            position += 1;
        }
    };

    for section in content.split(SECTION_MARKER) {
        let section = section.trim();
        if section.is_empty() {
            continue;
        }

        let mut lines = section.split('\n');
        let title = lines.next().unwrap_or_default().trim();

        let mut current = String::new();
        let mut current_len = 0usize;
        for line in lines {
            let line_len = line.chars().count();
            if current_len + line_len > chunk_size {
                push(title, &current);
                current = line.to_string();
                current_len = line_len;
            } else {
                current.push('\n');
                current.push_str(line);
                current_len += line_len + 1;
            }
        }
        push(title, &current);
    }

    tracing::debug!(
        "Chunked document into {} chunks (size: {})",
        chunks.len(),
        chunk_size
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = "\
# Store Policies

## Discounts
Premium members receive 10% off orders over $100.
Discounts cannot be combined.

## Returns
Items may be returned within 30 days.
";

    #[test]
    fn test_sections_become_titled_chunks() {
        let chunks = chunk_sections(POLICY, 500);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].title, "Discounts");
        assert_eq!(
            chunks[0].text,
            "Premium members receive 10% off orders over $100.\nDiscounts cannot be combined."
        );
        assert_eq!(chunks[1].title, "Returns");
        assert_eq!(chunks[1].position, 1);
    }

    #[test]
    fn test_preamble_title_only_section_is_skipped() {
        let chunks = chunk_sections("# Heading only\n## A\nbody", 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].title, "A");
    }

    #[test]
    fn test_packing_breaks_between_lines() {
        let doc = "## Title\naaaa\nbbbb\ncccc";
        let chunks = chunk_sections(doc, 10);

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn test_long_line_is_its_own_chunk() {
        let long = "x".repeat(40);
        let doc = format!("## T\nshort\n{}\nend", long);
        let chunks = chunk_sections(&doc, 10);

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["short", long.as_str(), "end"]);
    }

    #[test]
    fn test_empty_document() {
        assert!(chunk_sections("", 500).is_empty());
        assert!(chunk_sections("   \n", 500).is_empty());
    }
}
