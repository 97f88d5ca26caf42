//! Memory document codec.
//!
//! A memory is persisted as a UTF-8 document: a YAML front-matter block
//! between `---` delimiter lines, then the free-form content body. The
//! body is preserved byte-for-byte apart from trailing-newline
//! normalization (the writer emits exactly one trailing newline for a
//! non-empty body; the parser strips trailing newlines back off).

use crate::error::StorageError;
use crate::types::{normalize_content, Memory, MemoryMetadata, MemoryPath};

const DELIMITER: &str = "---";

/// Render a memory to its on-disk document form.
pub fn serialize_memory(memory: &Memory) -> Result<String, StorageError> {
    let yaml =
        serde_yaml::to_string(&memory.metadata).map_err(|e| StorageError::Serialize {
            reason: format!("front-matter: {e}"),
        })?;
    let mut doc = String::with_capacity(yaml.len() + memory.content.len() + 16);
    doc.push_str(DELIMITER);
    doc.push('\n');
    doc.push_str(&yaml);
    if !yaml.ends_with('\n') {
        doc.push('\n');
    }
    doc.push_str(DELIMITER);
    doc.push('\n');
    if !memory.content.is_empty() {
        doc.push_str(&memory.content);
        doc.push('\n');
    }
    Ok(doc)
}

/// Parse an on-disk document back into a memory at `path`.
pub fn parse_memory(path: MemoryPath, text: &str) -> Result<Memory, StorageError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let (yaml, body) = split_front_matter(text).ok_or_else(|| StorageError::Parse {
        path: path.to_string(),
        reason: "missing front-matter delimiters".to_string(),
    })?;

    let metadata: MemoryMetadata =
        serde_yaml::from_str(yaml).map_err(|e| StorageError::Parse {
            path: path.to_string(),
            reason: format!("front-matter: {e}"),
        })?;

    Ok(Memory {
        path,
        metadata,
        content: normalize_content(body),
    })
}

/// Split a document into (front-matter yaml, body). Returns `None` when
/// the delimiters are missing.
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---\n").or_else(|| {
        // A document that is just the opening delimiter.
        if text == "---" {
            Some("")
        } else {
            None
        }
    })?;

    if let Some(idx) = rest.find("\n---\n") {
        return Some((&rest[..idx], &rest[idx + 5..]));
    }
    if let Some(yaml) = rest.strip_suffix("\n---") {
        return Some((yaml, ""));
    }
    // Empty front-matter directly followed by the closing delimiter.
    if let Some(body) = rest.strip_prefix("---\n") {
        return Some(("", body));
    }
    None
}
