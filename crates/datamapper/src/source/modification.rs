use std::sync::LazyLock;

use datamapper_syntax::{LineIndex, NodePosition, TextSpan};
use regex::Regex;
use serde::Serialize;
use thisisplural::Plural;

use crate::error::SourceError;

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*import[ \t]+([^;\s]+)(?:[ \t]+as[ \t]+\w+)?[ \t]*;")
        .expect("invalid import regex")
});

/// A single edit of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Modification {
    /// Replace the text at `position` with `text`. A zero-width position
    /// inserts.
    Insert { position: NodePosition, text: String },
    Delete { position: NodePosition },
    /// Make sure `module` (`org/a.b`) is imported.
    Import { module: String },
}

impl Modification {
    pub fn insert(position: NodePosition, text: impl Into<String>) -> Self {
        Modification::Insert {
            position,
            text: text.into(),
        }
    }
}

/// Edits produced by one graph operation. The host applies them as one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Plural)]
pub struct Modifications(pub Vec<Modification>);

impl Modifications {
    /// Apply the edits to `source`. Text edits must not overlap; they are
    /// applied from the back of the document so that positions stay valid.
    /// Edits at the same position keep their relative order.
    pub fn apply(&self, source: &str) -> Result<String, SourceError> {
        let index = LineIndex::new(source);
        let mut edits: Vec<(TextSpan, &str, NodePosition)> = Vec::new();
        let mut imports = Vec::new();
        for modification in &self.0 {
            match modification {
                Modification::Insert { position, text } => {
                    edits.push((span_of(source, &index, position)?, text.as_str(), *position))
                }
                Modification::Delete { position } => {
                    edits.push((span_of(source, &index, position)?, "", *position))
                }
                Modification::Import { module } => imports.push(module.as_str()),
            }
        }
        edits.sort_by_key(|(span, ..)| (span.start, span.end));
        if let Some(pair) = edits.windows(2).find(|pair| pair[0].0.end > pair[1].0.start) {
            return Err(SourceError::OverlappingEdits(pair[1].2));
        }

        let mut out = source.to_string();
        for (span, text, _) in edits.iter().rev() {
            out.replace_range(span.start as usize..span.end as usize, text);
        }
        for module in imports {
            if let Some((offset, text)) = import_insertion(&out, module) {
                out.insert_str(offset, &text);
            }
        }
        Ok(out)
    }
}

fn span_of(
    source: &str,
    index: &LineIndex,
    position: &NodePosition,
) -> Result<TextSpan, SourceError> {
    let span = index
        .span(position)
        .filter(|s| s.start <= s.end)
        .ok_or(SourceError::PositionOutOfBounds(*position))?;
    if !source.is_char_boundary(span.start as usize)
        || !source.is_char_boundary(span.end as usize)
    {
        return Err(SourceError::PositionOutOfBounds(*position));
    }
    Ok(span)
}

/// Where and what to insert so that `module` is imported: after the last
/// import, or at the top of a document without imports. `None` when the
/// module is imported already.
pub(crate) fn import_insertion(source: &str, module: &str) -> Option<(usize, String)> {
    if IMPORT.captures_iter(source).any(|c| &c[1] == module) {
        return None;
    }
    match IMPORT.find_iter(source).last() {
        Some(last) => Some((last.end(), format!("\nimport {module};"))),
        None => Some((0, format!("import {module};\n"))),
    }
}
