//! Conversion of [`Modifications`] to LSP text edits.
//!
//! Positions in modifications count bytes within a line; LSP counts UTF-16
//! code units. The document text is needed to convert between the two.

use datamapper_syntax::{LineIndex, LinePosition, NodePosition};
use indexmap::IndexSet;
use lsp_types::{Position, Range, TextEdit};

use crate::error::SourceError;
use crate::source::{Modification, Modifications, import_insertion};

/// Text edits against `source` equivalent to applying `modifications`.
///
/// All ranges refer to the unmodified document, as a `WorkspaceEdit`
/// expects. Imports of modules already imported produce no edit.
pub fn to_text_edits(
    source: &str,
    modifications: &Modifications,
) -> Result<Vec<TextEdit>, SourceError> {
    let index = LineIndex::new(source);
    let mut edits = Vec::new();
    let mut imports = IndexSet::new();
    for modification in &modifications.0 {
        match modification {
            Modification::Insert { position, text } => edits.push(TextEdit {
                range: range(source, &index, position)?,
                new_text: text.clone(),
            }),
            Modification::Delete { position } => edits.push(TextEdit {
                range: range(source, &index, position)?,
                new_text: String::new(),
            }),
            Modification::Import { module } => {
                imports.insert(module.as_str());
            }
        }
    }
    for module in imports {
        if let Some((offset, text)) = import_insertion(source, module) {
            let at = lsp_position(source, &index, index.line_position(offset as u32));
            edits.push(TextEdit {
                range: Range::new(at, at),
                new_text: text,
            });
        }
    }
    Ok(edits)
}

fn range(source: &str, index: &LineIndex, position: &NodePosition) -> Result<Range, SourceError> {
    let span = index.span(position).ok_or(SourceError::PositionOutOfBounds(*position))?;
    if !source.is_char_boundary(span.start as usize)
        || !source.is_char_boundary(span.end as usize)
    {
        return Err(SourceError::PositionOutOfBounds(*position));
    }
    Ok(Range::new(
        lsp_position(source, index, position.start()),
        lsp_position(source, index, position.end()),
    ))
}

/// Line and UTF-16 character of a byte position known to be in bounds.
fn lsp_position(source: &str, index: &LineIndex, position: LinePosition) -> Position {
    let start = index.line_start(position.line).unwrap_or(0) as usize;
    let end = (start + position.offset as usize).min(source.len());
    let character: usize = source[start..end].chars().map(char::len_utf16).sum();
    Position::new(position.line, character as u32)
}
