//! Spans and line/column positions.

use serde::Serialize;

/// Byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TextSpan {
    pub start: u32,
    pub end: u32,
}

impl TextSpan {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `offset`.
    pub fn empty(offset: u32) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn as_str<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start as usize..self.end as usize]
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Zero-based line and column (in bytes) of a single point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct LinePosition {
    pub line: u32,
    pub offset: u32,
}

/// Start and end of a node as zero-based lines and byte columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePosition {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl NodePosition {
    pub fn new(start: LinePosition, end: LinePosition) -> Self {
        Self {
            start_line: start.line,
            start_column: start.offset,
            end_line: end.line,
            end_column: end.offset,
        }
    }

    pub fn start(&self) -> LinePosition {
        LinePosition {
            line: self.start_line,
            offset: self.start_column,
        }
    }

    pub fn end(&self) -> LinePosition {
        LinePosition {
            line: self.end_line,
            offset: self.end_column,
        }
    }

    /// A node whose start equals its end holds no text, e.g. a missing value.
    pub fn is_empty(&self) -> bool {
        self.start() == self.end()
    }

    /// Zero-width position at the end of this one.
    pub fn collapse_to_end(&self) -> Self {
        Self::new(self.end(), self.end())
    }

    pub fn collapse_to_start(&self) -> Self {
        Self::new(self.start(), self.start())
    }

    /// Position spanning from the start of `self` to the start of `other`.
    pub fn until_start_of(&self, other: &NodePosition) -> Self {
        Self::new(self.start(), other.start())
    }

    /// Position spanning from the end of `self` to the end of `other`.
    pub fn from_end_to_end(&self, other: &NodePosition) -> Self {
        Self::new(self.end(), other.end())
    }

    pub fn contains(&self, other: &NodePosition) -> bool {
        self.start() <= other.start() && other.end() <= self.end()
    }
}

/// Maps byte offsets to line/column positions and back.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self {
            line_starts,
            len: text.len() as u32,
        }
    }

    pub fn line_position(&self, offset: u32) -> LinePosition {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        LinePosition {
            line: line as u32,
            offset: offset - self.line_starts[line],
        }
    }

    pub fn offset(&self, pos: LinePosition) -> Option<u32> {
        let start = *self.line_starts.get(pos.line as usize)?;
        let offset = start + pos.offset;
        let line_end = self
            .line_starts
            .get(pos.line as usize + 1)
            .copied()
            .unwrap_or(self.len + 1);
        (offset < line_end).then_some(offset)
    }

    pub fn position(&self, span: TextSpan) -> NodePosition {
        NodePosition::new(self.line_position(span.start), self.line_position(span.end))
    }

    pub fn span(&self, pos: &NodePosition) -> Option<TextSpan> {
        Some(TextSpan::new(self.offset(pos.start())?, self.offset(pos.end())?))
    }

    pub fn line_start(&self, line: u32) -> Option<u32> {
        self.line_starts.get(line as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_roundtrip() {
        let text = "ab\ncde\n\nf";
        let index = LineIndex::new(text);
        let pos = index.line_position(4);
        assert_eq!(pos, LinePosition { line: 1, offset: 1 });
        assert_eq!(index.offset(pos), Some(4));
        assert_eq!(index.line_position(8), LinePosition { line: 3, offset: 0 });
    }

    #[test]
    fn test_offset_at_end_of_text() {
        let index = LineIndex::new("abc");
        assert_eq!(index.offset(LinePosition { line: 0, offset: 3 }), Some(3));
        assert_eq!(index.offset(LinePosition { line: 0, offset: 4 }), None);
        assert_eq!(index.offset(LinePosition { line: 1, offset: 0 }), None);
    }

    #[test]
    fn test_span_position() {
        let text = "x = {\n  a: b\n}";
        let index = LineIndex::new(text);
        let pos = index.position(TextSpan::new(4, 13));
        assert_eq!(pos.start_line, 0);
        assert_eq!(pos.start_column, 4);
        assert_eq!(pos.end_line, 2);
        assert_eq!(pos.end_column, 0);
        assert_eq!(index.span(&pos), Some(TextSpan::new(4, 13)));
    }

    #[test]
    fn test_empty_position() {
        let pos = NodePosition::new(
            LinePosition { line: 2, offset: 5 },
            LinePosition { line: 2, offset: 5 },
        );
        assert!(pos.is_empty());
    }
}
