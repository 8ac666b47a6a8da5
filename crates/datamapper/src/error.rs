use datamapper_syntax::NodePosition;
use thiserror::Error;

use crate::editable::EditableTree;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnrichError {
    /// Re-enrichment kept changing the type. `last` is the tree of the
    /// final pass and is still usable for rendering.
    #[error("type enrichment did not converge after {passes} passes")]
    NotConverged {
        passes: usize,
        last: Box<EditableTree>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("function `{0}` not found")]
    FunctionNotFound(String),
    #[error("function `{0}` has no expression body")]
    NoExpressionBody(String),
    #[error("no query expression at {}:{}", .0.start_line, .0.start_column)]
    QueryNotFound(NodePosition),
    #[error("no type is known for the output of `{0}`")]
    MissingOutputType(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("unknown port {0:?}")]
    UnknownPort(usize),
    #[error("port `{0}` is not an input port")]
    NotAnInputPort(String),
    #[error("port `{0}` is not an output port")]
    NotAnOutputPort(String),
    #[error("port `{0}` has no editable field")]
    NoEditableField(String),
    #[error("unknown link {0}")]
    UnknownLink(usize),
    #[error("link has nothing to delete")]
    NothingToDelete,
    #[error("position {}:{} is outside the document", .0.start_line, .0.start_column)]
    PositionOutOfBounds(NodePosition),
    #[error("overlapping edits at {}:{}", .0.start_line, .0.start_column)]
    OverlappingEdits(NodePosition),
}
