//! Source synthesis.
//!
//! Graph operations (create, retarget and delete a link, set a value) are
//! turned into [`Modifications`] of the document text. The graph itself is
//! never edited; the next rebuild observes the changed document.

mod create;
mod delete;
mod modification;
mod modify;

pub use create::create_link;
pub use delete::delete_link;
pub use modification::{Modification, Modifications};
pub use modify::{retarget, set_field_value};

pub(crate) use modification::import_insertion;

use datamapper_syntax::query::{innermost_expression_body, value_expression};
use datamapper_syntax::{SyntaxKind, SyntaxNodeId, SyntaxTree, TextSpan};
use datamapper_types::{TypeField, is_default_value};
use serde::Serialize;

use crate::editable::{EditableTree, FieldId};
use crate::error::SourceError;
use crate::graph::{DataMapperGraph, PortId};
use crate::port::{Port, PortDirection};

/// What a target field currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    /// No value, or a value without text.
    Empty,
    /// The default literal of the field's type.
    Default,
    NonEmpty,
}

impl ValueKind {
    pub fn classify(tree: &SyntaxTree, types: &[&TypeField], expr: Option<SyntaxNodeId>) -> Self {
        let Some(expr) = expr else {
            return ValueKind::Empty;
        };
        if matches!(tree.kind(expr), SyntaxKind::Missing) || tree.span(expr).is_empty() {
            return ValueKind::Empty;
        }
        let text = tree.text(expr);
        if types.iter().any(|ty| is_default_value(ty, text)) {
            ValueKind::Default
        } else {
            ValueKind::NonEmpty
        }
    }
}

/// The expression a write to a field replaces, and the type it must have.
pub(crate) struct BoundValue<'t> {
    pub expr: SyntaxNodeId,
    pub ty: &'t TypeField,
    pub kind: ValueKind,
}

/// Expression currently producing the value of `field`. A root is written
/// through `let` and casts; a root query is written at its select expression.
pub(crate) fn bound_value<'t>(
    tree: &SyntaxTree,
    editable: &'t EditableTree,
    field: FieldId,
) -> Option<BoundValue<'t>> {
    let f = editable.field(field);
    let mut expr = value_expression(tree, f.value?)?;
    let mut ty = f.shape();
    if f.parent.is_none() {
        expr = innermost_expression_body(tree, expr);
        if let SyntaxKind::QueryExpression { result, .. } = tree.kind(expr) {
            if let SyntaxKind::SelectClause { expression } = tree.kind(*result) {
                expr = *expression;
                ty = f.shape().array_member().unwrap_or(ty);
            }
        }
    }
    let kind = ValueKind::classify(tree, &[&f.ty, ty], Some(expr));
    Some(BoundValue { expr, ty, kind })
}

/// Output field behind a target port.
pub(crate) fn target_field(
    graph: &DataMapperGraph,
    target: PortId,
) -> Result<(&EditableTree, FieldId), SourceError> {
    let port = graph.get_port(target).ok_or(SourceError::UnknownPort(target.0))?;
    let node = graph.node(port.node);
    if port.direction != PortDirection::In || !node.kind.is_output() {
        return Err(SourceError::NotAnOutputPort(port.id.clone()));
    }
    let field = port
        .editable_field
        .ok_or_else(|| SourceError::NoEditableField(port.id.clone()))?;
    let editable = node
        .editable
        .as_ref()
        .ok_or_else(|| SourceError::NoEditableField(port.id.clone()))?;
    Ok((editable, field))
}

/// A port of an input node, usable as the source of a link.
pub(crate) fn input_port(graph: &DataMapperGraph, source: PortId) -> Result<&Port, SourceError> {
    let port = graph.get_port(source).ok_or(SourceError::UnknownPort(source.0))?;
    if port.direction != PortDirection::Out || !graph.node(port.node).kind.is_input() {
        return Err(SourceError::NotAnInputPort(port.id.clone()));
    }
    Ok(port)
}

pub(crate) fn replace(
    tree: &SyntaxTree,
    node: SyntaxNodeId,
    text: impl Into<String>,
) -> Modification {
    Modification::insert(tree.position(node), text)
}

pub(crate) fn insert_at(tree: &SyntaxTree, offset: u32, text: impl Into<String>) -> Modification {
    Modification::insert(tree.line_index().position(TextSpan::empty(offset)), text)
}

pub(crate) fn delete_span(tree: &SyntaxTree, span: TextSpan) -> Modification {
    Modification::Delete {
        position: tree.line_index().position(span),
    }
}
