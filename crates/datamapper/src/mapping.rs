//! Mapping discovery.
//!
//! A mapping is a leaf of the output expression: a value that is neither a
//! mapping constructor nor a list constructor, together with the chain of
//! specific fields and list elements leading to it.

use datamapper_syntax::query::{collect_input_references, innermost_expression_body};
use datamapper_syntax::{SyntaxKind, SyntaxNodeId, SyntaxTree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    /// Specific fields and list elements from the root constructor down to
    /// the one holding `value`. Empty when the root expression is the leaf.
    pub path: Vec<SyntaxNodeId>,
    /// The single input reference of a direct mapping.
    pub source: Option<SyntaxNodeId>,
    /// The whole leaf expression.
    pub value: SyntaxNodeId,
    /// All input references of the leaf, in source order.
    pub inputs: Vec<SyntaxNodeId>,
}

impl Mapping {
    /// A mapping that needs its own connector node.
    pub fn is_pass_through(&self) -> bool {
        self.source.is_none()
    }
}

/// Leaves of `expr` that depend on inputs, in source order.
pub fn discover_mappings(tree: &SyntaxTree, expr: SyntaxNodeId) -> Vec<Mapping> {
    let mut out = Vec::new();
    walk(tree, expr, &mut Vec::new(), &mut out);
    out
}

fn walk(
    tree: &SyntaxTree,
    expr: SyntaxNodeId,
    path: &mut Vec<SyntaxNodeId>,
    out: &mut Vec<Mapping>,
) {
    let inner = innermost_expression_body(tree, expr);
    match tree.kind(inner) {
        SyntaxKind::MappingConstructor { fields, .. } => {
            for &field in fields {
                // Shorthand `{name}` fields have no value of their own.
                let SyntaxKind::SpecificField { value: Some(value), .. } = tree.kind(field) else {
                    continue;
                };
                path.push(field);
                walk(tree, *value, path, out);
                path.pop();
            }
        }
        SyntaxKind::ListConstructor { elements, .. } => {
            for &element in elements {
                path.push(element);
                walk(tree, element, path, out);
                path.pop();
            }
        }
        SyntaxKind::Missing => {}
        _ => {
            if let Some(mapping) = leaf(tree, expr, inner, path) {
                out.push(mapping);
            }
        }
    }
}

fn leaf(
    tree: &SyntaxTree,
    expr: SyntaxNodeId,
    inner: SyntaxNodeId,
    path: &[SyntaxNodeId],
) -> Option<Mapping> {
    let inputs = collect_input_references(tree, expr);
    let is_query = matches!(tree.kind(inner), SyntaxKind::QueryExpression { .. });
    if inputs.is_empty() && !is_query {
        return None;
    }
    let source = match inputs.as_slice() {
        [single] if !needs_connector(tree.kind(inner)) => Some(*single),
        _ => None,
    };
    Some(Mapping {
        path: path.to_vec(),
        source,
        value: expr,
        inputs,
    })
}

/// Leaf kinds that are shown through a connector node even with a single input.
fn needs_connector(kind: &SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::QueryExpression { .. }
            | SyntaxKind::ConditionalExpression { .. }
            | SyntaxKind::ElvisExpression { .. }
            | SyntaxKind::FunctionCall { .. }
            | SyntaxKind::IndexedExpression { .. }
    )
}
