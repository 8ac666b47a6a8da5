use datamapper_syntax::query::{innermost_expression_body, value_expression};
use datamapper_syntax::{SyntaxKind, SyntaxNodeId, SyntaxTree};
use tracing::debug;

use super::modify::json_merge;
use super::{
    Modification, Modifications, ValueKind, bound_value, input_port, insert_at, replace,
    target_field,
};
use crate::access::field_key;
use crate::config::MapperConfig;
use crate::editable::{EditableTree, FieldId};
use crate::error::SourceError;
use crate::graph::{DataMapperGraph, PortId};

/// Edits that make the output field behind `target` take its value from
/// the input field behind `source`.
pub fn create_link(
    tree: &SyntaxTree,
    graph: &DataMapperGraph,
    source: PortId,
    target: PortId,
    config: &MapperConfig,
) -> Result<Modifications, SourceError> {
    let source_port = input_port(graph, source)?;
    let (editable, field) = target_field(graph, target)?;
    let rhs = source_port.field_fqn.as_str();
    let bound = bound_value(tree, editable, field);
    debug!(
        source = %source_port.id,
        target = %graph.port(target).id,
        value = ?bound.as_ref().map(|b| b.kind),
        "creating link"
    );

    match bound {
        Some(bound) if bound.kind == ValueKind::Default => {
            Ok(Modifications(vec![replace(tree, bound.expr, rhs)]))
        }
        Some(bound) if bound.kind == ValueKind::NonEmpty => {
            if source_port.field.is_json() && bound.ty.is_json() {
                Ok(json_merge(tree, bound.expr, rhs))
            } else {
                let end = tree.span(bound.expr).end;
                Ok(Modifications(vec![insert_at(tree, end, format!(" + {rhs}"))]))
            }
        }
        _ => create_value(tree, editable, field, rhs, config)
            .map(|m| Modifications(vec![m]))
            .ok_or_else(|| SourceError::NoEditableField(graph.port(target).id.clone())),
    }
}

/// Write `rhs` into a field that has no value yet. Missing levels of
/// mapping constructors between the field and the closest existing one
/// are synthesized around it.
pub(crate) fn create_value(
    tree: &SyntaxTree,
    editable: &EditableTree,
    field: FieldId,
    rhs: &str,
    config: &MapperConfig,
) -> Option<Modification> {
    let f = editable.field(field);
    if let Some(edit) = f.value.and_then(|v| fill_specific_field(tree, v, rhs.to_string())) {
        return Some(edit);
    }
    if f.parent.is_none() {
        let expr = innermost_expression_body(tree, f.value?);
        return Some(replace(tree, expr, rhs));
    }

    let mut text = format!("{}: {rhs}", field_key(f.name()?));
    let mut current = field;
    loop {
        let parent = editable.field(current).parent?;
        let p = editable.field(parent);
        if let Some(mapping) = mapping_constructor_of(tree, editable, parent) {
            return insert_field(tree, mapping, &text, config);
        }
        // Roots and list elements exist as expressions; replace them.
        if p.parent.is_none() || editable.element_index(parent).is_some() {
            let expr = p.value.and_then(|v| value_expression(tree, v))?;
            let expr = innermost_expression_body(tree, expr);
            return Some(replace(tree, expr, format!("{{{text}}}")));
        }
        if let Some(edit) = p
            .value
            .and_then(|v| fill_specific_field(tree, v, format!("{{{text}}}")))
        {
            return Some(edit);
        }
        if let Some(expr) = p.value.and_then(|v| value_expression(tree, v)) {
            return Some(replace(tree, expr, format!("{{{text}}}")));
        }
        text = format!("{}: {{{text}}}", field_key(p.name()?));
        current = parent;
    }
}

/// `name:` with nothing after the colon, or the shorthand `name`.
fn fill_specific_field(
    tree: &SyntaxTree,
    specific: SyntaxNodeId,
    text: String,
) -> Option<Modification> {
    let SyntaxKind::SpecificField { name, colon, value } = tree.kind(specific) else {
        return None;
    };
    match (colon, value) {
        (Some(_), Some(value)) if matches!(tree.kind(*value), SyntaxKind::Missing) => {
            Some(insert_at(tree, tree.span(*value).start, format!(" {text}")))
        }
        (None, None) => Some(replace(tree, specific, format!("{}: {text}", name.text))),
        _ => None,
    }
}

/// Mapping constructor currently bound to `field`.
fn mapping_constructor_of(
    tree: &SyntaxTree,
    editable: &EditableTree,
    field: FieldId,
) -> Option<SyntaxNodeId> {
    let value = value_expression(tree, editable.field(field).value?)?;
    let inner = innermost_expression_body(tree, value);
    matches!(tree.kind(inner), SyntaxKind::MappingConstructor { .. }).then_some(inner)
}

/// Add `text` as the last field of a mapping constructor.
fn insert_field(
    tree: &SyntaxTree,
    mapping: SyntaxNodeId,
    text: &str,
    config: &MapperConfig,
) -> Option<Modification> {
    let SyntaxKind::MappingConstructor {
        open_brace,
        fields,
        commas,
        ..
    } = tree.kind(mapping)
    else {
        return None;
    };
    let Some(&last) = fields.last() else {
        return Some(insert_at(tree, open_brace.span.end, text));
    };
    let separator = format!("{}{}", config.newline.as_str(), config.indent);
    let edit = match commas.get(fields.len() - 1) {
        Some(trailing) => insert_at(tree, trailing.span.end, format!("{separator}{text}")),
        None => insert_at(tree, tree.span(last).end, format!(",{separator}{text}")),
    };
    Some(edit)
}
