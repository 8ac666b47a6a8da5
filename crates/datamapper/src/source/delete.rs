use datamapper_syntax::query::innermost_expression_body;
use datamapper_syntax::{SyntaxKind, SyntaxNodeId, SyntaxTree, TextSpan};
use datamapper_types::default_value;
use tracing::debug;

use super::{Modifications, delete_span, replace};
use crate::error::SourceError;
use crate::graph::{DataMapperGraph, Link};

/// Edits that remove the link at `index` from the document.
///
/// A sub-link removes its operand from the connector's expression. Any
/// other link removes the specific field or list element holding the
/// target's value; a root value is reset to the default literal instead.
pub fn delete_link(
    tree: &SyntaxTree,
    graph: &DataMapperGraph,
    index: usize,
) -> Result<Modifications, SourceError> {
    let link = graph.link(index).ok_or(SourceError::UnknownLink(index))?;
    if link.is_sub_link() {
        if let Some(span) = link.source_expr.and_then(|s| operand_span(tree, s)) {
            debug!(link = index, "deleting operand");
            return Ok(Modifications(vec![delete_span(tree, span)]));
        }
    }
    delete_mapping(tree, graph, link)
}

fn delete_mapping(
    tree: &SyntaxTree,
    graph: &DataMapperGraph,
    link: &Link,
) -> Result<Modifications, SourceError> {
    if let Some(span) = link.field_node.and_then(|item| item_span(tree, item)) {
        return Ok(Modifications(vec![delete_span(tree, span)]));
    }

    // Nothing structural to remove: reset the value to its default.
    let editable = graph.output_tree().ok_or(SourceError::NothingToDelete)?;
    let root = graph
        .output_expression()
        .map(|e| innermost_expression_body(tree, e))
        .ok_or(SourceError::NothingToDelete)?;
    let (expr, ty) = match link.field_node {
        Some(_) => {
            let target = graph.port(link.target);
            let field = target.editable_field.ok_or(SourceError::NothingToDelete)?;
            let value = link.value.ok_or(SourceError::NothingToDelete)?;
            (value, editable.field(field).shape().clone())
        }
        None => (root, editable.field(editable.root()).shape().clone()),
    };
    Ok(Modifications(vec![replace(tree, expr, default_value(&ty))]))
}

/// Span removing `item` from its mapping or list constructor together with
/// one adjacent separator. Removing the only item of a nested constructor
/// removes the item enclosing that constructor instead.
fn item_span(tree: &SyntaxTree, item: SyntaxNodeId) -> Option<TextSpan> {
    let container = tree.parent(item)?;
    let (items, inner) = match tree.kind(container) {
        SyntaxKind::MappingConstructor {
            fields,
            open_brace,
            close_brace,
            ..
        } => (fields, TextSpan::new(open_brace.span.end, close_brace.span.start)),
        SyntaxKind::ListConstructor {
            elements,
            open_bracket,
            close_bracket,
            ..
        } => (elements, TextSpan::new(open_bracket.span.end, close_bracket.span.start)),
        _ => return None,
    };
    if items.len() == 1 {
        return match enclosing_item(tree, container) {
            Some(outer) => item_span(tree, outer),
            None => Some(inner),
        };
    }
    separated_span(tree, items, item)
}

/// `item` with the comma before it when it is last, else with the comma after it.
fn separated_span(
    tree: &SyntaxTree,
    items: &[SyntaxNodeId],
    item: SyntaxNodeId,
) -> Option<TextSpan> {
    let index = items.iter().position(|&i| i == item)?;
    let span = tree.span(item);
    if index + 1 == items.len() {
        let previous = tree.span(*items.get(index.checked_sub(1)?)?);
        Some(TextSpan::new(previous.end, span.end))
    } else {
        Some(TextSpan::new(span.start, tree.span(items[index + 1]).start))
    }
}

/// The specific field or list element whose value is `container`, seen
/// through casts, parentheses and `let`.
fn enclosing_item(tree: &SyntaxTree, container: SyntaxNodeId) -> Option<SyntaxNodeId> {
    let mut child = container;
    for ancestor in tree.ancestors(container) {
        match tree.kind(ancestor) {
            SyntaxKind::SpecificField { .. } => return Some(ancestor),
            SyntaxKind::ListConstructor { .. } => return Some(child),
            SyntaxKind::TypeCast { .. } | SyntaxKind::BracedExpression { .. } => child = ancestor,
            SyntaxKind::LetExpression { body, .. } if *body == child => child = ancestor,
            _ => return None,
        }
    }
    None
}

/// Span removing the operand containing the input reference `reference`:
/// with its operator inside a binary expression, with its comma inside an
/// argument list.
fn operand_span(tree: &SyntaxTree, reference: SyntaxNodeId) -> Option<TextSpan> {
    let mut operand = reference;
    while let Some(parent) = tree.parent(operand) {
        let wraps = match tree.kind(parent) {
            SyntaxKind::MethodCall { expression, .. } => *expression == operand,
            SyntaxKind::IndexedExpression { container, .. } => *container == operand,
            SyntaxKind::TypeCast { .. }
            | SyntaxKind::BracedExpression { .. }
            | SyntaxKind::UnaryExpression { .. } => true,
            _ => false,
        };
        if !wraps {
            break;
        }
        operand = parent;
    }

    let parent = tree.parent(operand)?;
    match tree.kind(parent) {
        SyntaxKind::BinaryExpression { lhs, rhs, .. } => {
            if *rhs == operand {
                Some(TextSpan::new(tree.span(*lhs).end, tree.span(*rhs).end))
            } else {
                Some(TextSpan::new(tree.span(*lhs).start, tree.span(*rhs).start))
            }
        }
        SyntaxKind::FunctionCall { args, .. } | SyntaxKind::MethodCall { args, .. }
            if args.contains(&operand) =>
        {
            if args.len() == 1 {
                Some(tree.span(operand))
            } else {
                separated_span(tree, args, operand)
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_graph;
    use crate::config::MapperConfig;
    use crate::graph::Selection;
    use crate::local_types::LocalTypeService;
    use datamapper_syntax::parse;
    use pretty_assertions::assert_eq;

    const TYPES: &str = r#"
type Address record {
    string city;
    string zip;
};

type Person record {
    string name;
    int age;
    Address address;
    string[] tags;
};

type Out record {
    string name;
    int age;
    Address home;
    string[] tags;
};
"#;

    fn delete_into(body: &str, target: &str, nth: usize) -> String {
        let source = format!("{TYPES}\nfunction f(Person person) returns Out => {body};");
        let tree = parse(&source).unwrap();
        let service = LocalTypeService::new(&tree);
        let graph =
            build_graph(&tree, &service, &Selection::function("f"), &MapperConfig::default())
                .unwrap();
        let target = graph.find_port(target).unwrap();
        let (index, _) = graph.links_into(target).nth(nth).unwrap();
        let applied = delete_link(&tree, &graph, index).unwrap().apply(&source).unwrap();
        let start = applied.rfind("=> ").unwrap() + 3;
        applied[start..applied.len() - 1].to_string()
    }

    #[test]
    fn test_delete_last_field_takes_preceding_comma() {
        assert_eq!(
            delete_into("{name: person.name, age: person.age}", "mappingConstructor.age", 0),
            "{name: person.name}"
        );
    }

    #[test]
    fn test_delete_first_field_takes_following_comma() {
        assert_eq!(
            delete_into("{name: person.name, age: person.age}", "mappingConstructor.name", 0),
            "{age: person.age}"
        );
    }

    #[test]
    fn test_delete_sole_root_field() {
        assert_eq!(delete_into("{name: person.name}", "mappingConstructor.name", 0), "{}");
    }

    #[test]
    fn test_delete_sole_nested_field_removes_enclosing_field() {
        assert_eq!(
            delete_into(
                "{name: person.name, home: {city: person.address.city}}",
                "mappingConstructor.home.city",
                0
            ),
            "{name: person.name}"
        );
    }

    #[test]
    fn test_delete_list_element() {
        assert_eq!(
            delete_into(
                "{tags: [person.name, person.address.city]}",
                "mappingConstructor.tags.1",
                0
            ),
            "{tags: [person.name]}"
        );
    }

    #[test]
    fn test_delete_operand_with_operator() {
        assert_eq!(
            delete_into("{name: person.name + person.address.city}", "linkConnector.0.IN", 1),
            "{name: person.name}"
        );
        assert_eq!(
            delete_into("{name: person.name + person.address.city}", "linkConnector.0.IN", 0),
            "{name: person.address.city}"
        );
    }

    #[test]
    fn test_delete_function_argument() {
        assert_eq!(
            delete_into(
                "{name: concat(person.name, person.address.city)}",
                "linkConnector.0.IN",
                0
            ),
            "{name: concat(person.address.city)}"
        );
        assert_eq!(
            delete_into(
                "{name: concat(person.address.city, person.name)}",
                "linkConnector.0.IN",
                1
            ),
            "{name: concat(person.address.city)}"
        );
    }

    #[test]
    fn test_delete_root_value_resets_to_default() {
        let source =
            format!("{TYPES}\nfunction f(Person person) returns Address => person.address;");
        let tree = parse(&source).unwrap();
        let service = LocalTypeService::new(&tree);
        let graph =
            build_graph(&tree, &service, &Selection::function("f"), &MapperConfig::default())
                .unwrap();
        assert_eq!(graph.links().len(), 1);
        let applied = delete_link(&tree, &graph, 0).unwrap().apply(&source).unwrap();
        assert!(applied.ends_with("returns Address => {};"));
    }
}
