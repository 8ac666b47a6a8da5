use datamapper_syntax::query::imported_modules;
use datamapper_syntax::{SyntaxNodeId, SyntaxTree};
use tracing::debug;

use super::create::create_value;
use super::{Modification, Modifications, ValueKind, bound_value, input_port, replace, target_field};
use crate::access::module_prefix;
use crate::config::MapperConfig;
use crate::error::SourceError;
use crate::graph::{DataMapperGraph, PortId};

const JSON_MERGE_MODULE: &str = "ballerina/lang.value";

/// Merge `rhs` into the JSON value `existing` instead of overwriting it.
pub(crate) fn json_merge(tree: &SyntaxTree, existing: SyntaxNodeId, rhs: &str) -> Modifications {
    let prefix = module_prefix(tree, JSON_MERGE_MODULE);
    let call = format!("{prefix}:mergeJson({}, {rhs})", tree.text(existing));
    let mut edits = vec![replace(tree, existing, call)];
    if !imported_modules(tree).iter().any(|m| m == JSON_MERGE_MODULE) {
        edits.push(Modification::Import {
            module: JSON_MERGE_MODULE.to_string(),
        });
    }
    Modifications(edits)
}

/// Write `text` as the value of the output field behind `target`,
/// replacing whatever it holds now.
pub fn set_field_value(
    tree: &SyntaxTree,
    graph: &DataMapperGraph,
    target: PortId,
    text: &str,
    config: &MapperConfig,
) -> Result<Modifications, SourceError> {
    let (editable, field) = target_field(graph, target)?;
    match bound_value(tree, editable, field) {
        Some(bound) if bound.kind != ValueKind::Empty => {
            Ok(Modifications(vec![replace(tree, bound.expr, text)]))
        }
        _ => create_value(tree, editable, field, text, config)
            .map(|m| Modifications(vec![m]))
            .ok_or_else(|| SourceError::NoEditableField(graph.port(target).id.clone())),
    }
}

/// Point the link at `index` to a different input. The input reference the
/// link stands for is replaced; a link without one (out of a connector)
/// has the target's whole value replaced.
pub fn retarget(
    tree: &SyntaxTree,
    graph: &DataMapperGraph,
    index: usize,
    new_source: PortId,
    config: &MapperConfig,
) -> Result<Modifications, SourceError> {
    let link = graph.link(index).ok_or(SourceError::UnknownLink(index))?;
    let source = input_port(graph, new_source)?;
    debug!(link = index, source = %source.id, "retargeting link");
    match link.source_expr.or(link.value) {
        Some(expr) => Ok(Modifications(vec![replace(tree, expr, source.field_fqn.as_str())])),
        None => set_field_value(tree, graph, link.target, &source.field_fqn, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_graph;
    use crate::graph::Selection;
    use crate::local_types::LocalTypeService;
    use datamapper_syntax::parse;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = r#"
type Person record {
    string first;
    string last;
};

type Out record {
    string name;
    string code;
};

function f(Person person) returns Out => {name: person.first, code: person.first + person.last};
"#;

    fn graph(tree: &SyntaxTree) -> DataMapperGraph {
        let service = LocalTypeService::new(tree);
        build_graph(tree, &service, &Selection::function("f"), &MapperConfig::default()).unwrap()
    }

    #[test]
    fn test_retarget_direct_link() {
        let tree = parse(SOURCE).unwrap();
        let graph = graph(&tree);
        let target = graph.find_port("mappingConstructor.name").unwrap();
        let (index, _) = graph.links_into(target).next().unwrap();
        let last = graph.find_port("person.last").unwrap();
        let edits = retarget(&tree, &graph, index, last, &MapperConfig::default()).unwrap();
        let applied = edits.apply(SOURCE).unwrap();
        assert!(applied.contains("{name: person.last, code: person.first + person.last}"));
    }

    #[test]
    fn test_retarget_sub_link_replaces_operand() {
        let tree = parse(SOURCE).unwrap();
        let graph = graph(&tree);
        let connector = graph.find_port("linkConnector.0.IN").unwrap();
        let (index, _) = graph.links_into(connector).next().unwrap();
        let last = graph.find_port("person.last").unwrap();
        let edits = retarget(&tree, &graph, index, last, &MapperConfig::default()).unwrap();
        let applied = edits.apply(SOURCE).unwrap();
        assert!(applied.contains("code: person.last + person.last"));
    }

    #[test]
    fn test_set_field_value() {
        let tree = parse(SOURCE).unwrap();
        let graph = graph(&tree);
        let target = graph.find_port("mappingConstructor.name").unwrap();
        let edits =
            set_field_value(&tree, &graph, target, "\"anonymous\"", &MapperConfig::default())
                .unwrap();
        let applied = edits.apply(SOURCE).unwrap();
        assert!(applied.contains("{name: \"anonymous\", code:"));
    }

    #[test]
    fn test_rejects_wrong_port_direction() {
        let tree = parse(SOURCE).unwrap();
        let graph = graph(&tree);
        let target = graph.find_port("mappingConstructor.name").unwrap();
        let err = retarget(&tree, &graph, 0, target, &MapperConfig::default()).unwrap_err();
        assert_eq!(err, SourceError::NotAnInputPort("mappingConstructor.name".to_string()));
    }

    #[test]
    fn test_json_merge_adds_import_once() {
        let source = "import ballerina/lang.value as v;\nfunction f(json a) returns json => a;";
        let tree = parse(source).unwrap();
        let root = tree
            .descendants(tree.root())
            .into_iter()
            .rev()
            .find(|&id| tree.text(id) == "a")
            .unwrap();
        let edits = json_merge(&tree, root, "b");
        assert_eq!(edits.0.len(), 1);
        assert_eq!(
            edits.apply(source).unwrap(),
            "import ballerina/lang.value as v;\n\
             function f(json a) returns json => v:mergeJson(a, b);"
        );
    }
}
