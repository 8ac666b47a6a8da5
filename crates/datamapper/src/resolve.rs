//! Port lookup for the two ends of a mapping.

use datamapper_syntax::query::field_names;
use datamapper_syntax::{SyntaxNodeId, SyntaxTree};
use datamapper_types::escape_field_name;

use crate::graph::{DataMapperGraph, PortId};

/// Output port for a constructor path. The path is followed through the
/// enriched tree as far as its elements are bound; the port of the deepest
/// field reached (or of its nearest ancestor with a port) is returned,
/// moved up to the nearest visible port.
///
/// A path that stops at a field with members of its own names a member
/// the tree does not have (filtered out or undeclared) and resolves to
/// nothing.
pub fn resolve_output_port(graph: &DataMapperGraph, path: &[SyntaxNodeId]) -> Option<PortId> {
    let tree = graph.output_tree()?;
    let mut current = tree.root();
    for &step in path {
        match tree.member_bound_to(current, step) {
            Some(member) => current = member,
            None if tree.members(current).next().is_some() => return None,
            None => break,
        }
    }
    let port = std::iter::once(current)
        .chain(tree.ancestors(current))
        .find_map(|field| graph.port_for_field(field))?;
    Some(graph.nearest_visible(port))
}

/// Input port for an input reference (`person.address.city`). The root
/// name selects the input node binding it; every further segment descends
/// one port level while such a port exists.
pub fn resolve_input_port(
    graph: &DataMapperGraph,
    tree: &SyntaxTree,
    reference: SyntaxNodeId,
) -> Option<PortId> {
    let segments = field_names(tree, reference)?;
    let (root, rest) = segments.split_first()?;
    for (_, node) in graph.input_nodes() {
        let Some(binding) = node.bindings.iter().find(|b| b.name == root.name) else {
            continue;
        };
        let mut port_id = binding.port_id.clone();
        let Some(mut found) = node.port(&port_id) else {
            continue;
        };
        for segment in rest {
            let candidate = format!("{port_id}.{}", escape_field_name(&segment.name));
            match node.port(&candidate) {
                Some(port) => {
                    found = port;
                    port_id = candidate;
                }
                None => break,
            }
        }
        return Some(graph.nearest_visible(found));
    }
    None
}
