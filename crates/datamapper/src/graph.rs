//! The data mapper graph.
//!
//! Nodes, ports and links live in arenas owned by [`DataMapperGraph`] and
//! refer to each other by index. A graph is rebuilt from scratch for every
//! document revision and is immutable once built; edits are expressed as
//! source modifications (see [`crate::source`]).

use datamapper_syntax::{NodePosition, SyntaxNodeId};
use serde::Serialize;

use crate::editable::{EditableTree, FieldId};
use crate::node::DataMapperNode;
use crate::port::Port;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PortId(pub usize);

/// What the graph shows: a whole function, or the inside of one query
/// expression of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Function { name: String },
    Query { function: String, position: NodePosition },
}

impl Selection {
    pub fn function(name: impl Into<String>) -> Self {
        Selection::Function { name: name.into() }
    }

    pub fn query(function: impl Into<String>, position: NodePosition) -> Self {
        Selection::Query {
            function: function.into(),
            position,
        }
    }

    pub fn function_name(&self) -> &str {
        match self {
            Selection::Function { name } => name,
            Selection::Query { function, .. } => function,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkLabel {
    /// Expression shown on the link when it is more than the source access.
    pub text: String,
    pub diagnostics: Vec<String>,
    /// Link into a pass-through node; deleting it removes a single operand.
    pub is_sub_link: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub source: PortId,
    pub target: PortId,
    pub label: Option<LinkLabel>,
    /// Whole expression bound to the target field.
    pub value: Option<SyntaxNodeId>,
    /// The input reference inside `value` this link stands for.
    pub source_expr: Option<SyntaxNodeId>,
    /// Last element of the target's constructor path: the specific field
    /// or list element holding `value`.
    pub field_node: Option<SyntaxNodeId>,
}

impl Link {
    pub fn is_sub_link(&self) -> bool {
        self.label.as_ref().is_some_and(|l| l.is_sub_link)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMapperGraph {
    nodes: Vec<DataMapperNode>,
    ports: Vec<Port>,
    links: Vec<Link>,
    output: Option<NodeId>,
    /// Expression the output node is bound to: the function body or the
    /// select expression of the viewed query.
    output_expression: Option<SyntaxNodeId>,
}

impl DataMapperGraph {
    // ========================================================================
    // Construction
    // ========================================================================

    pub(crate) fn add_node(&mut self, node: DataMapperNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Add a port and register it with its node under its id.
    pub(crate) fn add_port(&mut self, port: Port) -> PortId {
        let id = PortId(self.ports.len());
        self.nodes[port.node.0].ports.insert(port.id.clone(), id);
        self.ports.push(port);
        id
    }

    pub(crate) fn port_mut(&mut self, id: PortId) -> &mut Port {
        &mut self.ports[id.0]
    }

    /// Add a link and record it on both of its ports.
    pub(crate) fn add_link(&mut self, link: Link) -> usize {
        self.ports[link.source.0].linked_ports.insert(link.target);
        self.ports[link.target.0].linked_ports.insert(link.source);
        self.links.push(link);
        self.links.len() - 1
    }

    pub(crate) fn set_output(&mut self, node: NodeId, expression: SyntaxNodeId) {
        self.output = Some(node);
        self.output_expression = Some(expression);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &DataMapperNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn node(&self, id: NodeId) -> &DataMapperNode {
        &self.nodes[id.0]
    }

    pub fn ports(&self) -> impl Iterator<Item = (PortId, &Port)> {
        self.ports.iter().enumerate().map(|(i, p)| (PortId(i), p))
    }

    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.0]
    }

    pub fn get_port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id.0)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, index: usize) -> Option<&Link> {
        self.links.get(index)
    }

    pub fn output_node(&self) -> Option<NodeId> {
        self.output
    }

    pub fn output_expression(&self) -> Option<SyntaxNodeId> {
        self.output_expression
    }

    pub fn output_tree(&self) -> Option<&EditableTree> {
        self.node(self.output?).editable.as_ref()
    }

    /// First port with the given id in any node.
    pub fn find_port(&self, id: &str) -> Option<PortId> {
        self.nodes.iter().find_map(|n| n.port(id))
    }

    /// Port of the output node bound to an enriched field.
    pub fn port_for_field(&self, field: FieldId) -> Option<PortId> {
        let node = self.node(self.output?);
        node.ports
            .values()
            .copied()
            .find(|p| self.port(*p).editable_field == Some(field))
    }

    pub fn input_nodes(&self) -> impl Iterator<Item = (NodeId, &DataMapperNode)> {
        self.nodes().filter(|(_, n)| n.kind.is_input())
    }

    /// `port` itself, or its closest ancestor that is not hidden.
    pub fn nearest_visible(&self, port: PortId) -> PortId {
        let mut current = port;
        while self.port(current).hidden {
            match self.port(current).parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Links ending at `port`.
    pub fn links_into(&self, port: PortId) -> impl Iterator<Item = (usize, &Link)> {
        self.links
            .iter()
            .enumerate()
            .filter(move |(_, l)| l.target == port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use crate::port::PortDirection;
    use datamapper_types::{PrimitiveKind, TypeField};

    fn string_port(id: &str, node: NodeId, parent: Option<PortId>, hidden: bool) -> Port {
        let ty = TypeField::primitive(PrimitiveKind::String);
        let mut port = Port::new(id, PortDirection::Out, ty, node);
        port.parent = parent;
        port.hidden = hidden;
        port
    }

    #[test]
    fn test_nearest_visible_climbs_hidden_ports() {
        let mut graph = DataMapperGraph::default();
        let node = graph.add_node(DataMapperNode::new(NodeKind::RequiredParam, "p"));
        let root = graph.add_port(string_port("p", node, None, false));
        let child = graph.add_port(string_port("p.a", node, Some(root), true));
        let leaf = graph.add_port(string_port("p.a.b", node, Some(child), true));

        assert_eq!(graph.nearest_visible(leaf), root);
        assert_eq!(graph.nearest_visible(root), root);
        assert_eq!(graph.find_port("p.a"), Some(child));
        assert_eq!(graph.node(node).header(), Some(root));
    }

    #[test]
    fn test_links_are_recorded_on_both_ports() {
        let mut graph = DataMapperGraph::default();
        let node = graph.add_node(DataMapperNode::new(NodeKind::RequiredParam, "p"));
        let a = graph.add_port(string_port("p", node, None, false));
        let b = graph.add_port(string_port("p.x", node, Some(a), false));
        graph.add_link(Link {
            source: a,
            target: b,
            label: None,
            value: None,
            source_expr: None,
            field_node: None,
        });

        assert!(graph.port(a).linked_ports.contains(&b));
        assert!(graph.port(b).linked_ports.contains(&a));
        assert_eq!(graph.links_into(b).count(), 1);
    }
}
