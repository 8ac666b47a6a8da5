//! Ports.
//!
//! One port per addressable field occurrence. Ids are dotted paths below
//! the node's header id: escaped field names for record members, element
//! indexes for array members. Fields the language service could not name
//! get no port. Optional records add no level of their own: their fields
//! hang directly below the field's port.

use datamapper_types::shape::optional_record_field;
use datamapper_types::{PrimitiveKind, TypeField, TypeKind, escape_field_name, is_missing_name};
use indexmap::IndexSet;
use serde::Serialize;

use crate::access::member_access;
use crate::config::MapperConfig;
use crate::editable::{EditableTree, FieldId};
use crate::graph::{DataMapperGraph, NodeId, PortId};

/// Which end of a link a port can be. Input nodes expose `Out` ports,
/// output nodes `In` ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortDirection {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: String,
    pub direction: PortDirection,
    pub field: TypeField,
    pub field_name: Option<String>,
    /// Input ports: the access expression (`person.address?.city`).
    /// Output ports: the dotted member path below the root (`address.city`).
    pub field_fqn: String,
    pub parent: Option<PortId>,
    pub node: NodeId,
    /// Position among the parent's array elements.
    pub index: Option<usize>,
    pub editable_field: Option<FieldId>,
    pub collapsed: bool,
    pub hidden: bool,
    /// Output ports: a union whose member could not be picked for the
    /// bound value. The user has to add a type cast.
    pub requires_cast: bool,
    pub linked_ports: IndexSet<PortId>,
}

impl Port {
    pub fn new(
        id: impl Into<String>,
        direction: PortDirection,
        field: TypeField,
        node: NodeId,
    ) -> Self {
        Self {
            id: id.into(),
            direction,
            field_name: field.name.clone(),
            field,
            field_fqn: String::new(),
            parent: None,
            node,
            index: None,
            editable_field: None,
            collapsed: false,
            hidden: false,
            requires_cast: false,
            linked_ports: IndexSet::new(),
        }
    }
}

/// Record whose fields become child ports of a field of type `ty`.
fn member_record(ty: &TypeField) -> Option<&TypeField> {
    if let Some(record) = optional_record_field(ty) {
        return Some(record);
    }
    match &ty.kind {
        TypeKind::Record { .. } => Some(ty),
        TypeKind::Intersection { members } => members.iter().find(|m| m.is_record()),
        _ => None,
    }
}

fn join_path(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

/// Adds the ports of one node.
struct PortBuilder<'g> {
    graph: &'g mut DataMapperGraph,
    node: NodeId,
    config: &'g MapperConfig,
}

impl<'g> PortBuilder<'g> {
    fn new(graph: &'g mut DataMapperGraph, node: NodeId, config: &'g MapperConfig) -> Self {
        Self { graph, node, config }
    }

    /// Add a port and set its visibility from its parent and the collapsed set.
    fn attach(&mut self, mut port: Port, parent: Option<PortId>) -> PortId {
        port.parent = parent;
        port.collapsed = self.config.is_collapsed(&port.id);
        port.hidden = parent.is_some_and(|p| {
            let parent = self.graph.port(p);
            parent.collapsed || parent.hidden
        });
        self.graph.add_port(port)
    }

    fn input(
        &mut self,
        ty: &TypeField,
        id: String,
        access: String,
        parent: Option<PortId>,
    ) -> PortId {
        let mut port = Port::new(id.clone(), PortDirection::Out, ty.clone(), self.node);
        port.field_fqn = access.clone();
        let port_id = self.attach(port, parent);

        if let Some(record) = member_record(ty) {
            let nillable = record.optional || ty.is_union();
            for field in record.record_fields().unwrap_or_default() {
                let Some(name) = field.name.as_deref() else {
                    continue;
                };
                if is_missing_name(name) {
                    continue;
                }
                let child_id = format!("{id}.{}", escape_field_name(name));
                let child_access = member_access(&access, name, field.optional || nillable);
                self.input(field, child_id, child_access, Some(port_id));
            }
        }
        port_id
    }

    fn output(
        &mut self,
        tree: &EditableTree,
        field_id: FieldId,
        id: String,
        path: String,
        parent: Option<PortId>,
    ) -> PortId {
        let field = tree.field(field_id);
        let mut port = Port::new(id.clone(), PortDirection::In, field.ty.clone(), self.node);
        port.field_fqn = path.clone();
        port.editable_field = Some(field_id);
        port.index = tree.element_index(field_id);
        port.requires_cast = field.requires_cast();
        let port_id = self.attach(port, parent);

        for &child in &field.children {
            let Some(name) = tree.field(child).name() else {
                continue;
            };
            if is_missing_name(name) {
                continue;
            }
            let segment = escape_field_name(name);
            let child_path = join_path(&path, &segment);
            self.output(tree, child, format!("{id}.{segment}"), child_path, Some(port_id));
        }
        for (index, element) in field.elements.iter().enumerate() {
            let segment = index.to_string();
            let child_path = join_path(&path, &segment);
            self.output(tree, element.member, format!("{id}.{segment}"), child_path, Some(port_id));
        }
        port_id
    }
}

/// Ports of an input root and all its record members.
pub(crate) fn add_input_ports(
    graph: &mut DataMapperGraph,
    node: NodeId,
    ty: &TypeField,
    header_id: String,
    access: String,
    config: &MapperConfig,
) -> PortId {
    PortBuilder::new(graph, node, config).input(ty, header_id, access, None)
}

/// Ports of an enum: one header and one port per member, each member
/// accessed by its bare name.
pub(crate) fn add_enum_ports(
    graph: &mut DataMapperGraph,
    node: NodeId,
    ty: &TypeField,
    header_id: String,
    members: &[String],
    config: &MapperConfig,
) -> PortId {
    let mut builder = PortBuilder::new(graph, node, config);
    let mut header = Port::new(header_id.clone(), PortDirection::Out, ty.clone(), node);
    header.field_fqn = ty.type_name();
    let header = builder.attach(header, None);
    for member in members {
        let field = TypeField::primitive(PrimitiveKind::String).named(member.clone());
        let mut port = Port::new(format!("{header_id}.{member}"), PortDirection::Out, field, node);
        port.field_fqn = member.clone();
        builder.attach(port, Some(header));
    }
    header
}

/// The `IN` and `OUT` ports of a pass-through node.
pub(crate) fn add_connector_ports(
    graph: &mut DataMapperGraph,
    node: NodeId,
    ty: &TypeField,
    header_id: &str,
) -> (PortId, PortId) {
    let input = Port::new(format!("{header_id}.IN"), PortDirection::In, ty.clone(), node);
    let output = Port::new(format!("{header_id}.OUT"), PortDirection::Out, ty.clone(), node);
    (graph.add_port(input), graph.add_port(output))
}

/// Ports of an enriched output tree.
pub(crate) fn add_output_ports(
    graph: &mut DataMapperGraph,
    node: NodeId,
    tree: &EditableTree,
    header_id: String,
    config: &MapperConfig,
) -> PortId {
    PortBuilder::new(graph, node, config).output(tree, tree.root(), header_id, String::new(), None)
}
