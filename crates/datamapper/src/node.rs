//! Graph nodes.

use datamapper_syntax::SyntaxNodeId;
use datamapper_types::TypeField;
use indexmap::IndexMap;
use serde::Serialize;

use crate::context::FnDefInfo;
use crate::editable::EditableTree;
use crate::graph::PortId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeKind {
    // === Inputs ===
    RequiredParam,
    FromClause,
    JoinClause,
    LetClause,
    LetExpression,
    ModuleVariable,
    EnumType,

    // === Outputs ===
    MappingConstructor,
    ListConstructor,
    PrimitiveType,
    /// `requires_cast` is set when no member could be picked for the value.
    #[serde(rename_all = "camelCase")]
    UnionType { requires_cast: bool },

    // === Pass-through ===
    /// An expression too complex for a direct link: several inputs, a
    /// function call, indexing, a conditional.
    LinkConnector { function: Option<FnDefInfo> },
    QueryExpression,
}

impl NodeKind {
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            NodeKind::RequiredParam
                | NodeKind::FromClause
                | NodeKind::JoinClause
                | NodeKind::LetClause
                | NodeKind::LetExpression
                | NodeKind::ModuleVariable
                | NodeKind::EnumType
        )
    }

    pub fn is_output(&self) -> bool {
        matches!(
            self,
            NodeKind::MappingConstructor
                | NodeKind::ListConstructor
                | NodeKind::PrimitiveType
                | NodeKind::UnionType { .. }
        )
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(self, NodeKind::LinkConnector { .. } | NodeKind::QueryExpression)
    }

    /// First segment of the ids of the node's ports. Parameters use their
    /// own name instead.
    pub fn port_prefix(&self) -> &'static str {
        match self {
            NodeKind::RequiredParam => "",
            NodeKind::FromClause | NodeKind::JoinClause => "expandedQueryExpr.source",
            NodeKind::LetClause | NodeKind::LetExpression => "letExpression",
            NodeKind::ModuleVariable => "moduleVariable",
            NodeKind::EnumType => "enumType",
            NodeKind::MappingConstructor => "mappingConstructor",
            NodeKind::ListConstructor => "listConstructor",
            NodeKind::PrimitiveType => "primitiveType",
            NodeKind::UnionType { .. } => "unionType",
            NodeKind::LinkConnector { .. } => "linkConnector",
            NodeKind::QueryExpression => "queryExpression",
        }
    }
}

/// A variable an input node brings into scope and the port it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub name: String,
    pub port_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMapperNode {
    pub kind: NodeKind,
    pub name: String,
    /// Syntax the node stands for: a parameter, clause, declaration or expression.
    pub value: Option<SyntaxNodeId>,
    pub ty: Option<TypeField>,
    /// Ports by id, header first.
    pub ports: IndexMap<String, PortId>,
    pub bindings: Vec<Binding>,
    /// Enriched output fields. Output nodes only.
    pub editable: Option<EditableTree>,
    /// Search left nothing to show.
    pub has_no_match: bool,
    pub diagnostics: Vec<String>,
}

impl DataMapperNode {
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            value: None,
            ty: None,
            ports: IndexMap::new(),
            bindings: Vec::new(),
            editable: None,
            has_no_match: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: SyntaxNodeId) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_type(mut self, ty: TypeField) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Id of the header port.
    pub fn header_id(&self) -> String {
        match self.kind.port_prefix() {
            "" => self.name.clone(),
            prefix if self.kind.is_output() => prefix.to_string(),
            prefix => format!("{prefix}.{}", self.name),
        }
    }

    pub fn header(&self) -> Option<PortId> {
        self.ports.first().map(|(_, p)| *p)
    }

    pub fn port(&self, id: &str) -> Option<PortId> {
        self.ports.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_ids() {
        assert_eq!(DataMapperNode::new(NodeKind::RequiredParam, "person").header_id(), "person");
        assert_eq!(
            DataMapperNode::new(NodeKind::ModuleVariable, "prefix").header_id(),
            "moduleVariable.prefix"
        );
        assert_eq!(
            DataMapperNode::new(NodeKind::FromClause, "item").header_id(),
            "expandedQueryExpr.source.item"
        );
        assert_eq!(
            DataMapperNode::new(NodeKind::MappingConstructor, "f").header_id(),
            "mappingConstructor"
        );
        assert_eq!(
            DataMapperNode::new(NodeKind::LinkConnector { function: None }, "0").header_id(),
            "linkConnector.0"
        );
    }

    #[test]
    fn test_kind_classes() {
        assert!(NodeKind::JoinClause.is_input());
        assert!(NodeKind::UnionType { requires_cast: true }.is_output());
        assert!(NodeKind::QueryExpression.is_pass_through());
        assert!(!NodeKind::QueryExpression.is_input());
    }
}
