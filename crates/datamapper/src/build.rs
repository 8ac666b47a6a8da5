//! Graph assembly.
//!
//! One rebuild: load the context, add one input node per variable in scope,
//! enrich the output type and add the output node, then turn every mapping
//! of the output expression into links.

use datamapper_syntax::query::{
    binding_names, collect_input_references, field_names, find_function, function_body_expression,
    innermost_expression_body, module_members, relative_path_of_field,
};
use datamapper_syntax::{NodePosition, SyntaxKind, SyntaxNodeId, SyntaxTree};
use datamapper_types::shape::optional_record_field;
use datamapper_types::{PrimitiveKind, TypeField, TypeInfo, TypeKind, escape_field_name};
use tracing::{debug, info};

use crate::config::MapperConfig;
use crate::context::{LanguageService, RebuildContext};
use crate::enrich::enrich;
use crate::error::{EnrichError, GraphError};
use crate::graph::{DataMapperGraph, Link, LinkLabel, NodeId, PortId, Selection};
use crate::mapping::{Mapping, discover_mappings};
use crate::node::{Binding, DataMapperNode, NodeKind};
use crate::port::{add_connector_ports, add_enum_ports, add_input_ports, add_output_ports};
use crate::resolve::{resolve_input_port, resolve_output_port};
use crate::search::{filter_input_type, filter_output_type};

/// Build the graph of `selection` for one document revision.
pub fn build_graph(
    tree: &SyntaxTree,
    service: &dyn LanguageService,
    selection: &Selection,
    config: &MapperConfig,
) -> Result<DataMapperGraph, GraphError> {
    let name = selection.function_name();
    let function = find_function(tree, name)
        .ok_or_else(|| GraphError::FunctionNotFound(name.to_string()))?;
    let body = function_body_expression(tree, function)
        .ok_or_else(|| GraphError::NoExpressionBody(name.to_string()))?;
    let ctx = RebuildContext::load(tree, function, service);
    let mut builder = GraphBuilder::new(tree, &ctx, config);

    builder.add_parameters(function);
    let (output_expr, output_ty) = match selection {
        Selection::Function { .. } => {
            builder.add_let_variables(body);
            let ty = function_return_type(tree, &ctx, function)
                .or_else(|| ctx.type_of(tree, body).cloned());
            (body, ty)
        }
        Selection::Query { position, .. } => {
            let query = find_query(tree, function, position)
                .ok_or(GraphError::QueryNotFound(*position))?;
            builder.add_query_clauses(query);
            let select =
                select_expression(tree, query).ok_or(GraphError::QueryNotFound(*position))?;
            let ty = ctx.type_of(tree, select).cloned().or_else(|| {
                ctx.type_of(tree, query)
                    .and_then(TypeField::array_member)
                    .cloned()
            });
            (select, ty)
        }
    };
    builder.add_module_inputs(output_expr);

    let output_ty = output_ty.ok_or_else(|| GraphError::MissingOutputType(name.to_string()))?;
    builder.add_output(name, &output_ty, output_expr);
    builder.add_links(output_expr);

    let graph = builder.graph;
    info!(
        function = name,
        nodes = graph.nodes().count(),
        ports = graph.ports().count(),
        links = graph.links().len(),
        "built data mapper graph"
    );
    Ok(graph)
}

fn function_return_type(
    tree: &SyntaxTree,
    ctx: &RebuildContext,
    function: SyntaxNodeId,
) -> Option<TypeField> {
    let SyntaxKind::FunctionDefinition {
        return_type: Some(return_type),
        ..
    } = tree.kind(function)
    else {
        return None;
    };
    ctx.type_of(tree, *return_type).cloned()
}

fn find_query(
    tree: &SyntaxTree,
    function: SyntaxNodeId,
    position: &NodePosition,
) -> Option<SyntaxNodeId> {
    tree.descendants(function).into_iter().find(|&id| {
        matches!(tree.kind(id), SyntaxKind::QueryExpression { .. })
            && tree.position(id) == *position
    })
}

fn select_expression(tree: &SyntaxTree, query: SyntaxNodeId) -> Option<SyntaxNodeId> {
    let SyntaxKind::QueryExpression { result, .. } = tree.kind(query) else {
        return None;
    };
    match tree.kind(*result) {
        SyntaxKind::SelectClause { expression } => Some(*expression),
        _ => None,
    }
}

fn anydata(name: &str) -> TypeField {
    TypeField::primitive(PrimitiveKind::Anydata).named(name)
}

struct GraphBuilder<'a> {
    tree: &'a SyntaxTree,
    ctx: &'a RebuildContext,
    config: &'a MapperConfig,
    graph: DataMapperGraph,
    connectors: usize,
}

impl<'a> GraphBuilder<'a> {
    fn new(tree: &'a SyntaxTree, ctx: &'a RebuildContext, config: &'a MapperConfig) -> Self {
        Self {
            tree,
            ctx,
            config,
            graph: DataMapperGraph::default(),
            connectors: 0,
        }
    }

    fn is_bound(&self, name: &str) -> bool {
        self.graph
            .input_nodes()
            .any(|(_, n)| n.bindings.iter().any(|b| b.name == name))
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    fn add_parameters(&mut self, function: SyntaxNodeId) {
        let tree = self.tree;
        let SyntaxKind::FunctionDefinition { params, .. } = tree.kind(function) else {
            return;
        };
        for &param in params {
            let SyntaxKind::RequiredParam { name, .. } = tree.kind(param) else {
                continue;
            };
            let name = name.text.clone();
            let ty = self
                .ctx
                .type_of(tree, param)
                .cloned()
                .unwrap_or_else(|| anydata(&name));
            let node = DataMapperNode::new(NodeKind::RequiredParam, name.clone()).with_value(param);
            self.add_input(node, ty, name.clone(), vec![(name, String::new())]);
        }
    }

    /// `let` declarations wrapping the function body.
    fn add_let_variables(&mut self, body: SyntaxNodeId) {
        let tree = self.tree;
        let mut current = body;
        loop {
            match tree.kind(current) {
                SyntaxKind::LetExpression { declarations, body } => {
                    for &decl in declarations {
                        self.add_declaration(NodeKind::LetExpression, decl);
                    }
                    current = *body;
                }
                SyntaxKind::BracedExpression { expression } => current = *expression,
                _ => return,
            }
        }
    }

    fn add_query_clauses(&mut self, query: SyntaxNodeId) {
        let tree = self.tree;
        let SyntaxKind::QueryExpression { from, clauses, .. } = tree.kind(query) else {
            return;
        };
        for &clause in std::iter::once(from).chain(clauses) {
            match tree.kind(clause) {
                SyntaxKind::FromClause {
                    pattern, expression, ..
                } => self.add_pattern_input(NodeKind::FromClause, clause, *pattern, *expression),
                SyntaxKind::JoinClause {
                    pattern, expression, ..
                } => self.add_pattern_input(NodeKind::JoinClause, clause, *pattern, *expression),
                SyntaxKind::LetClause { declarations } => {
                    for &decl in declarations {
                        self.add_declaration(NodeKind::LetClause, decl);
                    }
                }
                _ => {}
            }
        }
    }

    fn add_declaration(&mut self, kind: NodeKind, decl: SyntaxNodeId) {
        if let SyntaxKind::LetVarDecl { pattern, init, .. } = self.tree.kind(decl) {
            self.add_pattern_input(kind, decl, *pattern, *init);
        }
    }

    /// An input bound by a binding pattern. A captured variable is the
    /// root itself; a destructured one is the member at its relative path.
    fn add_pattern_input(
        &mut self,
        kind: NodeKind,
        value: SyntaxNodeId,
        pattern: SyntaxNodeId,
        source: SyntaxNodeId,
    ) {
        let tree = self.tree;
        let names = binding_names(tree, pattern);
        let name = match tree.kind(pattern) {
            SyntaxKind::CaptureBindingPattern { name } => name.text.clone(),
            _ => tree.text(source).to_string(),
        };
        let ty = self
            .ctx
            .type_of(tree, pattern)
            .cloned()
            .unwrap_or_else(|| anydata(&name));
        let bindings = names
            .into_iter()
            .filter_map(|n| {
                let path = relative_path_of_field(tree, pattern, &n)?;
                let suffix: String = path
                    .split('.')
                    .filter(|s| !s.is_empty())
                    .map(|s| format!(".{}", escape_field_name(s)))
                    .collect();
                Some((n, suffix))
            })
            .collect();
        let node = DataMapperNode::new(kind, name.clone()).with_value(value);
        self.add_input(node, ty, name, bindings);
    }

    /// Module variables and enum members referenced by the output expression.
    fn add_module_inputs(&mut self, output_expr: SyntaxNodeId) {
        let tree = self.tree;
        let roots: Vec<String> = collect_input_references(tree, output_expr)
            .into_iter()
            .filter_map(|r| field_names(tree, r)?.into_iter().next())
            .map(|s| s.name)
            .collect();
        for root in roots {
            if self.is_bound(&root) {
                continue;
            }
            if let Some(decl) = module_var(tree, &root) {
                let ty = self
                    .ctx
                    .type_of(tree, decl)
                    .cloned()
                    .unwrap_or_else(|| anydata(&root));
                let node =
                    DataMapperNode::new(NodeKind::ModuleVariable, root.clone()).with_value(decl);
                self.add_input(node, ty, root.clone(), vec![(root, String::new())]);
            } else if let Some(decl) = enum_with_member(tree, &root) {
                let added = self.graph.nodes().any(|(_, n)| n.value == Some(decl));
                if !added {
                    self.add_enum(decl);
                }
            }
        }
    }

    fn add_enum(&mut self, decl: SyntaxNodeId) {
        let SyntaxKind::EnumDeclaration { name, members } = self.tree.kind(decl) else {
            return;
        };
        let name = name.text.clone();
        let members: Vec<String> = members.iter().map(|m| m.text.clone()).collect();
        let ty = TypeField::primitive(PrimitiveKind::String)
            .named(name.clone())
            .with_type_info(TypeInfo::local(name.clone()));
        let mut node = DataMapperNode::new(NodeKind::EnumType, name)
            .with_value(decl)
            .with_type(ty.clone());
        let header_id = node.header_id();
        node.bindings = members
            .iter()
            .map(|m| Binding {
                name: m.clone(),
                port_id: format!("{header_id}.{m}"),
            })
            .collect();
        let id = self.graph.add_node(node);
        add_enum_ports(&mut self.graph, id, &ty, header_id, &members, self.config);
        debug!(members = members.len(), "added enum input");
    }

    /// Add an input node with its ports. `bindings` pairs each variable the
    /// node brings into scope with the id suffix of its port below the header.
    fn add_input(
        &mut self,
        mut node: DataMapperNode,
        ty: TypeField,
        access: String,
        bindings: Vec<(String, String)>,
    ) {
        let header_id = node.header_id();
        node.bindings = bindings
            .iter()
            .map(|(name, suffix)| Binding {
                name: name.clone(),
                port_id: format!("{header_id}{suffix}"),
            })
            .collect();
        let filtered = filter_input_type(&node.name, &ty, &self.config.input_search);
        node.has_no_match = filtered.is_none();
        node.ty = Some(ty);
        let id = self.graph.add_node(node);
        if let Some(filtered) = filtered {
            add_input_ports(&mut self.graph, id, &filtered, header_id, access, self.config);
            self.rebase_bindings(id, &bindings);
        }
    }

    /// Ports under a destructured binding are accessed through the bound
    /// variable, not through the (unnamed) root.
    fn rebase_bindings(&mut self, node: NodeId, bindings: &[(String, String)]) {
        for (name, suffix) in bindings {
            if suffix.is_empty() {
                continue;
            }
            let header_id = self.graph.node(node).header_id();
            let Some(bound) = self.graph.node(node).port(&format!("{header_id}{suffix}")) else {
                continue;
            };
            let bound_fqn = self.graph.port(bound).field_fqn.clone();
            let bound_id = self.graph.port(bound).id.clone();
            let under: Vec<PortId> = self
                .graph
                .node(node)
                .ports
                .iter()
                .filter(|(id, _)| *id == &bound_id || id.starts_with(&format!("{bound_id}.")))
                .map(|(_, p)| *p)
                .collect();
            for port in under {
                let port = self.graph.port_mut(port);
                let rest = port.field_fqn.strip_prefix(&bound_fqn).unwrap_or_default().to_string();
                port.field_fqn = format!("{name}{rest}");
            }
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    fn add_output(&mut self, name: &str, ty: &TypeField, expr: SyntaxNodeId) {
        let filtered = filter_output_type(ty, &self.config.output_search);
        let kind = output_kind(filtered.as_ref().unwrap_or(ty));
        let mut node = DataMapperNode::new(kind, name).with_value(expr).with_type(ty.clone());
        let Some(filtered) = filtered else {
            node.has_no_match = true;
            let id = self.graph.add_node(node);
            self.graph.set_output(id, expr);
            return;
        };

        let passes = self.config.max_enrichment_passes;
        let editable = match enrich(self.tree, self.ctx, &filtered, Some(expr), passes) {
            Ok(editable) => editable,
            Err(err) => {
                node.diagnostics.push(err.to_string());
                let EnrichError::NotConverged { last, .. } = err;
                *last
            }
        };
        if let NodeKind::UnionType { requires_cast } = &mut node.kind {
            *requires_cast = editable.field(editable.root()).requires_cast();
        }
        let header_id = node.header_id();
        node.editable = Some(editable.clone());
        let id = self.graph.add_node(node);
        self.graph.set_output(id, expr);
        add_output_ports(&mut self.graph, id, &editable, header_id, self.config);
    }

    // ========================================================================
    // Links
    // ========================================================================

    fn add_links(&mut self, output_expr: SyntaxNodeId) {
        if self.graph.output_tree().is_none() {
            return;
        }
        let tree = self.tree;
        for mapping in discover_mappings(tree, output_expr) {
            let Some(target) = resolve_output_port(&self.graph, &mapping.path) else {
                debug!(value = tree.text(mapping.value), "mapping has no output port");
                continue;
            };
            let field_node = mapping.path.last().copied();
            let Some(source_expr) = mapping.source else {
                self.add_pass_through(&mapping, target, field_node);
                continue;
            };
            let Some(source) = resolve_input_port(&self.graph, tree, source_expr) else {
                debug!(source = tree.text(source_expr), "mapping has no input port");
                continue;
            };
            let text = tree.text(mapping.value);
            let label = (text != tree.text(source_expr)).then(|| LinkLabel {
                text: text.to_string(),
                diagnostics: Vec::new(),
                is_sub_link: false,
            });
            self.graph.add_link(Link {
                source,
                target,
                label,
                value: Some(mapping.value),
                source_expr: Some(source_expr),
                field_node,
            });
        }
    }

    /// Route a mapping through a connector node: every input reference
    /// links into its `IN` port and its `OUT` port links to the target.
    fn add_pass_through(
        &mut self,
        mapping: &Mapping,
        target: PortId,
        field_node: Option<SyntaxNodeId>,
    ) {
        let tree = self.tree;
        let inner = innermost_expression_body(tree, mapping.value);
        let kind = match tree.kind(inner) {
            SyntaxKind::QueryExpression { .. } => NodeKind::QueryExpression,
            SyntaxKind::FunctionCall { name, .. } => NodeKind::LinkConnector {
                function: self
                    .ctx
                    .functions
                    .get(&tree.token_position(name).start())
                    .cloned(),
            },
            _ => NodeKind::LinkConnector { function: None },
        };
        let ty = self
            .ctx
            .type_of(tree, inner)
            .cloned()
            .unwrap_or_else(|| TypeField::primitive(PrimitiveKind::Anydata));
        let node = DataMapperNode::new(kind, self.connectors.to_string())
            .with_value(mapping.value)
            .with_type(ty.clone());
        self.connectors += 1;
        let header_id = node.header_id();
        let id = self.graph.add_node(node);
        let (input, output) = add_connector_ports(&mut self.graph, id, &ty, &header_id);

        for &reference in &mapping.inputs {
            let Some(source) = resolve_input_port(&self.graph, tree, reference) else {
                debug!(source = tree.text(reference), "operand has no input port");
                continue;
            };
            self.graph.add_link(Link {
                source,
                target: input,
                label: Some(LinkLabel {
                    text: tree.text(reference).to_string(),
                    diagnostics: Vec::new(),
                    is_sub_link: true,
                }),
                value: Some(mapping.value),
                source_expr: Some(reference),
                field_node,
            });
        }
        self.graph.add_link(Link {
            source: output,
            target,
            label: None,
            value: Some(mapping.value),
            source_expr: None,
            field_node,
        });
    }
}

/// Node kind of an output of type `ty`.
fn output_kind(ty: &TypeField) -> NodeKind {
    if optional_record_field(ty).is_some() {
        return NodeKind::MappingConstructor;
    }
    match &ty.kind {
        TypeKind::Record { .. } | TypeKind::Map { .. } | TypeKind::Reference => {
            NodeKind::MappingConstructor
        }
        TypeKind::Intersection { members } if members.iter().any(TypeField::is_record) => {
            NodeKind::MappingConstructor
        }
        TypeKind::Array { .. } => NodeKind::ListConstructor,
        TypeKind::Union { .. } => NodeKind::UnionType { requires_cast: false },
        _ => NodeKind::PrimitiveType,
    }
}

fn module_var(tree: &SyntaxTree, name: &str) -> Option<SyntaxNodeId> {
    module_members(tree, |k| matches!(k, SyntaxKind::ModuleVarDecl { .. })).find(
        |&id| matches!(tree.kind(id), SyntaxKind::ModuleVarDecl { name: n, .. } if n.text == name),
    )
}

fn enum_with_member(tree: &SyntaxTree, member: &str) -> Option<SyntaxNodeId> {
    module_members(tree, |k| matches!(k, SyntaxKind::EnumDeclaration { .. })).find(|&id| {
        matches!(
            tree.kind(id),
            SyntaxKind::EnumDeclaration { members, .. } if members.iter().any(|m| m.text == member)
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_types::LocalTypeService;
    use datamapper_syntax::parse;

    const SOURCE: &str = r#"
type Address record {
    string city;
    string zip;
};

type Person record {
    string name;
    int age;
    Address address;
};

type Student record {
    string name;
    string city;
    Color color;
};

enum Color { RED, GREEN }

string suffix = "!";

function f(Person person) returns Student => {
    name: person.name + suffix,
    city: person.address.city,
    color: RED
};
"#;

    fn build(
        source: &str,
        selection: &Selection,
        config: &MapperConfig,
    ) -> (SyntaxTree, DataMapperGraph) {
        let tree = parse(source).unwrap();
        let graph = {
            let service = LocalTypeService::new(&tree);
            build_graph(&tree, &service, selection, config).unwrap()
        };
        (tree, graph)
    }

    #[test]
    fn test_input_nodes_in_scope() {
        let (_, graph) = build(SOURCE, &Selection::function("f"), &MapperConfig::default());
        let kinds: Vec<(NodeKind, String)> = graph
            .input_nodes()
            .map(|(_, n)| (n.kind.clone(), n.name.clone()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (NodeKind::RequiredParam, "person".to_string()),
                (NodeKind::ModuleVariable, "suffix".to_string()),
                (NodeKind::EnumType, "Color".to_string()),
            ]
        );
        assert!(graph.find_port("person.address.city").is_some());
        assert!(graph.find_port("moduleVariable.suffix").is_some());
        assert!(graph.find_port("enumType.Color.RED").is_some());
    }

    #[test]
    fn test_links_for_direct_and_labelled_mappings() {
        let (_, graph) = build(SOURCE, &Selection::function("f"), &MapperConfig::default());
        let city = graph.find_port("mappingConstructor.city").unwrap();
        let link = graph.links_into(city).next().unwrap().1;
        assert_eq!(graph.port(link.source).id, "person.address.city");
        assert_eq!(link.label, None);

        let color = graph.find_port("mappingConstructor.color").unwrap();
        let link = graph.links_into(color).next().unwrap().1;
        assert_eq!(graph.port(link.source).id, "enumType.Color.RED");
    }

    #[test]
    fn test_multiple_inputs_go_through_a_connector() {
        let (_, graph) = build(SOURCE, &Selection::function("f"), &MapperConfig::default());
        let connector_in = graph.find_port("linkConnector.0.IN").unwrap();
        let sources: Vec<&str> = graph
            .links_into(connector_in)
            .map(|(_, l)| graph.port(l.source).id.as_str())
            .collect();
        assert_eq!(sources, vec!["person.name", "moduleVariable.suffix"]);
        assert!(graph.links_into(connector_in).all(|(_, l)| l.is_sub_link()));

        let name = graph.find_port("mappingConstructor.name").unwrap();
        let link = graph.links_into(name).next().unwrap().1;
        assert_eq!(graph.port(link.source).id, "linkConnector.0.OUT");
    }

    #[test]
    fn test_collapsed_ports_hide_their_links() {
        let config = MapperConfig::default().with_collapsed("person.address");
        let (_, graph) = build(SOURCE, &Selection::function("f"), &config);
        let city = graph.find_port("person.address.city").unwrap();
        assert!(graph.port(city).hidden);
        let target = graph.find_port("mappingConstructor.city").unwrap();
        let link = graph.links_into(target).next().unwrap().1;
        assert_eq!(graph.port(link.source).id, "person.address");
    }

    #[test]
    fn test_output_search_without_match() {
        let config = MapperConfig::default().with_output_search("nothing");
        let (_, graph) = build(SOURCE, &Selection::function("f"), &config);
        let output = graph.node(graph.output_node().unwrap());
        assert!(output.has_no_match);
        assert!(graph.links().is_empty());
    }

    #[test]
    fn test_query_view_inputs() {
        let source = r#"
type Item record {
    string id;
    Detail detail;
};

type Detail record {
    string label;
};

type Row record {
    string id;
    string label;
};

function f(Item[] items) returns Row[] =>
    from var {id, detail} in items
    select {id: id, label: detail.label};
"#;
        let tree = parse(source).unwrap();
        let query = tree
            .descendants(tree.root())
            .into_iter()
            .find(|&id| matches!(tree.kind(id), SyntaxKind::QueryExpression { .. }))
            .unwrap();
        let selection = Selection::query("f", tree.position(query));
        let (_, graph) = build(source, &selection, &MapperConfig::default());

        let from = graph
            .input_nodes()
            .find(|(_, n)| n.kind == NodeKind::FromClause)
            .unwrap()
            .1;
        assert_eq!(from.name, "items");
        let label = graph.find_port("expandedQueryExpr.source.items.detail.label").unwrap();
        assert_eq!(graph.port(label).field_fqn, "detail.label");

        let target = graph.find_port("mappingConstructor.label").unwrap();
        let link = graph.links_into(target).next().unwrap().1;
        assert_eq!(graph.port(link.source).id, "expandedQueryExpr.source.items.detail.label");
    }

    #[test]
    fn test_nested_query_goes_through_query_node() {
        let source = r#"
type Item record {
    string id;
};

type Row record {
    string id;
};

type Out record {
    Row[] rows;
};

function f(Item[] items) returns Out => {rows: from var item in items select {id: item.id}};
"#;
        let (_, graph) = build(source, &Selection::function("f"), &MapperConfig::default());
        let (_, query) = graph
            .nodes()
            .find(|(_, n)| n.kind == NodeKind::QueryExpression)
            .unwrap();
        assert_eq!(query.name, "0");

        let rows = graph.find_port("mappingConstructor.rows").unwrap();
        let link = graph.links_into(rows).next().unwrap().1;
        assert_eq!(graph.port(link.source).id, "queryExpression.0.OUT");
        let input = graph.find_port("queryExpression.0.IN").unwrap();
        assert!(graph.links_into(input).any(|(_, l)| graph.port(l.source).id == "items"));
    }

    #[test]
    fn test_unknown_function() {
        let tree = parse(SOURCE).unwrap();
        let service = LocalTypeService::new(&tree);
        let err =
            build_graph(&tree, &service, &Selection::function("g"), &MapperConfig::default())
                .unwrap_err();
        assert_eq!(err, GraphError::FunctionNotFound("g".to_string()));
    }
}
