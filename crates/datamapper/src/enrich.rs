//! Field enrichment.
//!
//! Walks an output type together with the expression bound to it and
//! produces an [`EditableTree`]: record members are paired with the
//! specific fields of mapping constructors by name, array members with the
//! elements of list constructors by position (or with the select expression
//! of a query), unions are narrowed to the member the expression produces,
//! and `anydata` members take the shape of their literal.
//!
//! Inference can expose new structure, so enrichment is repeated on the
//! refined type until it stops changing.

use datamapper_syntax::query::{
    find_specific_field, innermost_expression_body, normalize_field_name,
};
use datamapper_syntax::{SyntaxKind, SyntaxNodeId, SyntaxTree};
use datamapper_types::shape::optional_record_field;
use datamapper_types::{ANYDATA_TYPE_NAME, PrimitiveKind, TypeField, TypeKind, UnionResolution};
use tracing::{debug, warn};

use crate::context::RebuildContext;
use crate::editable::{ArrayElement, EditableField, EditableTree, FieldId};
use crate::error::EnrichError;
use crate::infer::infer_type;
use crate::union::resolve_union_member;

/// Enrich `ty` with the expression `node`, re-running until the refined
/// type is stable or `max_passes` is reached.
pub fn enrich(
    tree: &SyntaxTree,
    ctx: &RebuildContext,
    ty: &TypeField,
    node: Option<SyntaxNodeId>,
    max_passes: usize,
) -> Result<EditableTree, EnrichError> {
    let max_passes = max_passes.max(1);
    let mut current = ty.clone();
    let mut seen: Vec<TypeField> = Vec::new();
    let mut pass = 1;
    loop {
        let enriched = Enricher::new(tree, ctx).run(&current, node);
        let refined = enriched.refined_type();
        if refined == current {
            debug!(pass, fields = enriched.len(), "enrichment converged");
            return Ok(enriched);
        }
        if pass >= max_passes || seen.contains(&refined) {
            warn!(pass, ty = %ty, "enrichment did not converge");
            return Err(EnrichError::NotConverged {
                passes: pass,
                last: Box::new(enriched),
            });
        }
        seen.push(std::mem::replace(&mut current, refined));
        pass += 1;
    }
}

struct Enricher<'a> {
    tree: &'a SyntaxTree,
    ctx: &'a RebuildContext,
    fields: Vec<EditableField>,
}

impl<'a> Enricher<'a> {
    fn new(tree: &'a SyntaxTree, ctx: &'a RebuildContext) -> Self {
        Self {
            tree,
            ctx,
            fields: Vec::new(),
        }
    }

    fn run(mut self, ty: &TypeField, node: Option<SyntaxNodeId>) -> EditableTree {
        let root = self.build(ty, node, node, None);
        EditableTree::from_parts(self.fields, root)
    }

    /// `value` is the syntax bound to the field itself; `expr` is the
    /// expression that produces its value.
    fn build(
        &mut self,
        ty: &TypeField,
        value: Option<SyntaxNodeId>,
        expr: Option<SyntaxNodeId>,
        parent: Option<FieldId>,
    ) -> FieldId {
        let next = expr.map(|e| innermost_expression_body(self.tree, e));
        let enriched = match expr {
            Some(expr) => self.refine(ty, expr),
            None => ty.clone(),
        };
        let id = FieldId(self.fields.len());
        self.fields.push(EditableField {
            ty: enriched,
            original_type: ty.clone(),
            value,
            parent,
            children: Vec::new(),
            elements: Vec::new(),
        });

        let shape = self.fields[id.0].shape().clone();
        match &shape.kind {
            TypeKind::Record { fields } => {
                for field in fields {
                    let (value, expr) = self.member_binding(next, field);
                    let child = self.build(field, value, expr, Some(id));
                    self.fields[id.0].children.push(child);
                }
                if shape.original_type_name.as_deref() == Some(ANYDATA_TYPE_NAME) {
                    self.add_undeclared_fields(id, fields, next);
                }
            }
            TypeKind::Map { constraint } => {
                self.add_map_entries(id, constraint.as_deref(), next);
            }
            TypeKind::Array { member } => {
                let member = member
                    .as_deref()
                    .cloned()
                    .unwrap_or_else(|| TypeField::primitive(PrimitiveKind::Anydata));
                self.add_elements(id, &member, next);
            }
            _ => {}
        }
        id
    }

    /// Narrow `ty` with what the bound expression shows.
    fn refine(&self, ty: &TypeField, expr: SyntaxNodeId) -> TypeField {
        let next = innermost_expression_body(self.tree, expr);
        match &ty.kind {
            TypeKind::Reference => match self.ctx.types.resolve_reference(ty) {
                Some(definition) => {
                    let expanded = keep_field_identity(definition.clone(), ty);
                    self.refine(&expanded, expr)
                }
                None => ty.clone(),
            },
            TypeKind::Primitive(PrimitiveKind::Anydata | PrimitiveKind::Any)
                if is_literal_shape(self.tree.kind(next)) =>
            {
                keep_field_identity(infer_type(self.tree, self.ctx, next), ty)
            }
            TypeKind::Union {
                members,
                resolution,
            } if optional_record_field(ty).is_none() => {
                let resolution = match resolve_union_member(self.tree, self.ctx, ty, expr) {
                    Some(member) => UnionResolution::Resolved(Box::new(self.refine(&member, expr))),
                    None => match resolution {
                        UnionResolution::Resolved(previous) => {
                            UnionResolution::Resolved(previous.clone())
                        }
                        _ => {
                            warn!(ty = %ty, "union needs an explicit cast");
                            UnionResolution::Unresolved
                        }
                    },
                };
                let mut resolved = ty.clone();
                resolved.kind = TypeKind::Union {
                    members: members.clone(),
                    resolution,
                };
                resolved
            }
            _ => ty.clone(),
        }
    }

    /// Specific field and value expression bound to a record member.
    fn member_binding(
        &self,
        next: Option<SyntaxNodeId>,
        field: &TypeField,
    ) -> (Option<SyntaxNodeId>, Option<SyntaxNodeId>) {
        let (Some(next), Some(name)) = (next, field.name.as_deref()) else {
            return (None, None);
        };
        match self.tree.kind(next) {
            SyntaxKind::MappingConstructor { .. } => {
                match find_specific_field(self.tree, next, name) {
                    Some(specific) => (Some(specific), specific_value(self.tree, specific)),
                    None => (None, None),
                }
            }
            _ => (None, None),
        }
    }

    /// Fields of an inferred record that the constructor gained since the
    /// shape was inferred.
    fn add_undeclared_fields(
        &mut self,
        id: FieldId,
        declared: &[TypeField],
        next: Option<SyntaxNodeId>,
    ) {
        let Some(next) = next else { return };
        let tree = self.tree;
        let SyntaxKind::MappingConstructor { fields, .. } = tree.kind(next) else {
            return;
        };
        for &specific in fields {
            let SyntaxKind::SpecificField { name, value, .. } = tree.kind(specific) else {
                continue;
            };
            let name = normalize_field_name(&name.text).to_string();
            if declared.iter().any(|d| d.name.as_deref() == Some(name.as_str())) {
                continue;
            }
            let value = *value;
            let ty = match value {
                Some(value) => infer_type(self.tree, self.ctx, value),
                None => TypeField::primitive(PrimitiveKind::Anydata),
            }
            .named(name);
            let child = self.build(&ty, Some(specific), value, Some(id));
            self.fields[id.0].children.push(child);
        }
    }

    fn add_map_entries(
        &mut self,
        id: FieldId,
        constraint: Option<&TypeField>,
        next: Option<SyntaxNodeId>,
    ) {
        let Some(next) = next else { return };
        let tree = self.tree;
        let SyntaxKind::MappingConstructor { fields, .. } = tree.kind(next) else {
            return;
        };
        for &specific in fields {
            let SyntaxKind::SpecificField { name, value, .. } = tree.kind(specific) else {
                continue;
            };
            let name = normalize_field_name(&name.text).to_string();
            let value = *value;
            let ty = match (constraint, value) {
                (Some(constraint), _) => constraint.clone(),
                (None, Some(value)) => infer_type(self.tree, self.ctx, value),
                (None, None) => TypeField::primitive(PrimitiveKind::Anydata),
            }
            .named(name);
            let child = self.build(&ty, Some(specific), value, Some(id));
            self.fields[id.0].children.push(child);
        }
    }

    fn add_elements(&mut self, id: FieldId, member: &TypeField, next: Option<SyntaxNodeId>) {
        let Some(next) = next else { return };
        let tree = self.tree;
        let element_nodes: Vec<SyntaxNodeId> = match tree.kind(next) {
            SyntaxKind::ListConstructor { elements, .. } => elements.clone(),
            // Every row of a query shares the shape of its select expression.
            SyntaxKind::QueryExpression { result, .. } => match tree.kind(*result) {
                SyntaxKind::SelectClause { expression } => vec![*expression],
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        for element in element_nodes {
            let child = self.build(member, Some(element), Some(element), Some(id));
            self.fields[id.0].elements.push(ArrayElement {
                member: child,
                element_node: Some(element),
            });
        }

        if member.is_union() && optional_record_field(member).is_none() {
            let per_element: Vec<Option<TypeField>> = self.fields[id.0]
                .elements
                .iter()
                .map(|e| self.fields[e.member.0].ty.resolved_member().cloned())
                .collect();
            if let TypeKind::Array { member: Some(member) } = &mut self.fields[id.0].ty.kind {
                if let TypeKind::Union { resolution, .. } = &mut member.kind {
                    *resolution = UnionResolution::PerElement(per_element);
                }
            }
        }
    }
}

fn specific_value(tree: &SyntaxTree, specific: SyntaxNodeId) -> Option<SyntaxNodeId> {
    match tree.kind(specific) {
        SyntaxKind::SpecificField { value, .. } => *value,
        _ => None,
    }
}

fn is_literal_shape(kind: &SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::MappingConstructor { .. }
            | SyntaxKind::ListConstructor { .. }
            | SyntaxKind::QueryExpression { .. }
            | SyntaxKind::Literal(_)
    )
}

/// Carry the name and optionality of the field over to a type found for it.
fn keep_field_identity(mut ty: TypeField, field: &TypeField) -> TypeField {
    ty.name = field.name.clone();
    ty.optional = field.optional;
    ty
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamapper_syntax::parse;
    use datamapper_syntax::query::{find_function, function_body_expression};
    use datamapper_types::TypeInfo;

    fn person() -> TypeField {
        TypeField::record([
            TypeField::primitive(PrimitiveKind::String).named("name"),
            TypeField::primitive(PrimitiveKind::Int).named("age"),
        ])
        .with_type_info(TypeInfo::local("Person"))
    }

    fn enrich_body(source: &str, ty: &TypeField) -> (SyntaxTree, EditableTree) {
        let tree = parse(source).unwrap();
        let function = find_function(&tree, "f").unwrap();
        let body = function_body_expression(&tree, function).unwrap();
        let enriched = enrich(&tree, &RebuildContext::default(), ty, Some(body), 8).unwrap();
        (tree, enriched)
    }

    #[test]
    fn test_record_members_bound_by_name() {
        let (tree, enriched) =
            enrich_body("function f(P p) returns Person => {age: p.age};", &person());
        let root = enriched.field(enriched.root());
        assert_eq!(root.children.len(), 2);
        let name = enriched.field(root.children[0]);
        assert_eq!(name.value, None);
        let age = enriched.field(root.children[1]);
        let specific = age.value.unwrap();
        assert_eq!(tree.text(specific), "age: p.age");
    }

    #[test]
    fn test_array_elements_paired_by_position() {
        let ty = TypeField::array(person());
        let (tree, enriched) = enrich_body(
            "function f() returns Person[] => [{name: \"a\"}, {name: \"b\", age: 2}];",
            &ty,
        );
        let root = enriched.field(enriched.root());
        assert_eq!(root.elements.len(), 2);
        let second = enriched.field(root.elements[1].member);
        let age = enriched.field(second.children[1]);
        assert_eq!(tree.text(age.value.unwrap()), "age: 2");
        assert_eq!(enriched.element_index(root.elements[1].member), Some(1));
    }

    #[test]
    fn test_query_is_single_element() {
        let ty = TypeField::array(person());
        let (tree, enriched) = enrich_body(
            "function f(P[] ps) returns Person[] => from var p in ps select {name: p.n};",
            &ty,
        );
        let root = enriched.field(enriched.root());
        assert_eq!(root.elements.len(), 1);
        let element = root.elements[0].element_node.unwrap();
        assert_eq!(tree.text(element), "{name: p.n}");
    }

    #[test]
    fn test_anydata_takes_literal_shape() {
        let ty = TypeField::record([TypeField::primitive(PrimitiveKind::Anydata).named("meta")]);
        let (_, enriched) = enrich_body(
            "function f() returns R => {meta: {version: 1, tags: [\"a\"]}};",
            &ty,
        );
        let root = enriched.field(enriched.root());
        let meta = enriched.field(root.children[0]);
        assert!(meta.ty.is_record());
        assert_eq!(meta.ty.name.as_deref(), Some("meta"));
        assert_eq!(meta.children.len(), 2);
    }

    #[test]
    fn test_missing_node_leaves_values_empty() {
        let tree = parse("function f() returns int => 1;").unwrap();
        let enriched = enrich(&tree, &RebuildContext::default(), &person(), None, 8).unwrap();
        assert!(enriched.iter().all(|(_, f)| f.value.is_none()));
    }

    #[test]
    fn test_enrichment_is_idempotent() {
        let ty = TypeField::record([
            TypeField::primitive(PrimitiveKind::Anydata).named("meta"),
            TypeField::union([
                TypeField::primitive(PrimitiveKind::Int),
                TypeField::primitive(PrimitiveKind::String),
            ])
            .named("code"),
        ]);
        let source = "function f() returns R => {meta: {a: [1]}, code: \"x\"};";
        let (tree, first) = enrich_body(source, &ty);
        let function = find_function(&tree, "f").unwrap();
        let body = function_body_expression(&tree, function).unwrap();
        let refined = first.refined_type();
        let second = enrich(&tree, &RebuildContext::default(), &refined, Some(body), 8).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_convergence_is_reported() {
        let ty = TypeField::record([TypeField::primitive(PrimitiveKind::Anydata).named("meta")]);
        let tree = parse("function f() returns R => {meta: {a: 1}};").unwrap();
        let function = find_function(&tree, "f").unwrap();
        let body = function_body_expression(&tree, function).unwrap();
        let err = enrich(&tree, &RebuildContext::default(), &ty, Some(body), 1).unwrap_err();
        let EnrichError::NotConverged { passes, last } = err;
        assert_eq!(passes, 1);
        assert!(last.field(last.root()).children.len() == 1);
    }
}
