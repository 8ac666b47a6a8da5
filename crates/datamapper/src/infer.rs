//! Shape inference from literal syntax.
//!
//! Used where the declared type says nothing useful (`anydata`, `any`) but
//! the bound expression is a literal whose structure shows the shape.

use datamapper_syntax::query::{innermost_expression_body, normalize_field_name};
use datamapper_syntax::{LiteralKind, SyntaxKind, SyntaxNodeId, SyntaxTree};
use datamapper_types::shape::is_same_kind;
use datamapper_types::{ANYDATA_TYPE_NAME, PrimitiveKind, TypeField};

use crate::context::RebuildContext;

/// Build a type from the structure of `node`. Every produced descriptor is
/// marked as inferred through [`TypeField::original_type_name`].
pub fn infer_type(tree: &SyntaxTree, ctx: &RebuildContext, node: SyntaxNodeId) -> TypeField {
    let node = innermost_expression_body(tree, node);
    let ty = match tree.kind(node) {
        SyntaxKind::MappingConstructor { fields, .. } => {
            TypeField::record(fields.iter().filter_map(|f| match tree.kind(*f) {
                SyntaxKind::SpecificField { name, value, .. } => {
                    let name = normalize_field_name(&name.text).to_string();
                    let ty = match value {
                        Some(value) => infer_type(tree, ctx, *value),
                        None => anydata(),
                    };
                    Some(ty.named(name))
                }
                _ => None,
            }))
        }
        SyntaxKind::ListConstructor { elements, .. } => {
            let members: Vec<_> = elements.iter().map(|e| infer_type(tree, ctx, *e)).collect();
            match members.split_first() {
                Some((first, rest)) if rest.iter().all(|m| is_same_kind(first, m)) => {
                    TypeField::array(first.clone())
                }
                _ => TypeField::array(anydata()),
            }
        }
        SyntaxKind::QueryExpression { result, .. } => match tree.kind(*result) {
            SyntaxKind::SelectClause { expression } => {
                TypeField::array(infer_type(tree, ctx, *expression))
            }
            _ => TypeField::array(anydata()),
        },
        SyntaxKind::Literal(kind) => TypeField::primitive(match kind {
            LiteralKind::String => PrimitiveKind::String,
            LiteralKind::Int => PrimitiveKind::Int,
            LiteralKind::Float => PrimitiveKind::Float,
            LiteralKind::Boolean => PrimitiveKind::Boolean,
            LiteralKind::Nil => PrimitiveKind::Nil,
        }),
        _ => match ctx.type_of(tree, node) {
            Some(known) => {
                let mut known = known.clone();
                known.name = None;
                known
            }
            None => anydata(),
        },
    };
    ty.with_original_type_name(ANYDATA_TYPE_NAME)
}

fn anydata() -> TypeField {
    TypeField::primitive(PrimitiveKind::Anydata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamapper_syntax::parse;
    use datamapper_syntax::query::{find_function, function_body_expression};

    fn infer(source: &str) -> TypeField {
        let tree = parse(source).unwrap();
        let function = find_function(&tree, "f").unwrap();
        let body = function_body_expression(&tree, function).unwrap();
        infer_type(&tree, &RebuildContext::default(), body)
    }

    #[test]
    fn test_infer_record_from_mapping() {
        let ty = infer(
            "function f() returns anydata => {name: \"a\", tags: [1, 2], meta: {ok: true}};",
        );
        assert!(ty.is_record());
        assert_eq!(ty.original_type_name.as_deref(), Some("anydata"));
        assert!(ty.field("name").is_some_and(|f| f.is_primitive(PrimitiveKind::String)));
        let tags = ty.field("tags").unwrap();
        assert!(tags.array_member().is_some_and(|m| m.is_primitive(PrimitiveKind::Int)));
        let meta = ty.field("meta").unwrap();
        assert!(meta.field("ok").is_some_and(|f| f.is_primitive(PrimitiveKind::Boolean)));
    }

    #[test]
    fn test_mixed_list_falls_back_to_anydata_member() {
        let ty = infer("function f() returns anydata => [1, \"x\"];");
        assert!(ty.array_member().is_some_and(TypeField::is_anydata));
    }

    #[test]
    fn test_unknown_expression_is_anydata() {
        let ty = infer("function f(anydata x) returns anydata => x;");
        assert!(ty.is_anydata());
    }
}
