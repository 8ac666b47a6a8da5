//! Picking the member of a union type a bound expression produces.

use datamapper_syntax::query::{innermost_expression_body, normalize_field_name, unwrap_let};
use datamapper_syntax::{LiteralKind, SyntaxKind, SyntaxNodeId, SyntaxTree};
use datamapper_types::shape::{filtered_union_output_types, find_member_by_type_name, is_same_kind};
use datamapper_types::{PrimitiveKind, TypeField, TypeKind};
use tracing::debug;

use crate::context::RebuildContext;

/// Resolve the member of `union` that `node` evaluates to.
///
/// In order: the type named by an explicit cast, the only member compatible
/// with the statically known type of the expression, the only member left
/// after dropping `error`, the member structurally matching the
/// expression's syntax, and finally an `anydata`/`any` member. `None`
/// means the expression needs an explicit cast.
pub fn resolve_union_member(
    tree: &SyntaxTree,
    ctx: &RebuildContext,
    union: &TypeField,
    node: SyntaxNodeId,
) -> Option<TypeField> {
    let members = filtered_union_output_types(union);
    if members.is_empty() {
        return None;
    }

    let outer = unwrap_let(tree, node);
    if let SyntaxKind::TypeCast { ty, .. } = tree.kind(outer) {
        if let Some(member) = find_member_by_type_name(union, tree.text(*ty)) {
            return Some(member.clone());
        }
    }

    if let Some(known) = ctx.type_of(tree, outer) {
        let mut compatible = members.iter().filter(|m| is_same_kind(m, known));
        if let (Some(member), None) = (compatible.next(), compatible.next()) {
            return Some((*member).clone());
        }
    }

    if let [member] = members.as_slice() {
        return Some((*member).clone());
    }

    let inner = innermost_expression_body(tree, node);
    if let Some(member) = structural_match(tree, &members, inner) {
        return Some(member.clone());
    }

    let fallback = members.iter().find(|m| m.is_anydata()).map(|m| (*m).clone());
    if fallback.is_none() {
        debug!(union = %union, "union member could not be resolved");
    }
    fallback
}

fn structural_match<'a>(
    tree: &SyntaxTree,
    members: &[&'a TypeField],
    node: SyntaxNodeId,
) -> Option<&'a TypeField> {
    match tree.kind(node) {
        SyntaxKind::MappingConstructor { fields, .. } => {
            let names: Vec<&str> = fields
                .iter()
                .filter_map(|f| match tree.kind(*f) {
                    SyntaxKind::SpecificField { name, .. } => {
                        Some(normalize_field_name(&name.text))
                    }
                    _ => None,
                })
                .collect();
            let records: Vec<&TypeField> = members
                .iter()
                .copied()
                .filter(|m| {
                    matches!(
                        m.kind,
                        TypeKind::Record { .. }
                            | TypeKind::Map { .. }
                            | TypeKind::Intersection { .. }
                    )
                })
                .collect();
            if let [record] = records.as_slice() {
                return Some(*record);
            }
            // Only a single best, non-zero overlap of field names decides.
            let scores: Vec<usize> = records
                .iter()
                .map(|record| names.iter().filter(|n| has_field(record, n)).count())
                .collect();
            let best = scores.iter().copied().max().filter(|&s| s > 0)?;
            let mut winners = records.iter().zip(&scores).filter(|(_, s)| **s == best);
            match (winners.next(), winners.next()) {
                (Some((record, _)), None) => Some(*record),
                _ => None,
            }
        }
        SyntaxKind::ListConstructor { .. } | SyntaxKind::QueryExpression { .. } => {
            members.iter().copied().find(|m| m.is_array())
        }
        SyntaxKind::Literal(kind) => {
            let wanted: &[PrimitiveKind] = match kind {
                LiteralKind::String => &[PrimitiveKind::String],
                LiteralKind::Int => &[
                    PrimitiveKind::Int,
                    PrimitiveKind::Byte,
                    PrimitiveKind::Float,
                    PrimitiveKind::Decimal,
                ],
                LiteralKind::Float => &[PrimitiveKind::Float, PrimitiveKind::Decimal],
                LiteralKind::Boolean => &[PrimitiveKind::Boolean],
                LiteralKind::Nil => &[PrimitiveKind::Nil],
            };
            wanted
                .iter()
                .find_map(|k| members.iter().copied().find(|m| m.is_primitive(*k)))
        }
        _ => None,
    }
}

fn has_field(ty: &TypeField, name: &str) -> bool {
    match &ty.kind {
        TypeKind::Record { .. } => ty.field(name).is_some(),
        TypeKind::Intersection { members } => members.iter().any(|m| m.field(name).is_some()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamapper_syntax::parse;
    use datamapper_syntax::query::{find_function, function_body_expression};
    use datamapper_types::TypeInfo;

    fn pet() -> TypeField {
        let cat = TypeField::record([
            TypeField::primitive(PrimitiveKind::String).named("name"),
            TypeField::primitive(PrimitiveKind::Boolean).named("indoor"),
        ])
        .with_type_info(TypeInfo::local("Cat"));
        let dog = TypeField::record([
            TypeField::primitive(PrimitiveKind::String).named("name"),
            TypeField::primitive(PrimitiveKind::String).named("breed"),
        ])
        .with_type_info(TypeInfo::local("Dog"));
        TypeField::union([cat, dog])
    }

    fn resolve(source: &str, union: &TypeField) -> Option<TypeField> {
        let tree = parse(source).unwrap();
        let function = find_function(&tree, "f").unwrap();
        let body = function_body_expression(&tree, function).unwrap();
        resolve_union_member(&tree, &RebuildContext::default(), union, body)
    }

    #[test]
    fn test_resolve_by_cast() {
        let member = resolve("function f(anydata x) returns Pet => <Dog>x;", &pet()).unwrap();
        assert_eq!(member.type_name(), "Dog");
    }

    #[test]
    fn test_resolve_by_field_names() {
        let member = resolve(
            "function f() returns Pet => {name: \"rex\", breed: \"lab\"};",
            &pet(),
        )
        .unwrap();
        assert_eq!(member.type_name(), "Dog");
    }

    #[test]
    fn test_resolve_literal_and_single_member() {
        let union = TypeField::union([
            TypeField::primitive(PrimitiveKind::Int),
            TypeField::primitive(PrimitiveKind::String),
        ]);
        let member = resolve("function f() returns int|string => \"a\";", &union).unwrap();
        assert!(member.is_primitive(PrimitiveKind::String));

        let with_error = TypeField::union([
            TypeField::primitive(PrimitiveKind::Int),
            TypeField::primitive(PrimitiveKind::Error),
        ]);
        let member = resolve("function f(int x) returns int|error => x;", &with_error).unwrap();
        assert!(member.is_primitive(PrimitiveKind::Int));
    }

    #[test]
    fn test_unresolvable_union() {
        let member = resolve("function f(anydata x) returns Pet => x;", &pet());
        assert!(member.is_none());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let source = "function f() returns Pet => {name: \"tom\", indoor: true};";
        let first = resolve(source, &pet());
        let second = resolve(source, &pet());
        assert_eq!(first, second);
        assert_eq!(first.unwrap().type_name(), "Cat");
    }

    #[test]
    fn test_tied_field_names_stay_unresolved() {
        let member = resolve("function f() returns Pet => {name: \"tom\"};", &pet());
        assert!(member.is_none());
    }

    #[test]
    fn test_no_shared_field_names_stay_unresolved() {
        assert!(resolve("function f() returns Pet => {};", &pet()).is_none());
        assert!(resolve("function f() returns Pet => {color: \"red\"};", &pet()).is_none());
    }

    #[test]
    fn test_single_record_member_needs_no_overlap() {
        let union = TypeField::union([
            TypeField::record([TypeField::primitive(PrimitiveKind::String).named("name")])
                .with_type_info(TypeInfo::local("Cat")),
            TypeField::primitive(PrimitiveKind::String),
        ]);
        let member = resolve("function f() returns Cat|string => {};", &union).unwrap();
        assert_eq!(member.type_name(), "Cat");
    }
}
