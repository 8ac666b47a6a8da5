//! Structural queries over type descriptors.

use crate::ty::{PrimitiveKind, TypeField, TypeKind};

/// Number of nested array levels: `int[][]` has dimension 2.
pub fn array_dim(mut ty: &TypeField) -> usize {
    let mut dim = 0;
    while let Some(member) = ty.array_member() {
        dim += 1;
        ty = member;
    }
    dim
}

/// Innermost non-array member of a (possibly nested) array type.
pub fn innermost_array_member(mut ty: &TypeField) -> &TypeField {
    while let Some(member) = ty.array_member() {
        ty = member;
    }
    ty
}

/// The record behind an optional record: either a record declared optional,
/// or a two member union of `()` and a record (or an intersection holding a
/// record). Such unions are a nillable record rather than a real choice.
pub fn optional_record_field(ty: &TypeField) -> Option<&TypeField> {
    match &ty.kind {
        TypeKind::Record { .. } if ty.optional => Some(ty),
        TypeKind::Union { members, .. } if members.len() == 2 => {
            let has_nil = members.iter().any(|m| m.is_primitive(PrimitiveKind::Nil));
            if !has_nil {
                return None;
            }
            members.iter().find_map(|m| match &m.kind {
                TypeKind::Record { .. } => Some(m),
                TypeKind::Intersection { members } => members.iter().find(|i| i.is_record()),
                _ => None,
            })
        }
        _ => None,
    }
}

/// The array behind a nillable array union (`T[]?`).
pub fn optional_array_field(ty: &TypeField) -> Option<&TypeField> {
    let members = ty.union_members()?;
    if members.len() != 2 || !members.iter().any(|m| m.is_primitive(PrimitiveKind::Nil)) {
        return None;
    }
    members.iter().find(|m| m.is_array())
}

/// Union members a value can actually be mapped to: `error` members are dropped.
pub fn filtered_union_output_types(ty: &TypeField) -> Vec<&TypeField> {
    ty.union_members()
        .map(|members| {
            members
                .iter()
                .filter(|m| !m.is_primitive(PrimitiveKind::Error))
                .collect()
        })
        .unwrap_or_default()
}

/// Find the union member whose type name matches `name`, as written in a
/// type cast. A module prefix in `name` is ignored.
pub fn find_member_by_type_name<'a>(ty: &'a TypeField, name: &str) -> Option<&'a TypeField> {
    let name = name.trim();
    let local = name.rsplit_once(':').map(|(_, n)| n).unwrap_or(name);
    ty.union_members()?
        .iter()
        .find(|m| m.type_name() == name || m.type_name() == local)
}

/// Whether two descriptors describe the same kind of value, ignoring
/// field names, optionality and inference markers.
pub fn is_same_kind(a: &TypeField, b: &TypeField) -> bool {
    if let (Some(a), Some(b)) = (&a.type_info, &b.type_info) {
        return a.name == b.name && a.module == b.module;
    }
    match (&a.kind, &b.kind) {
        (TypeKind::Primitive(x), TypeKind::Primitive(y)) => x == y,
        (TypeKind::Record { fields: x }, TypeKind::Record { fields: y }) => {
            x.len() == y.len()
                && x.iter()
                    .all(|f| y.iter().any(|g| g.name == f.name && is_same_kind(f, g)))
        }
        (TypeKind::Array { member: x }, TypeKind::Array { member: y }) => match (x, y) {
            (Some(x), Some(y)) => is_same_kind(x, y),
            _ => true,
        },
        (TypeKind::Map { .. }, TypeKind::Map { .. }) => true,
        (TypeKind::Union { members: x, .. }, TypeKind::Union { members: y, .. }) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| is_same_kind(x, y))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::TypeInfo;

    fn address() -> TypeField {
        TypeField::record([TypeField::primitive(PrimitiveKind::String).named("city")])
            .with_type_info(TypeInfo::local("Address"))
    }

    #[test]
    fn test_array_dim() {
        let ty = TypeField::array(TypeField::array(TypeField::primitive(PrimitiveKind::Int)));
        assert_eq!(array_dim(&ty), 2);
        assert!(innermost_array_member(&ty).is_primitive(PrimitiveKind::Int));
    }

    #[test]
    fn test_optional_record_from_nillable_union() {
        let ty = TypeField::union([address(), TypeField::primitive(PrimitiveKind::Nil)]);
        let record = optional_record_field(&ty).unwrap();
        assert_eq!(record.type_name(), "Address");
    }

    #[test]
    fn test_optional_record_rejects_real_choice() {
        let ty = TypeField::union([address(), TypeField::primitive(PrimitiveKind::String)]);
        assert!(optional_record_field(&ty).is_none());
    }

    #[test]
    fn test_filtered_union_drops_error() {
        let ty = TypeField::union([
            address(),
            TypeField::primitive(PrimitiveKind::Error),
        ]);
        let members = filtered_union_output_types(&ty);
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn test_find_member_by_qualified_name() {
        let ty = TypeField::union([address(), TypeField::primitive(PrimitiveKind::Int)]);
        assert!(find_member_by_type_name(&ty, "types:Address").is_some());
        assert!(find_member_by_type_name(&ty, "int").is_some());
        assert!(find_member_by_type_name(&ty, "string").is_none());
    }

    #[test]
    fn test_same_kind_by_identity() {
        let renamed = address().named("home");
        assert!(is_same_kind(&address(), &renamed));
        assert!(!is_same_kind(&address(), &TypeField::record([])));
    }
}
