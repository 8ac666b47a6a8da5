//! Field name search.
//!
//! Filters are applied to types before any port is built, so a filtered
//! field never gets a port at all.

use datamapper_types::shape::optional_record_field;
use datamapper_types::{TypeField, TypeKind};

/// Case-insensitive substring match. An empty query matches everything.
pub fn matches_search(name: &str, query: &str) -> bool {
    query.is_empty() || name.to_lowercase().contains(&query.to_lowercase())
}

/// Filter an input root. A root whose own name matches is kept whole;
/// otherwise only matching fields and their ancestors survive. `None`
/// means nothing matched.
pub fn filter_input_type(root_name: &str, ty: &TypeField, query: &str) -> Option<TypeField> {
    if matches_search(root_name, query) {
        return Some(ty.clone());
    }
    filter_members(ty, query)
}

/// Filter an output type before it is enriched.
pub fn filter_output_type(ty: &TypeField, query: &str) -> Option<TypeField> {
    if query.is_empty() {
        return Some(ty.clone());
    }
    filter_members(ty, query)
}

/// Keep members whose name matches, or which keep something themselves.
fn filter_members(ty: &TypeField, query: &str) -> Option<TypeField> {
    match &ty.kind {
        TypeKind::Record { fields } => {
            let kept: Vec<TypeField> = fields
                .iter()
                .filter_map(|f| filter_field(f, query))
                .collect();
            if kept.is_empty() {
                return None;
            }
            let mut filtered = ty.clone();
            filtered.kind = TypeKind::Record { fields: kept };
            Some(filtered)
        }
        TypeKind::Array { member: Some(member) } => {
            let member = filter_members(member, query)?;
            let mut filtered = ty.clone();
            filtered.kind = TypeKind::Array {
                member: Some(Box::new(member)),
            };
            Some(filtered)
        }
        TypeKind::Union { members, resolution } if optional_record_field(ty).is_some() => {
            let kept: Vec<TypeField> = members
                .iter()
                .map(|m| match m.kind {
                    TypeKind::Record { .. } => filter_members(m, query),
                    _ => Some(m.clone()),
                })
                .collect::<Option<_>>()?;
            let mut filtered = ty.clone();
            filtered.kind = TypeKind::Union {
                members: kept,
                resolution: resolution.clone(),
            };
            Some(filtered)
        }
        _ => None,
    }
}

fn filter_field(field: &TypeField, query: &str) -> Option<TypeField> {
    let name = field.name.as_deref().unwrap_or_default();
    if matches_search(name, query) {
        return Some(field.clone());
    }
    filter_members(field, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamapper_types::PrimitiveKind;

    fn person() -> TypeField {
        TypeField::record([
            TypeField::primitive(PrimitiveKind::String).named("name"),
            TypeField::record([
                TypeField::primitive(PrimitiveKind::String).named("city"),
                TypeField::primitive(PrimitiveKind::String).named("zip"),
            ])
            .named("address"),
        ])
    }

    #[test]
    fn test_case_insensitive_match() {
        assert!(matches_search("FirstName", "name"));
        assert!(matches_search("anything", ""));
        assert!(!matches_search("age", "name"));
    }

    #[test]
    fn test_keeps_matching_descendants_only() {
        let filtered = filter_input_type("person", &person(), "CITY").unwrap();
        assert!(filtered.field("name").is_none());
        let address = filtered.field("address").unwrap();
        assert!(address.field("city").is_some());
        assert!(address.field("zip").is_none());
    }

    #[test]
    fn test_matching_root_is_kept_whole() {
        let filtered = filter_input_type("person", &person(), "pers").unwrap();
        assert_eq!(filtered, person());
    }

    #[test]
    fn test_no_match() {
        assert!(filter_input_type("person", &person(), "email").is_none());
        assert!(filter_output_type(&person(), "email").is_none());
    }

    #[test]
    fn test_matching_record_field_keeps_its_members() {
        let filtered = filter_output_type(&person(), "addr").unwrap();
        let address = filtered.field("address").unwrap();
        assert_eq!(address.record_fields().map(<[TypeField]>::len), Some(2));
    }
}
