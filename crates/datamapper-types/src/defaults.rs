//! Canonical default literals.
//!
//! When a mapping cannot be removed without leaving an illegal construct,
//! its value is replaced by the default literal of the target type instead.

use crate::ty::{PrimitiveKind, TypeField, TypeKind};

/// The literal source text that stands for "no value" of the given type.
pub fn default_value(field: &TypeField) -> &'static str {
    match &field.kind {
        TypeKind::Primitive(kind) => match kind {
            PrimitiveKind::String => "\"\"",
            PrimitiveKind::Int
            | PrimitiveKind::Float
            | PrimitiveKind::Decimal
            | PrimitiveKind::Byte => "0",
            PrimitiveKind::Boolean => "true",
            PrimitiveKind::Xml => "xml ``",
            PrimitiveKind::Json => "{}",
            PrimitiveKind::Nil | PrimitiveKind::Anydata | PrimitiveKind::Any => "()",
            PrimitiveKind::Error => "\"\"",
        },
        TypeKind::Array { .. } => "[]",
        TypeKind::Record { .. } | TypeKind::Map { .. } | TypeKind::Reference => "{}",
        TypeKind::Union { .. } => "()",
        TypeKind::Intersection { members } => {
            if members.iter().any(TypeField::is_record) {
                "{}"
            } else {
                "()"
            }
        }
    }
}

/// Whether `source` is exactly the default literal of `field`.
pub fn is_default_value(field: &TypeField, source: &str) -> bool {
    default_value(field) == source.trim()
}
