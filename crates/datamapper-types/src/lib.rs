//! Type model for the data mapper.
//!
//! A [`TypeField`] describes the static shape of a value the way the host
//! language service reports it: records, arrays, unions, maps and
//! primitives, plus the identity and optionality metadata needed to render
//! and address the shape as ports.

pub mod defaults;
pub mod names;
pub mod shape;
pub mod ty;

pub use defaults::{default_value, is_default_value};
pub use names::{MISSING_NODE_PREFIX, escape_field_name, is_missing_name, unescape_field_name};
pub use ty::{PrimitiveKind, TypeField, TypeInfo, TypeKind, UnionResolution};

/// Marker stored in [`TypeField::original_type_name`] for shapes inferred
/// from literal syntax instead of declared.
pub const ANYDATA_TYPE_NAME: &str = "anydata";
