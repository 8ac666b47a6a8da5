//! Type descriptors.

use serde::Serialize;
use std::fmt;

/// A static type description of a value, optionally attached to a field.
///
/// A `TypeField` is never mutated in place while a graph is being built.
/// Enrichment produces a new descriptor whenever inference refines one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeField {
    /// Field name when this type is a record field, or the binding name for roots.
    pub name: Option<String>,
    pub kind: TypeKind,
    /// Whether the field was declared optional (`int age?;`).
    pub optional: bool,
    /// Identity of a named type, used for display and import resolution.
    pub type_info: Option<TypeInfo>,
    /// Set to `"anydata"` when the shape was inferred rather than declared.
    pub original_type_name: Option<String>,
}

/// Identity of a named type declared in some module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInfo {
    pub org: String,
    pub module: String,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum TypeKind {
    /// Record with ordered fields.
    Record { fields: Vec<TypeField> },

    /// Homogeneous array. The member is absent when nothing is known about it.
    Array { member: Option<Box<TypeField>> },

    /// Union of members in declaration order.
    Union {
        members: Vec<TypeField>,
        resolution: UnionResolution,
    },

    /// Map with an optional constraint type.
    Map { constraint: Option<Box<TypeField>> },

    /// Intersection such as `Person & readonly`.
    Intersection { members: Vec<TypeField> },

    Primitive(PrimitiveKind),

    /// Reference to a named type that is not expanded here, usually because
    /// the type refers to itself. Resolved through [`TypeField::type_info`].
    Reference,
}

/// How a union has been narrowed to a concrete member.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", content = "member", rename_all = "camelCase")]
pub enum UnionResolution {
    #[default]
    Unresolved,
    /// A single member chosen for the bound expression.
    Resolved(Box<TypeField>),
    /// Array member unions are resolved per list element.
    PerElement(Vec<Option<TypeField>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveKind {
    String,
    Int,
    Float,
    Decimal,
    Boolean,
    Byte,
    Nil,
    Json,
    Xml,
    Anydata,
    Any,
    Error,
}

impl PrimitiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Decimal => "decimal",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Nil => "()",
            PrimitiveKind::Json => "json",
            PrimitiveKind::Xml => "xml",
            PrimitiveKind::Anydata => "anydata",
            PrimitiveKind::Any => "any",
            PrimitiveKind::Error => "error",
        }
    }

    /// Parse a builtin type keyword.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "string" => PrimitiveKind::String,
            "int" => PrimitiveKind::Int,
            "float" => PrimitiveKind::Float,
            "decimal" => PrimitiveKind::Decimal,
            "boolean" => PrimitiveKind::Boolean,
            "byte" => PrimitiveKind::Byte,
            "()" | "null" => PrimitiveKind::Nil,
            "json" => PrimitiveKind::Json,
            "xml" => PrimitiveKind::Xml,
            "anydata" => PrimitiveKind::Anydata,
            "any" => PrimitiveKind::Any,
            "error" => PrimitiveKind::Error,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl TypeField {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            name: None,
            kind,
            optional: false,
            type_info: None,
            original_type_name: None,
        }
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(TypeKind::Primitive(kind))
    }

    pub fn record(fields: impl IntoIterator<Item = TypeField>) -> Self {
        Self::new(TypeKind::Record {
            fields: fields.into_iter().collect(),
        })
    }

    pub fn array(member: TypeField) -> Self {
        Self::new(TypeKind::Array {
            member: Some(Box::new(member)),
        })
    }

    pub fn union(members: impl IntoIterator<Item = TypeField>) -> Self {
        Self::new(TypeKind::Union {
            members: members.into_iter().collect(),
            resolution: UnionResolution::Unresolved,
        })
    }

    pub fn map(constraint: Option<TypeField>) -> Self {
        Self::new(TypeKind::Map {
            constraint: constraint.map(Box::new),
        })
    }

    /// A reference to a named type, expanded later through a type store.
    pub fn reference(info: TypeInfo) -> Self {
        Self::new(TypeKind::Reference).with_type_info(info)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_type_info(mut self, info: TypeInfo) -> Self {
        self.type_info = Some(info);
        self
    }

    pub fn with_original_type_name(mut self, name: impl Into<String>) -> Self {
        self.original_type_name = Some(name.into());
        self
    }
}

impl TypeInfo {
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            org: String::new(),
            module: String::new(),
            name: name.into(),
            version: String::new(),
        }
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl TypeField {
    pub fn is_record(&self) -> bool {
        matches!(self.kind, TypeKind::Record { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array { .. })
    }

    pub fn is_union(&self) -> bool {
        matches!(self.kind, TypeKind::Union { .. })
    }

    pub fn is_primitive(&self, kind: PrimitiveKind) -> bool {
        matches!(self.kind, TypeKind::Primitive(k) if k == kind)
    }

    pub fn is_json(&self) -> bool {
        self.is_primitive(PrimitiveKind::Json)
    }

    /// `anydata` and `any` accept every value and are refined from literals.
    pub fn is_anydata(&self) -> bool {
        self.is_primitive(PrimitiveKind::Anydata) || self.is_primitive(PrimitiveKind::Any)
    }

    pub fn record_fields(&self) -> Option<&[TypeField]> {
        match &self.kind {
            TypeKind::Record { fields } => Some(fields),
            _ => None,
        }
    }

    pub fn array_member(&self) -> Option<&TypeField> {
        match &self.kind {
            TypeKind::Array { member } => member.as_deref(),
            _ => None,
        }
    }

    pub fn union_members(&self) -> Option<&[TypeField]> {
        match &self.kind {
            TypeKind::Union { members, .. } => Some(members),
            _ => None,
        }
    }

    /// The member a union was narrowed to, if it is resolved to a single member.
    pub fn resolved_member(&self) -> Option<&TypeField> {
        match &self.kind {
            TypeKind::Union {
                resolution: UnionResolution::Resolved(member),
                ..
            } => Some(member),
            _ => None,
        }
    }

    /// Find a record field by its declared name.
    pub fn field(&self, name: &str) -> Option<&TypeField> {
        self.record_fields()?
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
    }

    /// Type name used for labels: the declared type name when known,
    /// otherwise the structural kind.
    pub fn type_name(&self) -> String {
        if let Some(info) = &self.type_info {
            return info.name.clone();
        }
        match &self.kind {
            TypeKind::Record { .. } => "record".to_string(),
            TypeKind::Array { member } => match member {
                Some(member) => format!("{}[]", member.type_name()),
                None => "anydata[]".to_string(),
            },
            TypeKind::Union { members, .. } => members
                .iter()
                .map(TypeField::type_name)
                .collect::<Vec<_>>()
                .join("|"),
            TypeKind::Map { constraint } => match constraint {
                Some(c) => format!("map<{}>", c.type_name()),
                None => "map".to_string(),
            },
            TypeKind::Intersection { members } => members
                .iter()
                .map(TypeField::type_name)
                .collect::<Vec<_>>()
                .join("&"),
            TypeKind::Primitive(kind) => kind.as_str().to_string(),
            TypeKind::Reference => "record".to_string(),
        }
    }

    /// Type name qualified with the import alias of a foreign module, as
    /// written in source: `alias:Name`.
    pub fn display_name(&self, import_alias: Option<&str>) -> String {
        match (&self.type_info, import_alias) {
            (Some(info), Some(alias)) if !info.module.is_empty() => {
                format!("{alias}:{}", info.name)
            }
            _ => self.type_name(),
        }
    }
}

impl fmt::Display for TypeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}
