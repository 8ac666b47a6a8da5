//! Enriched output fields.
//!
//! An [`EditableTree`] mirrors an output type with the expressions that are
//! currently bound to each of its fields. Fields live in an arena and point
//! at their parent by [`FieldId`].

use datamapper_syntax::SyntaxNodeId;
use datamapper_types::shape::optional_record_field;
use datamapper_types::{TypeField, TypeKind, UnionResolution};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FieldId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableField {
    /// Type after enrichment: inferred shapes filled in, unions resolved.
    pub ty: TypeField,
    /// Type this pass started from.
    pub original_type: TypeField,
    /// Bound syntax: the specific field of a record member, the element
    /// expression of an array member, or the whole expression of a root.
    pub value: Option<SyntaxNodeId>,
    pub parent: Option<FieldId>,
    /// Record members in declaration order.
    pub children: Vec<FieldId>,
    /// Array members in element order.
    pub elements: Vec<ArrayElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayElement {
    pub member: FieldId,
    pub element_node: Option<SyntaxNodeId>,
}

impl EditableField {
    pub fn name(&self) -> Option<&str> {
        self.ty.name.as_deref()
    }

    /// The shape whose members this field's children and elements follow:
    /// the resolved member of a union or the record of an optional record.
    pub fn shape(&self) -> &TypeField {
        if let Some(member) = self.ty.resolved_member() {
            return member;
        }
        if let Some(record) = optional_record_field(&self.ty) {
            return record;
        }
        match &self.ty.kind {
            TypeKind::Intersection { members } => {
                members.iter().find(|m| m.is_record()).unwrap_or(&self.ty)
            }
            _ => &self.ty,
        }
    }

    /// A union no member of which could be picked for the bound value.
    pub fn requires_cast(&self) -> bool {
        self.ty.is_union()
            && self.ty.resolved_member().is_none()
            && optional_record_field(&self.ty).is_none()
            && self.value.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditableTree {
    fields: Vec<EditableField>,
    root: FieldId,
}

impl EditableTree {
    pub(crate) fn from_parts(fields: Vec<EditableField>, root: FieldId) -> Self {
        Self { fields, root }
    }

    pub fn root(&self) -> FieldId {
        self.root
    }

    pub fn field(&self, id: FieldId) -> &EditableField {
        &self.fields[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &EditableField)> {
        self.fields.iter().enumerate().map(|(i, f)| (FieldId(i), f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn ancestors(&self, id: FieldId) -> impl Iterator<Item = FieldId> + '_ {
        std::iter::successors(self.field(id).parent, |&p| self.field(p).parent)
    }

    /// Members of a field: record children followed by array elements.
    pub fn members(&self, id: FieldId) -> impl Iterator<Item = FieldId> + '_ {
        let field = self.field(id);
        field
            .children
            .iter()
            .copied()
            .chain(field.elements.iter().map(|e| e.member))
    }

    /// The member of `id` bound to the syntax node `value`, if any.
    pub fn member_bound_to(&self, id: FieldId, value: SyntaxNodeId) -> Option<FieldId> {
        let field = self.field(id);
        field
            .children
            .iter()
            .copied()
            .find(|c| self.field(*c).value == Some(value))
            .or_else(|| {
                field
                    .elements
                    .iter()
                    .find(|e| e.element_node == Some(value))
                    .map(|e| e.member)
            })
    }

    /// Position of `id` among its parent's array elements.
    pub fn element_index(&self, id: FieldId) -> Option<usize> {
        let parent = self.field(self.field(id).parent?);
        parent.elements.iter().position(|e| e.member == id)
    }

    /// Reassemble a type from the enriched fields: every member carries its
    /// enriched type, and resolved unions keep their member list.
    pub fn refined_type(&self) -> TypeField {
        self.refined_type_of(self.root)
    }

    fn refined_type_of(&self, id: FieldId) -> TypeField {
        let field = self.field(id);
        let mut ty = field.ty.clone();
        if !field.children.is_empty() {
            if let Some(fields) = shape_fields_mut(&mut ty) {
                *fields = field
                    .children
                    .iter()
                    .map(|c| self.refined_type_of(*c))
                    .collect();
            }
        }
        ty
    }
}

/// Mutable record fields of the shape [`EditableField::shape`] would pick.
fn shape_fields_mut(ty: &mut TypeField) -> Option<&mut Vec<TypeField>> {
    let is_optional_record = optional_record_field(ty).is_some() && ty.is_union();
    match &mut ty.kind {
        TypeKind::Record { fields } => Some(fields),
        TypeKind::Union {
            resolution: UnionResolution::Resolved(member),
            ..
        } => shape_fields_mut(member),
        TypeKind::Union { members, .. } if is_optional_record => members
            .iter_mut()
            .find(|m| m.is_record() || matches!(m.kind, TypeKind::Intersection { .. }))
            .and_then(shape_fields_mut),
        TypeKind::Intersection { members } => members
            .iter_mut()
            .find(|m| m.is_record())
            .and_then(shape_fields_mut),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamapper_types::{PrimitiveKind, TypeInfo};

    fn leaf(ty: TypeField, parent: Option<FieldId>) -> EditableField {
        EditableField {
            original_type: ty.clone(),
            ty,
            value: None,
            parent,
            children: Vec::new(),
            elements: Vec::new(),
        }
    }

    #[test]
    fn test_shape_of_optional_record() {
        let address = TypeField::record([TypeField::primitive(PrimitiveKind::String).named("city")])
            .with_type_info(TypeInfo::local("Address"));
        let ty = TypeField::union([address, TypeField::primitive(PrimitiveKind::Nil)]);
        let field = leaf(ty, None);
        assert_eq!(field.shape().type_name(), "Address");
        assert!(!field.requires_cast());
    }

    #[test]
    fn test_shape_of_resolved_union() {
        let cat = TypeField::record([]).with_type_info(TypeInfo::local("Cat"));
        let dog = TypeField::record([]).with_type_info(TypeInfo::local("Dog"));
        let mut ty = TypeField::union([cat, dog.clone()]);
        if let TypeKind::Union { resolution, .. } = &mut ty.kind {
            *resolution = UnionResolution::Resolved(Box::new(dog));
        }
        let field = leaf(ty, None);
        assert_eq!(field.shape().type_name(), "Dog");
    }

    #[test]
    fn test_ancestors_and_members() {
        let root = leaf(TypeField::record([]), None);
        let child = leaf(TypeField::primitive(PrimitiveKind::Int).named("a"), Some(FieldId(0)));
        let mut fields = vec![root, child];
        fields[0].children.push(FieldId(1));
        let tree = EditableTree::from_parts(fields, FieldId(0));
        assert_eq!(tree.ancestors(FieldId(1)).collect::<Vec<_>>(), vec![FieldId(0)]);
        assert_eq!(tree.members(FieldId(0)).collect::<Vec<_>>(), vec![FieldId(1)]);
        assert_eq!(tree.element_index(FieldId(1)), None);
    }
}
