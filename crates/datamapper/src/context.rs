//! Per-rebuild context.
//!
//! Types and function definitions are fetched from the [`LanguageService`]
//! once, in a single batch, before enrichment starts. Every later stage
//! reads them from the stores held by a [`RebuildContext`]; nothing is
//! shared between rebuilds.

use ahash::AHashMap;
use datamapper_syntax::{LinePosition, NodePosition, SyntaxKind, SyntaxNodeId, SyntaxTree};
use datamapper_types::{TypeField, TypeInfo, TypeKind};
use serde::Serialize;
use tracing::debug;

/// Where a called function is defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FnDefInfo {
    pub name: String,
    pub position: NodePosition,
    pub file_uri: String,
}

/// Static knowledge about the document, answered by the host language
/// server in production and by [`crate::LocalTypeService`] offline.
pub trait LanguageService {
    /// Types of the expressions (or declarations) at the given positions.
    /// The result is aligned with `positions`; unknown types are `None`.
    fn types_for_expressions(&self, positions: &[NodePosition]) -> Vec<Option<TypeField>>;

    /// Definition of the function whose name starts at `position`.
    fn function_definition(&self, position: LinePosition) -> Option<FnDefInfo>;
}

/// Position-keyed static types of one document revision.
#[derive(Debug, Clone, Default)]
pub struct TypeStore {
    by_position: AHashMap<NodePosition, TypeField>,
    by_info: AHashMap<TypeInfo, TypeField>,
}

impl TypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, position: NodePosition, ty: TypeField) {
        self.index_named_types(&ty);
        self.by_position.insert(position, ty);
    }

    pub fn get(&self, position: &NodePosition) -> Option<&TypeField> {
        self.by_position.get(position)
    }

    /// Expand a [`TypeKind::Reference`] into the named type it points to.
    pub fn resolve_reference(&self, ty: &TypeField) -> Option<&TypeField> {
        match (&ty.kind, &ty.type_info) {
            (TypeKind::Reference, Some(info)) => self.by_info.get(info),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.by_position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_position.is_empty()
    }

    fn index_named_types(&mut self, ty: &TypeField) {
        if let (Some(info), false) = (&ty.type_info, matches!(ty.kind, TypeKind::Reference)) {
            if !self.by_info.contains_key(info) {
                let mut definition = ty.clone();
                definition.name = None;
                definition.optional = false;
                self.by_info.insert(info.clone(), definition);
            }
        }
        match &ty.kind {
            TypeKind::Record { fields } => fields.iter().for_each(|f| self.index_named_types(f)),
            TypeKind::Union { members, .. } | TypeKind::Intersection { members } => {
                members.iter().for_each(|m| self.index_named_types(m))
            }
            TypeKind::Array { member: Some(inner) } | TypeKind::Map { constraint: Some(inner) } => {
                self.index_named_types(inner)
            }
            _ => {}
        }
    }
}

/// Function definitions keyed by the position of the call's name.
#[derive(Debug, Clone, Default)]
pub struct FunctionDefinitionStore {
    by_position: AHashMap<LinePosition, FnDefInfo>,
}

impl FunctionDefinitionStore {
    pub fn insert(&mut self, position: LinePosition, info: FnDefInfo) {
        self.by_position.insert(position, info);
    }

    pub fn get(&self, position: &LinePosition) -> Option<&FnDefInfo> {
        self.by_position.get(position)
    }
}

/// Everything a single rebuild knows about the document besides its syntax.
#[derive(Debug, Clone, Default)]
pub struct RebuildContext {
    pub types: TypeStore,
    pub functions: FunctionDefinitionStore,
}

impl RebuildContext {
    /// Fetch the types the data mapper may ask about while mapping `function`:
    /// its parameters, return type, every expression and binding of its
    /// body, and all module-level variables.
    pub fn load(tree: &SyntaxTree, function: SyntaxNodeId, service: &dyn LanguageService) -> Self {
        let mut positions = Vec::new();
        let mut calls = Vec::new();
        for id in tree.descendants(function) {
            match tree.kind(id) {
                SyntaxKind::FunctionCall { name, .. } => {
                    calls.push(tree.token_position(name).start());
                    positions.push(tree.position(id));
                }
                kind if is_typed_node(tree, id, kind) => positions.push(tree.position(id)),
                _ => {}
            }
        }
        for id in tree.descendants(tree.root()) {
            if matches!(tree.kind(id), SyntaxKind::ModuleVarDecl { .. }) {
                positions.push(tree.position(id));
            }
        }

        let mut context = RebuildContext::default();
        let types = service.types_for_expressions(&positions);
        for (position, ty) in positions.into_iter().zip(types) {
            if let Some(ty) = ty {
                context.types.insert(position, ty);
            }
        }
        for position in calls {
            if let Some(info) = service.function_definition(position) {
                context.functions.insert(position, info);
            }
        }
        debug!(
            types = context.types.len(),
            functions = context.functions.by_position.len(),
            "loaded rebuild context"
        );
        context
    }

    pub fn type_of(&self, tree: &SyntaxTree, id: SyntaxNodeId) -> Option<&TypeField> {
        self.types.get(&tree.position(id))
    }
}

fn is_typed_node(tree: &SyntaxTree, id: SyntaxNodeId, kind: &SyntaxKind) -> bool {
    match kind {
        SyntaxKind::RequiredParam { .. }
        | SyntaxKind::LetVarDecl { .. }
        | SyntaxKind::CaptureBindingPattern { .. }
        | SyntaxKind::MappingBindingPattern { .. }
        | SyntaxKind::ListBindingPattern { .. } => true,
        // Only the declared return type; parameter types are asked through the parameter.
        SyntaxKind::TypeDescriptor(_) => matches!(
            tree.parent(id).map(|p| tree.kind(p)),
            Some(SyntaxKind::FunctionDefinition { return_type: Some(ret), .. }) if *ret == id
        ),
        kind => kind.is_expression(),
    }
}
