//! A language service backed by the declarations of a single parsed file.
//!
//! Answers the questions the data mapper asks of a language server well
//! enough for offline use: declared types of parameters and variables,
//! named type definitions, binding patterns of queries and `let`s, field
//! access chains, literals, and the contextually expected type of
//! constructors.

use datamapper_syntax::query::{
    find_by_position, find_function, normalize_field_name, relative_path_of_field,
};
use datamapper_syntax::{
    BinaryOp, LinePosition, LiteralKind, NodePosition, SyntaxKind, SyntaxNodeId, SyntaxTree,
    TypeDescKind,
};
use datamapper_types::shape::optional_record_field;
use datamapper_types::{PrimitiveKind, TypeField, TypeInfo, TypeKind};

use crate::context::{FnDefInfo, LanguageService};

pub struct LocalTypeService<'t> {
    tree: &'t SyntaxTree,
    file_uri: String,
}

impl<'t> LocalTypeService<'t> {
    pub fn new(tree: &'t SyntaxTree) -> Self {
        Self {
            tree,
            file_uri: "file:///main.bal".to_string(),
        }
    }

    pub fn with_file_uri(mut self, uri: impl Into<String>) -> Self {
        self.file_uri = uri.into();
        self
    }

    /// Type of the node that starts and ends at `position`.
    pub fn type_at(&self, position: &NodePosition) -> Option<TypeField> {
        let id = find_by_position(self.tree, position)?;
        self.type_of_node(id)
    }

    fn type_of_node(&self, id: SyntaxNodeId) -> Option<TypeField> {
        match self.tree.kind(id) {
            SyntaxKind::RequiredParam { ty, name } => {
                Some(self.descriptor_type(*ty)?.named(name.text.clone()))
            }
            SyntaxKind::ModuleVarDecl { ty, name, init } => {
                let declared = self.descriptor_type(*ty);
                let ty = declared.or_else(|| init.and_then(|i| self.expression_type(i)))?;
                Some(ty.named(name.text.clone()))
            }
            SyntaxKind::LetVarDecl { pattern, .. } => self.pattern_type(*pattern),
            SyntaxKind::CaptureBindingPattern { .. }
            | SyntaxKind::MappingBindingPattern { .. }
            | SyntaxKind::ListBindingPattern { .. } => self.pattern_type(id),
            SyntaxKind::TypeDescriptor(_) => self.descriptor_type(id),
            kind if kind.is_expression() => self.expression_type(id),
            _ => None,
        }
    }

    // ========================================================================
    // Type descriptors
    // ========================================================================

    fn descriptor_type(&self, id: SyntaxNodeId) -> Option<TypeField> {
        self.descriptor_type_guarded(id, &mut Vec::new())
    }

    fn descriptor_type_guarded(
        &self,
        id: SyntaxNodeId,
        visiting: &mut Vec<String>,
    ) -> Option<TypeField> {
        let SyntaxKind::TypeDescriptor(desc) = self.tree.kind(id) else {
            return None;
        };
        let ty = match desc {
            TypeDescKind::Builtin(name) => TypeField::primitive(PrimitiveKind::from_name(name)?),
            TypeDescKind::Named { module, name } => {
                return self.named_type(module.as_deref(), name, visiting);
            }
            TypeDescKind::Var => return None,
            TypeDescKind::Array(inner) => TypeField::array(
                self.descriptor_type_guarded(*inner, visiting)
                    .unwrap_or_else(|| TypeField::primitive(PrimitiveKind::Anydata)),
            ),
            TypeDescKind::Optional(inner) => TypeField::union([
                self.descriptor_type_guarded(*inner, visiting)?,
                TypeField::primitive(PrimitiveKind::Nil),
            ]),
            TypeDescKind::Union(members) => TypeField::union(
                members
                    .iter()
                    .filter_map(|m| self.descriptor_type_guarded(*m, visiting)),
            ),
            TypeDescKind::Intersection(members) => {
                // `readonly` has no shape of its own.
                let mut members: Vec<_> = members
                    .iter()
                    .filter_map(|m| self.descriptor_type_guarded(*m, visiting))
                    .collect();
                if members.len() == 1 {
                    return members.pop();
                }
                TypeField::new(TypeKind::Intersection { members })
            }
            TypeDescKind::Map(constraint) => {
                TypeField::map(constraint.and_then(|c| self.descriptor_type_guarded(c, visiting)))
            }
            TypeDescKind::Record { fields, .. } => TypeField::record(fields.iter().filter_map(|f| {
                let SyntaxKind::RecordFieldDesc { ty, name, optional } = self.tree.kind(*f) else {
                    return None;
                };
                let field = self.descriptor_type_guarded(*ty, visiting)?;
                Some(field.named(name.text.clone()).with_optional(*optional))
            })),
        };
        Some(ty)
    }

    fn named_type(
        &self,
        module: Option<&str>,
        name: &str,
        visiting: &mut Vec<String>,
    ) -> Option<TypeField> {
        if let Some(module) = module {
            let mut info = TypeInfo::local(name);
            info.module = module.to_string();
            return Some(TypeField::reference(info));
        }
        if visiting.iter().any(|v| v == name) {
            return Some(TypeField::reference(TypeInfo::local(name)));
        }
        let root = self.tree.root();
        let SyntaxKind::SourceFile { members, .. } = self.tree.kind(root) else {
            return None;
        };
        for member in members {
            match self.tree.kind(*member) {
                SyntaxKind::TypeDefinition { name: n, descriptor } if n.text == name => {
                    visiting.push(name.to_string());
                    let ty = self.descriptor_type_guarded(*descriptor, visiting);
                    visiting.pop();
                    return ty.map(|t| t.with_type_info(TypeInfo::local(name)));
                }
                SyntaxKind::EnumDeclaration { name: n, .. } if n.text == name => {
                    return Some(
                        TypeField::primitive(PrimitiveKind::String)
                            .with_type_info(TypeInfo::local(name)),
                    );
                }
                _ => {}
            }
        }
        None
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression_type(&self, id: SyntaxNodeId) -> Option<TypeField> {
        let tree = self.tree;
        match tree.kind(id) {
            SyntaxKind::SimpleNameReference { name } => self.binding_type(&name.text, id),
            SyntaxKind::FieldAccess {
                expression, field, ..
            } => {
                let base = self.expression_type(*expression)?;
                field_of(&base, normalize_field_name(&field.text)).cloned()
            }
            SyntaxKind::Literal(kind) => Some(TypeField::primitive(match kind {
                LiteralKind::String => PrimitiveKind::String,
                LiteralKind::Int => PrimitiveKind::Int,
                LiteralKind::Float => PrimitiveKind::Float,
                LiteralKind::Boolean => PrimitiveKind::Boolean,
                LiteralKind::Nil => PrimitiveKind::Nil,
            })),
            SyntaxKind::TypeCast { ty, .. } => self.descriptor_type(*ty),
            SyntaxKind::BracedExpression { expression } => self.expression_type(*expression),
            SyntaxKind::LetExpression { body, .. } => self.expression_type(*body),
            SyntaxKind::BinaryExpression { lhs, op, .. } => match op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                    self.expression_type(*lhs).map(unnamed)
                }
                _ => Some(TypeField::primitive(PrimitiveKind::Boolean)),
            },
            SyntaxKind::UnaryExpression {
                operator,
                expression,
            } => match operator.text.as_str() {
                "!" => Some(TypeField::primitive(PrimitiveKind::Boolean)),
                _ => self.expression_type(*expression),
            },
            SyntaxKind::ConditionalExpression { then_expr, .. } => self.expression_type(*then_expr),
            SyntaxKind::ElvisExpression { rhs, .. } => self.expression_type(*rhs),
            SyntaxKind::FunctionCall {
                module: None, name, ..
            } => {
                let function = find_function(tree, &name.text)?;
                let SyntaxKind::FunctionDefinition { return_type, .. } = tree.kind(function) else {
                    return None;
                };
                self.descriptor_type((*return_type)?)
            }
            SyntaxKind::MethodCall { name, .. } => match name.text.as_str() {
                "toString" => Some(TypeField::primitive(PrimitiveKind::String)),
                "length" => Some(TypeField::primitive(PrimitiveKind::Int)),
                _ => None,
            },
            SyntaxKind::IndexedExpression { container, .. } => {
                let container = self.expression_type(*container)?;
                container.array_member().cloned()
            }
            SyntaxKind::QueryExpression { result, .. } => {
                let selected = match tree.kind(*result) {
                    SyntaxKind::SelectClause { expression } => self.expression_type(*expression),
                    _ => None,
                };
                match selected {
                    Some(member) => Some(TypeField::array(unnamed(member))),
                    None => self.expected_type(id),
                }
            }
            SyntaxKind::MappingConstructor { .. }
            | SyntaxKind::ListConstructor { .. }
            | SyntaxKind::Missing => self.expected_type(id),
            _ => None,
        }
    }

    /// Type the surrounding syntax expects at `id`.
    fn expected_type(&self, id: SyntaxNodeId) -> Option<TypeField> {
        let tree = self.tree;
        let parent = tree.parent(id)?;
        match tree.kind(parent) {
            SyntaxKind::ExpressionFunctionBody { .. } => {
                let function = tree.parent(parent)?;
                let SyntaxKind::FunctionDefinition { return_type, .. } = tree.kind(function) else {
                    return None;
                };
                self.descriptor_type((*return_type)?)
            }
            SyntaxKind::SpecificField { name, .. } => {
                let mapping = tree.parent(parent)?;
                let expected = self.expected_type(mapping)?;
                let name = normalize_field_name(&name.text);
                match &expected.kind {
                    TypeKind::Map { constraint } => constraint.as_deref().cloned(),
                    TypeKind::Union { members, .. } => {
                        members.iter().find_map(|m| field_of(m, name)).cloned()
                    }
                    _ => field_of(&expected, name).cloned(),
                }
            }
            SyntaxKind::ListConstructor { .. } => {
                let expected = self.expected_type(parent)?;
                array_member_of(&expected).cloned()
            }
            SyntaxKind::SelectClause { .. } => {
                let query = tree.parent(parent)?;
                let expected = self.expected_type(query)?;
                array_member_of(&expected).cloned()
            }
            SyntaxKind::TypeCast { ty, .. } => self.descriptor_type(*ty),
            SyntaxKind::BracedExpression { .. } | SyntaxKind::LetExpression { .. } => {
                self.expected_type(parent)
            }
            SyntaxKind::ModuleVarDecl { ty, .. } | SyntaxKind::LetVarDecl { ty, .. } => {
                self.descriptor_type(*ty)
            }
            _ => None,
        }
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    /// Type of the variable `name` visible at `at`.
    fn binding_type(&self, name: &str, at: SyntaxNodeId) -> Option<TypeField> {
        let tree = self.tree;
        for ancestor in tree.ancestors(at) {
            let found = match tree.kind(ancestor) {
                SyntaxKind::LetExpression { declarations, .. } => {
                    self.declared_binding(declarations, name)
                }
                SyntaxKind::QueryExpression { from, clauses, .. } => std::iter::once(from)
                    .chain(clauses)
                    .find_map(|clause| match tree.kind(*clause) {
                        SyntaxKind::FromClause { pattern, .. }
                        | SyntaxKind::JoinClause { pattern, .. } => {
                            self.pattern_variable_type(*pattern, name)
                        }
                        SyntaxKind::LetClause { declarations } => {
                            self.declared_binding(declarations, name)
                        }
                        _ => None,
                    }),
                SyntaxKind::FunctionDefinition { params, .. } => params.iter().find_map(|p| {
                    matches!(
                        tree.kind(*p),
                        SyntaxKind::RequiredParam { name: n, .. } if n.text == name
                    )
                        .then(|| self.type_of_node(*p))
                        .flatten()
                }),
                _ => None,
            };
            if found.is_some() {
                return found;
            }
        }

        let SyntaxKind::SourceFile { members, .. } = tree.kind(tree.root()) else {
            return None;
        };
        members.iter().find_map(|m| match tree.kind(*m) {
            SyntaxKind::ModuleVarDecl { name: n, .. } if n.text == name => self.type_of_node(*m),
            SyntaxKind::EnumDeclaration { name: enum_name, members } => {
                members.iter().any(|member| member.text == name).then(|| {
                    TypeField::primitive(PrimitiveKind::String)
                        .with_type_info(TypeInfo::local(enum_name.text.clone()))
                        .named(name)
                })
            }
            _ => None,
        })
    }

    fn declared_binding(&self, declarations: &[SyntaxNodeId], name: &str) -> Option<TypeField> {
        declarations.iter().find_map(|decl| match self.tree.kind(*decl) {
            SyntaxKind::LetVarDecl { pattern, .. } => self.pattern_variable_type(*pattern, name),
            _ => None,
        })
    }

    /// Type of the variable `name` bound somewhere inside `pattern`.
    fn pattern_variable_type(&self, pattern: SyntaxNodeId, name: &str) -> Option<TypeField> {
        let path = relative_path_of_field(self.tree, pattern, name)?;
        let mut ty = self.pattern_type(pattern)?;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            ty = match segment.parse::<usize>() {
                Ok(_) => array_member_of(&ty)?.clone(),
                Err(_) => field_of(&ty, segment)?.clone(),
            };
        }
        Some(ty.named(name))
    }

    /// Type of the whole value a binding pattern destructures.
    fn pattern_type(&self, pattern: SyntaxNodeId) -> Option<TypeField> {
        let tree = self.tree;
        let parent = tree.parent(pattern)?;
        let ty = match tree.kind(parent) {
            SyntaxKind::FromClause { ty, expression, .. }
            | SyntaxKind::JoinClause { ty, expression, .. } => match self.descriptor_type(*ty) {
                Some(declared) => declared,
                None => {
                    let collection = self.expression_type(*expression)?;
                    array_member_of(&collection)
                        .or_else(|| match &collection.kind {
                            TypeKind::Map { constraint } => constraint.as_deref(),
                            _ => None,
                        })?
                        .clone()
                }
            },
            SyntaxKind::LetVarDecl { ty, init, .. } => self
                .descriptor_type(*ty)
                .or_else(|| self.expression_type(*init))?,
            SyntaxKind::FieldBindingPattern { name, .. } => {
                let outer = self.pattern_type(tree.parent(parent)?)?;
                field_of(&outer, &name.text)?.clone()
            }
            SyntaxKind::ListBindingPattern { .. } => {
                array_member_of(&self.pattern_type(parent)?)?.clone()
            }
            _ => return None,
        };
        match tree.kind(pattern) {
            SyntaxKind::CaptureBindingPattern { name } => Some(ty.named(name.text.clone())),
            _ => Some(unnamed(ty)),
        }
    }
}

impl LanguageService for LocalTypeService<'_> {
    fn types_for_expressions(&self, positions: &[NodePosition]) -> Vec<Option<TypeField>> {
        positions.iter().map(|p| self.type_at(p)).collect()
    }

    fn function_definition(&self, position: LinePosition) -> Option<FnDefInfo> {
        let tree = self.tree;
        let call = tree.descendants(tree.root()).into_iter().find(|&id| {
            matches!(tree.kind(id), SyntaxKind::FunctionCall { module: None, name, .. }
                if tree.token_position(name).start() == position)
        })?;
        let SyntaxKind::FunctionCall { name, .. } = tree.kind(call) else {
            return None;
        };
        let function = find_function(tree, &name.text)?;
        Some(FnDefInfo {
            name: name.text.clone(),
            position: tree.position(function),
            file_uri: self.file_uri.clone(),
        })
    }
}

/// Record field lookup that sees through optional records and intersections.
fn field_of<'a>(ty: &'a TypeField, name: &str) -> Option<&'a TypeField> {
    if let Some(field) = ty.field(name) {
        return Some(field);
    }
    if let Some(record) = optional_record_field(ty) {
        return record.field(name);
    }
    match &ty.kind {
        TypeKind::Intersection { members } => members.iter().find_map(|m| m.field(name)),
        _ => None,
    }
}

fn array_member_of(ty: &TypeField) -> Option<&TypeField> {
    ty.array_member().or_else(|| {
        ty.union_members()?
            .iter()
            .find_map(TypeField::array_member)
    })
}

fn unnamed(mut ty: TypeField) -> TypeField {
    ty.name = None;
    ty.optional = false;
    ty
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamapper_syntax::parse;

    const SOURCE: &str = r#"
type Address record {
    string city;
    string zip?;
};

type Person record {
    string name;
    int age;
    Address? address;
};

type Node record {
    int value;
    Node? next;
};

enum Color { RED, GREEN }

string prefix = "p-";

function f(Person person, Person[] people, Node head) returns string[] =>
    from var {name, address: {city}} in people
    let int n = person.age
    select city + name + prefix;
"#;

    fn type_of(tree: &SyntaxTree, text: &str) -> Option<TypeField> {
        let service = LocalTypeService::new(tree);
        let id = tree
            .descendants(tree.root())
            .into_iter()
            .find(|&id| tree.text(id) == text && tree.kind(id).is_expression())
            .unwrap();
        service.type_at(&tree.position(id))
    }

    #[test]
    fn test_param_and_field_access_types() {
        let tree = parse(SOURCE).unwrap();
        let age = type_of(&tree, "person.age").unwrap();
        assert!(age.is_primitive(PrimitiveKind::Int));

        let service = LocalTypeService::new(&tree);
        let param = tree
            .descendants(tree.root())
            .into_iter()
            .find(|&id| matches!(tree.kind(id), SyntaxKind::RequiredParam { .. }))
            .unwrap();
        let person = service.type_at(&tree.position(param)).unwrap();
        assert_eq!(person.name.as_deref(), Some("person"));
        assert_eq!(person.type_name(), "Person");
        let address = person.field("address").unwrap();
        assert!(optional_record_field(address).is_some());
    }

    #[test]
    fn test_destructured_binding_type() {
        let tree = parse(SOURCE).unwrap();
        let city = type_of(&tree, "city").unwrap();
        assert!(city.is_primitive(PrimitiveKind::String));
        assert_eq!(city.name.as_deref(), Some("city"));
    }

    #[test]
    fn test_module_variable_and_select_type() {
        let tree = parse(SOURCE).unwrap();
        let prefix = type_of(&tree, "prefix").unwrap();
        assert!(prefix.is_primitive(PrimitiveKind::String));

        let query = tree
            .descendants(tree.root())
            .into_iter()
            .find(|&id| tree.kind(id).is_query())
            .unwrap();
        let service = LocalTypeService::new(&tree);
        let ty = service.type_at(&tree.position(query)).unwrap();
        assert!(ty.array_member().is_some_and(|m| m.is_primitive(PrimitiveKind::String)));
    }

    #[test]
    fn test_recursive_type_becomes_reference() {
        let tree = parse(SOURCE).unwrap();
        let service = LocalTypeService::new(&tree);
        let head = tree
            .descendants(tree.root())
            .into_iter()
            .find(|&id| {
                matches!(
                    tree.kind(id),
                    SyntaxKind::RequiredParam { name, .. } if name.text == "head"
                )
            })
            .unwrap();
        let ty = service.type_at(&tree.position(head)).unwrap();
        let next = ty.field("next").unwrap();
        let members = next.union_members().unwrap();
        assert!(matches!(members[0].kind, TypeKind::Reference));
        assert_eq!(members[0].type_name(), "Node");
    }

    #[test]
    fn test_expected_type_of_constructor() {
        let source = "type R record { string id; json data; };\n\
                      function f() returns R => {id: \"1\", data: {}};";
        let tree = parse(source).unwrap();
        let ty = type_of(&tree, "{id: \"1\", data: {}}").unwrap();
        assert_eq!(ty.type_name(), "R");
        let data = type_of(&tree, "{}").unwrap();
        assert!(data.is_json());
    }

    #[test]
    fn test_function_definition_lookup() {
        let source = "function g(int x) returns int => x;\nfunction f(int y) returns int => g(y);";
        let tree = parse(source).unwrap();
        let service = LocalTypeService::new(&tree);
        let call = tree
            .descendants(tree.root())
            .into_iter()
            .find(|&id| matches!(tree.kind(id), SyntaxKind::FunctionCall { .. }))
            .unwrap();
        let SyntaxKind::FunctionCall { name, .. } = tree.kind(call) else {
            unreachable!()
        };
        let info = service
            .function_definition(tree.token_position(name).start())
            .unwrap();
        assert_eq!(info.name, "g");
        assert_eq!(info.position.start_line, 0);
    }
}
