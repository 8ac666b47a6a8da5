//! Read-only helpers over a [`SyntaxTree`].

use crate::kind::SyntaxKind;
use crate::position::NodePosition;
use crate::tree::{SyntaxNodeId, SyntaxTree};

/// Unwrap `let ... in body`, type casts and parentheses down to the
/// expression that actually produces the value.
pub fn innermost_expression_body(tree: &SyntaxTree, mut id: SyntaxNodeId) -> SyntaxNodeId {
    loop {
        id = match tree.kind(id) {
            SyntaxKind::LetExpression { body, .. } => *body,
            SyntaxKind::TypeCast { expression, .. } => *expression,
            SyntaxKind::BracedExpression { expression } => *expression,
            _ => return id,
        };
    }
}

/// Unwrap `let` expressions and parentheses but keep a type cast visible.
pub fn unwrap_let(tree: &SyntaxTree, mut id: SyntaxNodeId) -> SyntaxNodeId {
    loop {
        id = match tree.kind(id) {
            SyntaxKind::LetExpression { body, .. } => *body,
            SyntaxKind::BracedExpression { expression } => *expression,
            _ => return id,
        };
    }
}

/// Value expression of a specific field, or the node itself otherwise.
pub fn value_expression(tree: &SyntaxTree, id: SyntaxNodeId) -> Option<SyntaxNodeId> {
    match tree.kind(id) {
        SyntaxKind::SpecificField { value, .. } => *value,
        _ => Some(id),
    }
}

/// Find the specific field named `name` in a mapping constructor. Quoted
/// (`'type`) and plain spellings match each other.
pub fn find_specific_field(
    tree: &SyntaxTree,
    mapping: SyntaxNodeId,
    name: &str,
) -> Option<SyntaxNodeId> {
    let SyntaxKind::MappingConstructor { fields, .. } = tree.kind(mapping) else {
        return None;
    };
    let wanted = normalize_field_name(name);
    fields.iter().copied().find(|&f| {
        matches!(
            tree.kind(f),
            SyntaxKind::SpecificField { name, .. } if normalize_field_name(&name.text) == wanted
        )
    })
}

/// Field name as declared: quotes of escaped identifiers and string keys removed.
pub fn normalize_field_name(name: &str) -> &str {
    let name = name.strip_prefix('\'').unwrap_or(name);
    name.strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(name)
}

/// One segment of a field access chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSegment {
    pub name: String,
    pub optional: bool,
}

/// Names along a field access chain, root first: `a.b?.c` gives
/// `[a, b, c]`. Returns `None` unless the chain is rooted at a simple name.
pub fn field_names(tree: &SyntaxTree, id: SyntaxNodeId) -> Option<Vec<AccessSegment>> {
    let mut segments = Vec::new();
    let mut current = id;
    loop {
        match tree.kind(current) {
            SyntaxKind::FieldAccess {
                expression,
                field,
                optional,
            } => {
                segments.push(AccessSegment {
                    name: normalize_field_name(&field.text).to_string(),
                    optional: *optional,
                });
                current = *expression;
            }
            SyntaxKind::SimpleNameReference { name } => {
                segments.push(AccessSegment {
                    name: name.text.clone(),
                    optional: false,
                });
                segments.reverse();
                return Some(segments);
            }
            _ => return None,
        }
    }
}

/// References to inputs inside an expression: simple names and whole field
/// access chains rooted at a simple name, in source order.
///
/// Query expressions contribute only their `from`/`join` sources since the
/// rest of a query refers to its own bindings.
pub fn collect_input_references(tree: &SyntaxTree, id: SyntaxNodeId) -> Vec<SyntaxNodeId> {
    let mut out = Vec::new();
    collect_references_into(tree, id, &mut out);
    out
}

fn collect_references_into(tree: &SyntaxTree, id: SyntaxNodeId, out: &mut Vec<SyntaxNodeId>) {
    match tree.kind(id) {
        SyntaxKind::SimpleNameReference { .. } => out.push(id),
        SyntaxKind::FieldAccess { .. } if field_names(tree, id).is_some() => out.push(id),
        SyntaxKind::QueryExpression { from, clauses, .. } => {
            for clause in std::iter::once(from).chain(clauses) {
                match tree.kind(*clause) {
                    SyntaxKind::FromClause { expression, .. }
                    | SyntaxKind::JoinClause { expression, .. } => {
                        collect_references_into(tree, *expression, out)
                    }
                    _ => {}
                }
            }
        }
        SyntaxKind::TypeCast { expression, .. } => collect_references_into(tree, *expression, out),
        SyntaxKind::LetExpression { declarations, body } => {
            let mut bound = Vec::new();
            for decl in declarations {
                if let SyntaxKind::LetVarDecl { pattern, init, .. } = tree.kind(*decl) {
                    collect_references_into(tree, *init, out);
                    bound.extend(binding_names(tree, *pattern));
                }
            }
            let mut inner = Vec::new();
            collect_references_into(tree, *body, &mut inner);
            out.extend(inner.into_iter().filter(|r| {
                let root = field_names(tree, *r).and_then(|s| s.into_iter().next());
                !root.is_some_and(|r| bound.contains(&r.name))
            }));
        }
        _ => {
            for child in tree.children(id) {
                collect_references_into(tree, child, out);
            }
        }
    }
}

/// Variable names introduced by a binding pattern.
pub fn binding_names(tree: &SyntaxTree, pattern: SyntaxNodeId) -> Vec<String> {
    match tree.kind(pattern) {
        SyntaxKind::CaptureBindingPattern { name } => vec![name.text.clone()],
        SyntaxKind::MappingBindingPattern { fields } => fields
            .iter()
            .flat_map(|f| binding_names(tree, *f))
            .collect(),
        SyntaxKind::FieldBindingPattern { name, pattern } => match pattern {
            Some(inner) => binding_names(tree, *inner),
            None => vec![name.text.clone()],
        },
        SyntaxKind::ListBindingPattern { elements } => elements
            .iter()
            .flat_map(|e| binding_names(tree, *e))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn is_available_within_binding_pattern(
    tree: &SyntaxTree,
    pattern: SyntaxNodeId,
    name: &str,
) -> bool {
    binding_names(tree, pattern).iter().any(|n| n == name)
}

/// Dotted path from a destructuring pattern's root to the variable `name`:
/// in `{id, address: {city}}`, `city` is at `.address.city`. List patterns
/// contribute element indexes.
pub fn relative_path_of_field(
    tree: &SyntaxTree,
    pattern: SyntaxNodeId,
    name: &str,
) -> Option<String> {
    match tree.kind(pattern) {
        SyntaxKind::CaptureBindingPattern { name: captured } => {
            (captured.text == name).then(String::new)
        }
        SyntaxKind::MappingBindingPattern { fields } => fields.iter().find_map(|f| {
            let SyntaxKind::FieldBindingPattern {
                name: field,
                pattern,
            } = tree.kind(*f)
            else {
                return None;
            };
            match pattern {
                None => (field.text == name).then(|| format!(".{}", field.text)),
                Some(inner) => relative_path_of_field(tree, *inner, name)
                    .map(|rest| format!(".{}{rest}", field.text)),
            }
        }),
        SyntaxKind::ListBindingPattern { elements } => {
            elements.iter().enumerate().find_map(|(i, e)| {
                relative_path_of_field(tree, *e, name).map(|rest| format!(".{i}{rest}"))
            })
        }
        _ => None,
    }
}

/// Outermost node whose position equals `position`.
pub fn find_by_position(tree: &SyntaxTree, position: &NodePosition) -> Option<SyntaxNodeId> {
    tree.descendants(tree.root())
        .into_iter()
        .find(|&id| tree.position(id) == *position)
}

/// The function definition named `name`.
pub fn find_function(tree: &SyntaxTree, name: &str) -> Option<SyntaxNodeId> {
    let SyntaxKind::SourceFile { members, .. } = tree.kind(tree.root()) else {
        return None;
    };
    members.iter().copied().find(|&m| {
        matches!(
            tree.kind(m),
            SyntaxKind::FunctionDefinition { name: n, .. } if n.text == name
        )
    })
}

/// Expression of an expression-bodied function.
pub fn function_body_expression(tree: &SyntaxTree, function: SyntaxNodeId) -> Option<SyntaxNodeId> {
    let SyntaxKind::FunctionDefinition { body, .. } = tree.kind(function) else {
        return None;
    };
    match tree.kind(*body) {
        SyntaxKind::ExpressionFunctionBody { expression } => Some(*expression),
        _ => None,
    }
}

/// Module-level declarations of the given kind, in source order.
pub fn module_members<'t>(
    tree: &'t SyntaxTree,
    pred: impl Fn(&SyntaxKind) -> bool + 't,
) -> impl Iterator<Item = SyntaxNodeId> + 't {
    let members = match tree.kind(tree.root()) {
        SyntaxKind::SourceFile { imports, members } => {
            imports.iter().chain(members).copied().collect()
        }
        _ => Vec::new(),
    };
    members.into_iter().filter(move |&m| pred(tree.kind(m)))
}

/// Fully qualified module names of all imports (`org/a.b`).
pub fn imported_modules(tree: &SyntaxTree) -> Vec<String> {
    module_members(tree, |k| matches!(k, SyntaxKind::ImportDeclaration { .. }))
        .filter_map(|id| match tree.kind(id) {
            SyntaxKind::ImportDeclaration { org, module, .. } => Some(match org {
                Some(org) => format!("{org}/{}", module.join(".")),
                None => module.join("."),
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn body(source: &str) -> (SyntaxTree, SyntaxNodeId) {
        let tree = parse(source).unwrap();
        let function = find_function(&tree, "f").unwrap();
        let body = function_body_expression(&tree, function).unwrap();
        (tree, body)
    }

    #[test]
    fn test_innermost_expression_body() {
        let (tree, body) = body("function f(A a) returns B => let int x = 1 in <B>({v: a.v});");
        let inner = innermost_expression_body(&tree, body);
        assert_eq!(tree.text(inner), "{v: a.v}");
        let unwrapped = unwrap_let(&tree, body);
        assert!(matches!(tree.kind(unwrapped), SyntaxKind::TypeCast { .. }));
    }

    #[test]
    fn test_field_names_chain() {
        let (tree, body) = body("function f(A a) returns string => a.b?.c;");
        let names = field_names(&tree, body).unwrap();
        let plain: Vec<_> = names.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(plain, vec!["a", "b", "c"]);
        assert!(names[2].optional);
    }

    #[test]
    fn test_collect_input_references() {
        let (tree, body) = body(
            "function f(A a, B b) returns string => a.x + string:trim(b.y.z) + \
             (from var i in a.items select i.n).toString();",
        );
        let refs: Vec<_> = collect_input_references(&tree, body)
            .into_iter()
            .map(|r| tree.text(r).to_string())
            .collect();
        assert_eq!(refs, vec!["a.x", "b.y.z", "a.items"]);
    }

    #[test]
    fn test_let_bound_names_are_not_inputs() {
        let (tree, body) =
            body("function f(A a) returns string => let string s = a.name in s + a.id;");
        let refs: Vec<_> = collect_input_references(&tree, body)
            .into_iter()
            .map(|r| tree.text(r).to_string())
            .collect();
        assert_eq!(refs, vec!["a.name", "a.id"]);
    }

    #[test]
    fn test_relative_path_of_field() {
        let (tree, body) = body(
            "function f(P[] ps) returns string[] => \
             from var {id, address: {city}} in ps select city;",
        );
        let SyntaxKind::QueryExpression { from, .. } = tree.kind(body) else {
            panic!("expected query");
        };
        let SyntaxKind::FromClause { pattern, .. } = tree.kind(*from) else {
            panic!("expected from clause");
        };
        assert!(is_available_within_binding_pattern(&tree, *pattern, "city"));
        assert_eq!(
            relative_path_of_field(&tree, *pattern, "city").as_deref(),
            Some(".address.city")
        );
        assert_eq!(relative_path_of_field(&tree, *pattern, "id").as_deref(), Some(".id"));
        assert_eq!(relative_path_of_field(&tree, *pattern, "zip"), None);
    }

    #[test]
    fn test_find_specific_field_escaped() {
        let (tree, body) = body("function f() returns R => {'type: 1, \"full name\": 2};");
        assert!(find_specific_field(&tree, body, "type").is_some());
        assert!(find_specific_field(&tree, body, "full name").is_some());
        assert!(find_specific_field(&tree, body, "other").is_none());
    }

    #[test]
    fn test_find_by_position_and_imports() {
        let (tree, body) = body("import ballerina/lang.value;\nfunction f() returns int => 1;");
        let pos = tree.position(body);
        assert_eq!(find_by_position(&tree, &pos), Some(body));
        assert_eq!(imported_modules(&tree), vec!["ballerina/lang.value".to_string()]);
    }
}
