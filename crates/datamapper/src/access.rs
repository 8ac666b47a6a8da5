//! Rendering of input access expressions.

use std::sync::LazyLock;

use datamapper_syntax::query::module_members;
use datamapper_syntax::{SyntaxKind, SyntaxTree};
use datamapper_types::escape_field_name;
use regex::Regex;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^'?[A-Za-z_][A-Za-z0-9_]*$").expect("invalid identifier regex"));

/// Access to the member `name` of the value `parent`: `parent.name`,
/// `parent?.name` for optional access, `parent.'type` for keywords and
/// `parent["full name"]` for names that are not identifiers.
pub fn member_access(parent: &str, name: &str, optional: bool) -> String {
    if IDENTIFIER.is_match(name) {
        let separator = if optional { "?." } else { "." };
        format!("{parent}{separator}{}", escape_field_name(name))
    } else {
        format!("{parent}[{name:?}]")
    }
}

/// Key under which the field `name` is written in a mapping constructor.
pub fn field_key(name: &str) -> String {
    if IDENTIFIER.is_match(name) {
        escape_field_name(name)
    } else {
        format!("{name:?}")
    }
}

/// Prefix under which `module` (`org/a.b`) is visible in the document: the
/// explicit `as` prefix, or the last module name segment.
pub fn module_prefix(tree: &SyntaxTree, module: &str) -> String {
    let (org, path) = module.split_once('/').unwrap_or(("", module));
    let default = path.rsplit('.').next().unwrap_or(path).to_string();
    module_members(tree, |k| matches!(k, SyntaxKind::ImportDeclaration { .. }))
        .find_map(|id| match tree.kind(id) {
            SyntaxKind::ImportDeclaration {
                org: import_org,
                module: import_path,
                prefix,
            } if import_org.as_deref().unwrap_or_default() == org
                && import_path.join(".") == path =>
            {
                Some(prefix.clone().unwrap_or_else(|| default.clone()))
            }
            _ => None,
        })
        .unwrap_or(default)
}
