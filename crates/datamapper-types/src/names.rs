//! Field naming rules of the host language.

/// Prefix the language service uses for fields it could not name.
/// Fields carrying it are never turned into ports.
pub const MISSING_NODE_PREFIX: &str = "$missingNode$";

const KEYWORDS: &[&str] = &[
    "abstract", "annotation", "any", "anydata", "as", "ascending", "boolean", "break", "by",
    "byte", "check", "checkpanic", "class", "client", "collect", "commit", "configurable",
    "const", "continue", "decimal", "descending", "distinct", "do", "else", "enum", "equals",
    "error", "external", "fail", "false", "field", "final", "float", "foreach", "fork", "from",
    "function", "future", "handle", "if", "import", "in", "int", "is", "isolated", "join",
    "json", "let", "limit", "listener", "lock", "map", "match", "never", "new", "null",
    "object", "on", "order", "outer", "panic", "parameter", "private", "public", "readonly",
    "record", "remote", "resource", "retry", "return", "returns", "rollback", "select",
    "service", "source", "start", "stream", "string", "table", "transaction", "transactional",
    "trap", "true", "type", "typedesc", "typeof", "var", "variable", "wait", "where", "while",
    "worker", "xml", "xmlns",
];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Escape a field name that collides with a reserved keyword (`'type`).
pub fn escape_field_name(name: &str) -> String {
    if is_keyword(name) {
        format!("'{name}")
    } else {
        name.to_string()
    }
}

/// Strip the quote of an escaped identifier.
pub fn unescape_field_name(name: &str) -> &str {
    name.strip_prefix('\'').unwrap_or(name)
}

pub fn is_missing_name(name: &str) -> bool {
    name.starts_with(MISSING_NODE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_keyword() {
        assert_eq!(escape_field_name("type"), "'type");
        assert_eq!(escape_field_name("name"), "name");
    }

    #[test]
    fn test_unescape_roundtrip() {
        assert_eq!(unescape_field_name(&escape_field_name("from")), "from");
        assert_eq!(unescape_field_name("plain"), "plain");
    }

    #[test]
    fn test_missing_name() {
        assert!(is_missing_name("$missingNode$_0"));
        assert!(!is_missing_name("id"));
    }
}
