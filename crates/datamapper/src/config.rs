//! Data mapper configuration.

use indexmap::IndexSet;

/// Configuration of a graph rebuild and of the edits synthesized from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperConfig {
    /// Line break inserted before a field added after an existing sibling.
    /// Default: NewlineStyle::Lf
    pub newline: NewlineStyle,

    /// Indentation inserted before a field added after an existing sibling.
    /// Default: "\t"
    pub indent: String,

    /// Port ids the user collapsed. Kept by the caller across rebuilds.
    pub collapsed_fields: IndexSet<String>,

    /// Case-insensitive field name filter for input nodes.
    pub input_search: String,

    /// Case-insensitive field name filter for the output node.
    pub output_search: String,

    /// Upper bound on re-enrichment passes before giving up on a type.
    /// Default: 8
    pub max_enrichment_passes: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            newline: NewlineStyle::Lf,
            indent: "\t".to_string(),
            collapsed_fields: IndexSet::new(),
            input_search: String::new(),
            output_search: String::new(),
            max_enrichment_passes: 8,
        }
    }
}

impl MapperConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_newline(mut self, style: NewlineStyle) -> Self {
        self.newline = style;
        self
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Mark a port id as collapsed.
    pub fn with_collapsed(mut self, port_id: impl Into<String>) -> Self {
        self.collapsed_fields.insert(port_id.into());
        self
    }

    pub fn with_input_search(mut self, query: impl Into<String>) -> Self {
        self.input_search = query.into();
        self
    }

    pub fn with_output_search(mut self, query: impl Into<String>) -> Self {
        self.output_search = query.into();
        self
    }

    pub fn with_max_enrichment_passes(mut self, passes: usize) -> Self {
        self.max_enrichment_passes = passes.max(1);
        self
    }

    pub fn is_collapsed(&self, port_id: &str) -> bool {
        self.collapsed_fields.contains(port_id)
    }
}

/// Newline style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewlineStyle {
    /// Unix-style line endings (LF).
    #[default]
    Lf,
    /// Windows-style line endings (CRLF).
    CrLf,
}

impl NewlineStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            NewlineStyle::Lf => "\n",
            NewlineStyle::CrLf => "\r\n",
        }
    }
}
