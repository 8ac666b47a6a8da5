//! Visual data mapper engine.
//!
//! A data mapping function (`function f(In i) returns Out => {...}`) is
//! presented as a graph: input nodes for parameters, local variables and
//! module-level values, one output node for the value being built, and
//! links between their ports for every field the expression assigns.
//! Editing the graph produces [`Modifications`] of the source text; the
//! graph is rebuilt from the edited document, never mutated in place.
//!
//! ```text
//! source ──parse──▶ SyntaxTree ──build_graph──▶ DataMapperGraph
//!    ▲                                               │
//!    └────── Modifications ◀── create_link / delete_link / retarget
//! ```

pub mod access;
pub mod build;
pub mod config;
pub mod context;
pub mod editable;
pub mod enrich;
pub mod error;
pub mod graph;
pub mod infer;
pub mod local_types;
pub mod lsp;
pub mod mapping;
pub mod node;
pub mod port;
pub mod resolve;
pub mod search;
pub mod source;
pub mod union;

pub use build::build_graph;
pub use config::{MapperConfig, NewlineStyle};
pub use context::{FnDefInfo, LanguageService, RebuildContext};
pub use editable::{EditableField, EditableTree, FieldId};
pub use error::{EnrichError, GraphError, SourceError};
pub use graph::{DataMapperGraph, Link, LinkLabel, NodeId, PortId, Selection};
pub use local_types::LocalTypeService;
pub use lsp::to_text_edits;
pub use node::{DataMapperNode, NodeKind};
pub use port::{Port, PortDirection};
pub use source::{Modification, Modifications, create_link, delete_link, retarget, set_field_value};
