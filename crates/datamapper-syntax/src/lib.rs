//! Syntax tree adapter for the data mapper.
//!
//! The engine only needs node kinds, positions and source text of the
//! function it maps. This crate provides them as an arena of nodes whose
//! kinds form a closed sum type, together with a small recursive-descent
//! parser for the language subset that data mapping functions use.

pub mod kind;
pub mod lexer;
pub mod parser;
pub mod position;
pub mod query;
pub mod tree;

pub use kind::{BinaryOp, LiteralKind, SyntaxKind, Token, TypeDescKind};
pub use parser::{ParseError, parse};
pub use position::{LineIndex, LinePosition, NodePosition, TextSpan};
pub use tree::{SyntaxNode, SyntaxNodeId, SyntaxTree};
