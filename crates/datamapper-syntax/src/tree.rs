use crate::kind::{SyntaxKind, Token};
use crate::position::{LineIndex, NodePosition, TextSpan};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SyntaxNodeId(pub usize);

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub span: TextSpan,
    pub parent: Option<SyntaxNodeId>,
}

/// Parsed source file. Nodes live in an arena and refer to each other by id;
/// parent links are back-references only.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<SyntaxNode>,
    root: SyntaxNodeId,
    line_index: LineIndex,
}

impl SyntaxTree {
    pub(crate) fn builder(source: &str) -> SyntaxTreeBuilder {
        SyntaxTreeBuilder {
            source: source.to_string(),
            nodes: Vec::new(),
        }
    }

    pub fn root(&self) -> SyntaxNodeId {
        self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn node(&self, id: SyntaxNodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: SyntaxNodeId) -> &SyntaxKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: SyntaxNodeId) -> Option<SyntaxNodeId> {
        self.nodes[id.0].parent
    }

    pub fn span(&self, id: SyntaxNodeId) -> TextSpan {
        self.nodes[id.0].span
    }

    pub fn position(&self, id: SyntaxNodeId) -> NodePosition {
        self.line_index.position(self.nodes[id.0].span)
    }

    pub fn token_position(&self, token: &Token) -> NodePosition {
        self.line_index.position(token.span)
    }

    /// Source text of a node.
    pub fn text(&self, id: SyntaxNodeId) -> &str {
        self.nodes[id.0].span.as_str(&self.source)
    }

    pub fn children(&self, id: SyntaxNodeId) -> Vec<SyntaxNodeId> {
        self.nodes[id.0].kind.children()
    }

    pub fn ancestors(&self, id: SyntaxNodeId) -> impl Iterator<Item = SyntaxNodeId> + '_ {
        std::iter::successors(self.parent(id), |&p| self.parent(p))
    }

    /// All nodes of the subtree rooted at `id`, in pre-order.
    pub fn descendants(&self, id: SyntaxNodeId) -> Vec<SyntaxNodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut children = self.children(next);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub(crate) struct SyntaxTreeBuilder {
    source: String,
    nodes: Vec<SyntaxNode>,
}

impl SyntaxTreeBuilder {
    /// Add a node and point its children back at it.
    pub(crate) fn alloc(&mut self, kind: SyntaxKind, span: TextSpan) -> SyntaxNodeId {
        let id = SyntaxNodeId(self.nodes.len());
        for child in kind.children() {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes.push(SyntaxNode {
            kind,
            span,
            parent: None,
        });
        id
    }

    pub(crate) fn finish(self, root: SyntaxNodeId) -> SyntaxTree {
        let line_index = LineIndex::new(&self.source);
        SyntaxTree {
            source: self.source,
            nodes: self.nodes,
            root,
            line_index,
        }
    }
}
