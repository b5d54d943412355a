use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::parser::attrs::LexDiagnostic;

mod serial;
mod visit;

pub use serial::{DecodeError, nodes_from_json, nodes_to_json};
pub use visit::{NodeRef, Visit, inspect, inspect_all};

/// Half-open byte range into the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `other` lies entirely within this span
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Abstract Syntax Tree for one template file
#[derive(Debug, Clone)]
pub struct Ast {
    pub nodes: Vec<Node>,
    pub source: Arc<str>,
    /// Advisory attribute-lexer diagnostics (absolute offsets)
    pub diagnostics: Vec<LexDiagnostic>,
}

impl Ast {
    pub fn new(nodes: Vec<Node>, source: Arc<str>, diagnostics: Vec<LexDiagnostic>) -> Self {
        Self {
            nodes,
            source,
            diagnostics,
        }
    }
}

/// AST Node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Node {
    // Content
    Literal(LiteralNode),
    StrExpr(StrExprNode),

    // Go
    Code(CodeNode),
    Import(ImportNode),

    // Control Flow
    If(IfNode),
    For(ForNode),

    // Structure
    Partial(PartialNode),
    Block(BlockNode),
    Element(ElementNode),
}

impl Node {
    /// Source extent of the node. Nodes without their own span derive it
    /// from their children.
    pub fn span(&self) -> Span {
        match self {
            Node::Literal(n) => n.span,
            Node::StrExpr(n) => n.span,
            Node::Code(n) => n.span,
            Node::Import(n) => n.span,
            Node::If(n) => n.span(),
            Node::For(n) => Span::new(n.clause.span.start, n.block.span().end.max(n.clause.span.end)),
            Node::Partial(n) => n.span,
            Node::Block(n) => n.span(),
            Node::Element(n) => n.span,
        }
    }

    /// Short variant name, as used by the tagged serialization
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Literal(_) => "literal",
            Node::StrExpr(_) => "str_expr",
            Node::Code(_) => "code",
            Node::Import(_) => "import",
            Node::If(_) => "if",
            Node::For(_) => "for",
            Node::Partial(_) => "partial",
            Node::Block(_) => "block",
            Node::Element(_) => "element",
        }
    }
}

/// Verbatim markup or text, written unescaped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralNode {
    pub text: String,
    pub span: Span,
}

/// Go expression whose value is escaped and written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrExprNode {
    pub expr: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeContext {
    /// Statements interleaved with markup
    Inline,
    /// The page-level hook that runs before any output
    Handler,
}

/// Verbatim Go statements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeNode {
    pub context: CodeContext,
    pub code: String,
    pub span: Span,
}

/// if / else if / else
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfNode {
    pub cond: StrExprNode,
    pub then: BlockNode,
    /// Either another `If` (else-if chain) or a `Block`
    pub alt: Option<Box<Node>>,
}

impl IfNode {
    pub fn span(&self) -> Span {
        let end = match &self.alt {
            Some(alt) => alt.span().end,
            None => self.then.span().end,
        };
        Span::new(self.cond.span.start, end.max(self.cond.span.end))
    }
}

/// for loop; the clause is kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForNode {
    pub clause: CodeNode,
    pub block: BlockNode,
}

/// Named, independently routable sub-template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialNode {
    pub name: String,
    pub span: Span,
    pub block: BlockNode,
}

/// Ordered, non-empty node sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockNode {
    pub nodes: Vec<Node>,
}

impl BlockNode {
    pub fn span(&self) -> Span {
        match (self.nodes.first(), self.nodes.last()) {
            (Some(first), Some(last)) => Span::new(first.span().start, last.span().end),
            _ => Span::default(),
        }
    }
}

/// HTML element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub tag: Tag,
    /// The start tag, flattened into literals and attribute expressions
    pub start_tag_nodes: Vec<Node>,
    pub children: Vec<Node>,
    /// `<x/>` or a void element: no end tag is emitted
    pub self_closing: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub attrs: Vec<Attr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attr {
    pub name: StringPos,
    pub value: StringPos,
}

/// Text plus the raw byte range it was read from. `text` is decoded
/// (character references resolved) and may be shorter than the range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringPos {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Go import declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportNode {
    pub decl: ImportDecl,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    /// `None` for a plain import, `Some(".")` for a dot-import
    pub pkg_alias: Option<String>,
    pub path: String,
}
