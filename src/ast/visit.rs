//! Pre-order traversal over the AST.
//!
//! The callback sees `Visit::Enter` for every node and returns whether to
//! descend into its children. When it returns `true`, a matching
//! `Visit::Exit` follows once the children (if any) are done.

use super::{
    BlockNode, CodeNode, ElementNode, ForNode, IfNode, ImportNode, LiteralNode, Node, PartialNode,
    Span, StrExprNode,
};

/// Borrowed view of any node, including the typed children (`If::cond`,
/// `For::clause`, blocks) that are not stored as `Node` values.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Literal(&'a LiteralNode),
    StrExpr(&'a StrExprNode),
    Code(&'a CodeNode),
    Import(&'a ImportNode),
    If(&'a IfNode),
    For(&'a ForNode),
    Partial(&'a PartialNode),
    Block(&'a BlockNode),
    Element(&'a ElementNode),
}

impl<'a> From<&'a Node> for NodeRef<'a> {
    fn from(node: &'a Node) -> Self {
        match node {
            Node::Literal(n) => NodeRef::Literal(n),
            Node::StrExpr(n) => NodeRef::StrExpr(n),
            Node::Code(n) => NodeRef::Code(n),
            Node::Import(n) => NodeRef::Import(n),
            Node::If(n) => NodeRef::If(n),
            Node::For(n) => NodeRef::For(n),
            Node::Partial(n) => NodeRef::Partial(n),
            Node::Block(n) => NodeRef::Block(n),
            Node::Element(n) => NodeRef::Element(n),
        }
    }
}

impl NodeRef<'_> {
    pub fn span(&self) -> Span {
        match *self {
            NodeRef::Literal(n) => n.span,
            NodeRef::StrExpr(n) => n.span,
            NodeRef::Code(n) => n.span,
            NodeRef::Import(n) => n.span,
            NodeRef::If(n) => n.span(),
            NodeRef::For(n) => Span::new(n.clause.span.start, n.block.span().end.max(n.clause.span.end)),
            NodeRef::Partial(n) => n.span,
            NodeRef::Block(n) => n.span(),
            NodeRef::Element(n) => n.span,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Visit<'a> {
    Enter(NodeRef<'a>),
    /// Sentinel after the children of the most recently entered node
    Exit,
}

/// Walk one node and its descendants.
pub fn inspect<'a, F>(node: impl Into<NodeRef<'a>>, f: &mut F)
where
    F: FnMut(Visit<'a>) -> bool,
{
    walk(node.into(), f);
}

/// Walk a sibling list in order.
pub fn inspect_all<'a, F>(nodes: &'a [Node], f: &mut F)
where
    F: FnMut(Visit<'a>) -> bool,
{
    for node in nodes {
        walk(NodeRef::from(node), f);
    }
}

fn walk<'a, F>(node: NodeRef<'a>, f: &mut F)
where
    F: FnMut(Visit<'a>) -> bool,
{
    if !f(Visit::Enter(node)) {
        return;
    }

    match node {
        NodeRef::Literal(_) | NodeRef::StrExpr(_) | NodeRef::Code(_) | NodeRef::Import(_) => {}
        NodeRef::If(n) => {
            walk(NodeRef::StrExpr(&n.cond), f);
            walk(NodeRef::Block(&n.then), f);
            if let Some(alt) = &n.alt {
                walk(NodeRef::from(alt.as_ref()), f);
            }
        }
        NodeRef::For(n) => {
            walk(NodeRef::Code(&n.clause), f);
            walk(NodeRef::Block(&n.block), f);
        }
        NodeRef::Partial(n) => walk(NodeRef::Block(&n.block), f),
        NodeRef::Block(n) => inspect_all(&n.nodes, f),
        NodeRef::Element(n) => {
            inspect_all(&n.start_tag_nodes, f);
            inspect_all(&n.children, f);
        }
    }

    f(Visit::Exit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CodeContext, Tag};

    fn lit(text: &str, start: usize) -> Node {
        Node::Literal(LiteralNode {
            text: text.to_string(),
            span: Span::new(start, start + text.len()),
        })
    }

    fn sample() -> Vec<Node> {
        vec![
            lit("a", 0),
            Node::If(IfNode {
                cond: StrExprNode {
                    expr: "ok".into(),
                    span: Span::new(4, 6),
                },
                then: BlockNode {
                    nodes: vec![Node::Element(ElementNode {
                        tag: Tag {
                            name: "p".into(),
                            attrs: vec![],
                        },
                        start_tag_nodes: vec![lit("<p>", 9)],
                        children: vec![lit("x", 12)],
                        self_closing: false,
                        span: Span::new(9, 17),
                    })],
                },
                alt: None,
            }),
            Node::Code(CodeNode {
                context: CodeContext::Inline,
                code: "n++".into(),
                span: Span::new(20, 23),
            }),
        ]
    }

    fn label(node: NodeRef<'_>) -> &'static str {
        match node {
            NodeRef::Literal(_) => "literal",
            NodeRef::StrExpr(_) => "str_expr",
            NodeRef::Code(_) => "code",
            NodeRef::Import(_) => "import",
            NodeRef::If(_) => "if",
            NodeRef::For(_) => "for",
            NodeRef::Partial(_) => "partial",
            NodeRef::Block(_) => "block",
            NodeRef::Element(_) => "element",
        }
    }

    #[test]
    fn test_preorder_with_exit_sentinels() {
        let nodes = sample();
        let mut events = Vec::new();
        inspect_all(&nodes, &mut |visit| {
            events.push(match visit {
                Visit::Enter(node) => label(node),
                Visit::Exit => "exit",
            });
            true
        });
        assert_eq!(
            events,
            [
                "literal", "exit", "if", "str_expr", "exit", "block", "element", "literal", "exit",
                "literal", "exit", "exit", "exit", "exit", "code", "exit",
            ]
        );
    }

    #[test]
    fn test_skipped_children_get_no_exit() {
        let nodes = sample();
        let mut events = Vec::new();
        inspect_all(&nodes, &mut |visit| match visit {
            Visit::Enter(node @ NodeRef::If(_)) => {
                events.push(label(node));
                false
            }
            Visit::Enter(node) => {
                events.push(label(node));
                true
            }
            Visit::Exit => {
                events.push("exit");
                true
            }
        });
        assert_eq!(events, ["literal", "exit", "if", "code", "exit"]);
    }
}
