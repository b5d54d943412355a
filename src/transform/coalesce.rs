use super::Visitor;
use crate::ast::Node;

/// Merged literals stay strictly below this many bytes.
pub const MAX_LITERAL_LEN: usize = 512;

/// Joins runs of adjacent `Literal` siblings so the generator emits fewer
/// writes. Greedy, left to right; running it twice changes nothing.
pub struct LiteralCoalescer;

impl Visitor for LiteralCoalescer {
    fn visit_list(&mut self, nodes: &mut Vec<Node>) {
        if nodes.len() < 2 {
            return;
        }

        let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes.drain(..) {
            if let (Node::Literal(next), Some(Node::Literal(last))) = (&node, merged.last_mut()) {
                if last.text.len() + next.text.len() < MAX_LITERAL_LEN {
                    last.text.push_str(&next.text);
                    last.span.end = next.span.end;
                    continue;
                }
            }
            merged.push(node);
        }
        *nodes = merged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, LiteralNode, Span, StrExprNode};
    use crate::parser::{Parser, UpParser};
    use crate::transform::coalesce_literals;

    fn lit(text: &str, start: usize) -> Node {
        Node::Literal(LiteralNode {
            text: text.to_string(),
            span: Span::new(start, start + text.len()),
        })
    }

    fn coalesced(source: &str) -> Ast {
        let mut ast = UpParser::new().parse(source).unwrap();
        coalesce_literals(&mut ast);
        ast
    }

    #[test]
    fn test_merges_adjacent_literals() {
        let mut nodes = vec![lit("a", 0), lit("b", 1), lit("c", 2)];
        LiteralCoalescer.visit_list(&mut nodes);
        assert_eq!(nodes, [lit("abc", 0)]);
    }

    #[test]
    fn test_expressions_break_runs() {
        let expr = Node::StrExpr(StrExprNode {
            expr: "x".into(),
            span: Span::new(3, 4),
        });
        let mut nodes = vec![lit("a", 0), lit("b", 1), expr.clone(), lit("c", 4), lit("d", 5)];
        LiteralCoalescer.visit_list(&mut nodes);
        assert_eq!(nodes, [lit("ab", 0), expr, lit("cd", 4)]);
    }

    #[test]
    fn test_merged_length_stays_below_limit() {
        let big = "x".repeat(300);
        let mut nodes = vec![lit(&big, 0), lit(&big, 300), lit("y", 600)];
        LiteralCoalescer.visit_list(&mut nodes);
        assert_eq!(nodes.len(), 2);
        let Node::Literal(second) = &nodes[1] else {
            panic!("expected literal");
        };
        assert_eq!(second.text.len(), 301);
        assert_eq!(second.span, Span::new(300, 601));
    }

    #[test]
    fn test_exact_limit_is_not_reached() {
        let half = "x".repeat(256);
        let mut nodes = vec![lit(&half, 0), lit(&half, 256)];
        LiteralCoalescer.visit_list(&mut nodes);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let big = "x".repeat(200);
        let mut nodes: Vec<Node> = (0..7).map(|i| lit(&big, i * 200)).collect();
        LiteralCoalescer.visit_list(&mut nodes);
        let once = nodes.clone();
        LiteralCoalescer.visit_list(&mut nodes);
        assert_eq!(nodes, once);
    }

    #[test]
    fn test_reaches_nested_lists() {
        let ast = coalesced("<p title=\"a^^b\">x ^^ y</p>");
        let Node::Element(p) = &ast.nodes[0] else {
            panic!("expected element");
        };
        let merged = |text: &str, start, end| {
            Node::Literal(LiteralNode {
                text: text.to_string(),
                span: Span::new(start, end),
            })
        };
        assert_eq!(p.start_tag_nodes, [merged("<p title=\"a^b\">", 0, 16)]);
        assert_eq!(p.children, [merged("x ^ y", 16, 22)]);
    }
}
