mod coalesce;
mod page;

pub use coalesce::{LiteralCoalescer, MAX_LITERAL_LEN};
pub use page::{Page, PartialId, PartialMeta, PartialTree};

use crate::ast::{Ast, Node};

/// Visitor trait for AST transformations
pub trait Visitor {
    /// Called once for every sibling list in the tree, after the lists
    /// nested below it have been visited.
    fn visit_list(&mut self, nodes: &mut Vec<Node>);
}

/// Transformer that applies a series of plugins to an AST
pub struct Transformer {
    plugins: Vec<Box<dyn Visitor>>,
}

impl Transformer {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    pub fn add<V: Visitor + 'static>(mut self, visitor: V) -> Self {
        self.plugins.push(Box::new(visitor));
        self
    }

    pub fn transform(&mut self, ast: &mut Ast) {
        for plugin in &mut self.plugins {
            Self::visit_nodes(&mut ast.nodes, plugin.as_mut());
        }
    }

    fn visit_nodes(nodes: &mut Vec<Node>, visitor: &mut dyn Visitor) {
        for node in nodes.iter_mut() {
            Self::visit_children(node, visitor);
        }
        visitor.visit_list(nodes);
    }

    fn visit_children(node: &mut Node, visitor: &mut dyn Visitor) {
        match node {
            Node::If(if_node) => {
                Self::visit_nodes(&mut if_node.then.nodes, visitor);
                if let Some(alt) = &mut if_node.alt {
                    Self::visit_children(alt, visitor);
                }
            }
            Node::For(for_node) => Self::visit_nodes(&mut for_node.block.nodes, visitor),
            Node::Partial(partial) => Self::visit_nodes(&mut partial.block.nodes, visitor),
            Node::Block(block) => Self::visit_nodes(&mut block.nodes, visitor),
            Node::Element(el) => {
                Self::visit_nodes(&mut el.start_tag_nodes, visitor);
                Self::visit_nodes(&mut el.children, visitor);
            }
            // Leaf nodes
            Node::Literal(_) | Node::StrExpr(_) | Node::Code(_) | Node::Import(_) => {}
        }
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a transformer with the standard plugins
pub fn standard_plugins() -> Transformer {
    Transformer::new().add(LiteralCoalescer)
}

/// Merge adjacent literals everywhere in the tree.
pub fn coalesce_literals(ast: &mut Ast) {
    standard_plugins().transform(ast);
}
