//! Go expression validation backed by tree-sitter-go.
//!
//! Conditions and `^expr` expressions are checked on their own as soon as
//! they are read, so a typo is reported at the template position instead
//! of surfacing later as a Go compile error in generated code.

use super::scanner::{Scanner, Tok};

pub struct GoSyntax {
    parser: tree_sitter::Parser,
}

impl GoSyntax {
    pub fn new() -> Self {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .expect("Failed to load Go grammar");
        Self { parser }
    }

    /// Whether `text` parses as exactly one Go expression.
    pub fn is_expression(&mut self, text: &str) -> bool {
        if text.trim().is_empty() || !brackets_balanced(text) {
            return false;
        }

        // Parenthesized so a newline inside `text` cannot end the
        // declaration early.
        let wrapped = format!("package p\n\nvar _ = ({text})\n");
        let Some(tree) = self.parser.parse(&wrapped, None) else {
            return false;
        };
        let root = tree.root_node();
        if root.has_error() {
            return false;
        }

        // package clause + the var declaration, nothing smuggled in after
        let mut cursor = root.walk();
        let declarations = root
            .named_children(&mut cursor)
            .filter(|node| node.kind() != "comment")
            .count();
        declarations == 2
    }
}

impl Default for GoSyntax {
    fn default() -> Self {
        Self::new()
    }
}

/// Brackets pair up and never close below zero. Catches `a) + (b`, which
/// would otherwise parse once wrapped in parentheses.
fn brackets_balanced(text: &str) -> bool {
    let mut stack = Vec::new();
    for token in Scanner::new(text, 0) {
        match token.tok {
            Tok::LParen | Tok::LBrack | Tok::LBrace => stack.push(token.tok),
            Tok::RParen | Tok::RBrack | Tok::RBrace => {
                let expected = match token.tok {
                    Tok::RParen => Tok::LParen,
                    Tok::RBrack => Tok::LBrack,
                    _ => Tok::LBrace,
                };
                if stack.pop() != Some(expected) {
                    return false;
                }
            }
            Tok::Illegal => return false,
            _ => {}
        }
    }
    stack.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_expressions() {
        let mut go = GoSyntax::new();
        for expr in [
            "name",
            "user.Name",
            "len(items) > 0",
            "items[i].Title",
            "fmt.Sprintf(\"%d\", n)",
            "x == 1 && !done",
            "Point{X: 1}.X",
            "func() int { return 1 }()",
            "a +\n b",
        ] {
            assert!(go.is_expression(expr), "{expr:?} should be an expression");
        }
    }

    #[test]
    fn test_rejects_non_expressions() {
        let mut go = GoSyntax::new();
        for text in ["", "   ", "x :=", "a) + (b", "if x", "x = 1", "1 +", "a b", "@"] {
            assert!(!go.is_expression(text), "{text:?} should be rejected");
        }
    }
}
