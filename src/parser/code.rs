//! Code sub-parser: everything that follows a `^`.
//!
//! Reads Go tokens from the shared buffer with one token of lookahead and a
//! single-level pushback. Block bodies hand the cursor to the markup
//! sub-parser and resume scanning wherever it stopped.

use super::markup;
use super::scanner::{Scanner, Tok, Token};
use super::ParseContext;
use crate::ast::{
    BlockNode, CodeContext, CodeNode, ForNode, IfNode, ImportDecl, ImportNode, Node, PartialNode,
    StrExprNode,
};
use crate::error::{ErrorKind, ParseError};

/// Parse the construct after the marker at `marker`. The context's cursor
/// must sit just past the marker; on success it is left after the construct.
pub(super) fn parse_code(ctx: &mut ParseContext<'_, '_>, marker: usize) -> Result<Node, ParseError> {
    let mut parser = CodeParser::new(ctx);
    let node = parser.parse_transition(marker)?;
    parser.sync();
    Ok(node)
}

struct CodeParser<'c, 'a, 's> {
    ctx: &'c mut ParseContext<'a, 's>,
    src: &'a str,
    scanner: Scanner<'a>,
    /// Offset scanning (re)started from
    start: usize,
    accepted: Option<Token<'a>>,
    prev: Option<Token<'a>>,
    lookahead: Option<Token<'a>>,
    backed_up: bool,
}

impl<'c, 'a, 's> CodeParser<'c, 'a, 's> {
    fn new(ctx: &'c mut ParseContext<'a, 's>) -> Self {
        let src = ctx.src();
        let start = ctx.offset();
        Self {
            ctx,
            src,
            scanner: Scanner::new(src, start),
            start,
            accepted: None,
            prev: None,
            lookahead: None,
            backed_up: false,
        }
    }

    fn peek(&mut self) -> Token<'a> {
        if self.backed_up {
            if let Some(token) = self.accepted {
                return token;
            }
        }
        *self
            .lookahead
            .get_or_insert_with(|| self.scanner.next_token())
    }

    fn advance(&mut self) -> Token<'a> {
        if self.backed_up {
            self.backed_up = false;
            if let Some(token) = self.accepted {
                return token;
            }
        }
        let token = match self.lookahead.take() {
            Some(token) => token,
            None => self.scanner.next_token(),
        };
        self.prev = self.accepted.replace(token);
        token
    }

    /// Un-read the last accepted token. Allowed once between advances.
    fn backup(&mut self) {
        assert!(
            !self.backed_up && self.accepted.is_some(),
            "code parser: backup() without a fresh advance()"
        );
        self.backed_up = true;
    }

    /// End of the last token the parser kept.
    fn offset(&self) -> usize {
        let token = if self.backed_up { self.prev } else { self.accepted };
        token.map_or(self.start, |t| t.end)
    }

    /// Hand the cursor back to the shared context.
    fn sync(&mut self) {
        let offset = self.offset();
        self.ctx.set_offset(offset);
    }

    /// Restart scanning after the markup sub-parser moved the cursor.
    fn resume_at(&mut self, offset: usize) {
        self.scanner = Scanner::new(self.src, offset);
        self.start = offset;
        self.accepted = None;
        self.prev = None;
        self.lookahead = None;
        self.backed_up = false;
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>, start: usize, end: usize) -> ParseError {
        self.ctx.error(kind, message, start, end)
    }

    fn parse_transition(&mut self, marker: usize) -> Result<Node, ParseError> {
        let first = self.peek();
        if first.start != marker + 1 {
            return Err(self
                .error(
                    ErrorKind::UnexpectedToken,
                    "expected Go code immediately after '^'",
                    marker,
                    marker + 1,
                )
                .with_help("remove the space after '^', or write '^^' for a literal '^'"));
        }

        match first.tok {
            Tok::Keyword if first.lit == "if" => self.parse_if(),
            Tok::Keyword if first.lit == "for" => self.parse_for(),
            Tok::Keyword if first.lit == "import" => self.parse_import(marker),
            Tok::Ident if first.lit == "handler" => {
                self.advance();
                if self.peek().tok == Tok::LBrace {
                    self.parse_code_block(CodeContext::Handler)
                } else {
                    self.backup();
                    self.parse_implicit_expr()
                }
            }
            Tok::Ident if first.lit == "partial" => {
                self.advance();
                if self.peek().tok == Tok::Ident {
                    self.parse_partial(marker)
                } else {
                    self.backup();
                    self.parse_implicit_expr()
                }
            }
            Tok::Ident => self.parse_implicit_expr(),
            Tok::LBrace => self.parse_code_block(CodeContext::Inline),
            Tok::LParen => self.parse_explicit_expr(),
            Tok::Eof => Err(self.error(
                ErrorKind::UnexpectedEof,
                "expected Go code after '^', found end of input",
                marker,
                marker + 1,
            )),
            _ => Err(self
                .error(
                    ErrorKind::UnexpectedToken,
                    format!("unexpected '{}' after '^'", first.lit),
                    first.start,
                    first.end,
                )
                .with_help("start an expression with a name or '(', or write '^^' for a literal '^'")),
        }
    }

    fn parse_if(&mut self) -> Result<Node, ParseError> {
        let keyword = self.advance();
        let cond = self.parse_condition(keyword)?;
        let then = self.parse_stmt_block("if")?;

        // As in Go, `else` must share a line with the closing brace
        let close_end = self.offset();
        let next = self.peek();
        let same_line = !self.src[close_end..next.start].contains('\n');
        let alt = if same_line && next.is_keyword("else") {
            let else_kw = self.advance();
            let next = self.peek();
            if next.is_keyword("if") {
                Some(Box::new(self.parse_if()?))
            } else if next.tok == Tok::LBrace {
                Some(Box::new(Node::Block(self.parse_stmt_block("else")?)))
            } else {
                return Err(self.error(
                    ErrorKind::UnexpectedToken,
                    "expected 'if' or '{' after 'else'",
                    else_kw.start,
                    else_kw.end,
                ));
            }
        } else {
            None
        };

        Ok(Node::If(IfNode { cond, then, alt }))
    }

    fn parse_condition(&mut self, keyword: Token<'a>) -> Result<StrExprNode, ParseError> {
        let first = self.peek();
        if first.tok == Tok::LBrace {
            return Err(self.error(
                ErrorKind::UnexpectedToken,
                "missing condition in if statement",
                keyword.start,
                first.end,
            ));
        }

        let end = self.collect_until_brace("if condition", keyword)?;
        let src = self.src;
        let text = &src[first.start..end];
        if !self.ctx.is_go_expression(text) {
            return Err(self.error(
                ErrorKind::InvalidExpression,
                format!("'{text}' is not a valid Go expression"),
                first.start,
                end,
            ));
        }
        Ok(StrExprNode {
            expr: text.to_string(),
            span: self.ctx.span(first.start, end),
        })
    }

    /// Consume tokens up to an opening brace outside any brackets. Returns
    /// the end of the last consumed token.
    fn collect_until_brace(&mut self, what: &str, keyword: Token<'a>) -> Result<usize, ParseError> {
        let mut depth = 0usize;
        let mut end = keyword.end;
        loop {
            let token = self.peek();
            match token.tok {
                Tok::Eof => {
                    return Err(self.error(
                        ErrorKind::UnexpectedEof,
                        format!("unexpected end of input in {what}; expected '{{'"),
                        keyword.start,
                        keyword.end,
                    ));
                }
                Tok::LBrace if depth == 0 => return Ok(end),
                Tok::LParen | Tok::LBrack | Tok::LBrace => depth += 1,
                Tok::RParen | Tok::RBrack | Tok::RBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
            end = token.end;
        }
    }

    fn parse_for(&mut self) -> Result<Node, ParseError> {
        let keyword = self.advance();
        let first = self.peek();
        let end = self.collect_until_brace("for clause", keyword)?;
        // `^for {` is an infinite loop with an empty clause
        let (start, end) = if first.tok == Tok::LBrace {
            (first.start, first.start)
        } else {
            (first.start, end)
        };

        let clause = CodeNode {
            context: CodeContext::Inline,
            code: self.src[start..end].to_string(),
            span: self.ctx.span(start, end),
        };
        let block = self.parse_stmt_block("for")?;
        Ok(Node::For(ForNode { clause, block }))
    }

    /// `{` then one nested `^` construct or one element, then `}`.
    fn parse_stmt_block(&mut self, construct: &str) -> Result<BlockNode, ParseError> {
        let open = self.advance();
        if open.tok != Tok::LBrace {
            return Err(self.error(
                ErrorKind::UnexpectedToken,
                format!("expected '{{' to open the {construct} block"),
                open.start,
                open.end.max(open.start + 1),
            ));
        }

        let next = self.peek();
        let node = match next.tok {
            Tok::Xor => {
                self.advance();
                self.parse_transition(next.start)?
            }
            Tok::RBrace => {
                return Err(self
                    .error(
                        ErrorKind::InvalidBlock,
                        format!("empty {construct} block"),
                        open.start,
                        next.end,
                    )
                    .with_help("put an element or a ^ construct inside the block"));
            }
            Tok::Eof => {
                return Err(self.error(
                    ErrorKind::UnclosedBlock,
                    format!("unclosed {construct} block"),
                    open.start,
                    open.end,
                ));
            }
            _ => {
                let offset = self.offset();
                self.ctx.set_offset(offset);
                let element = markup::parse_block_element(self.ctx)?;
                let resume = self.ctx.offset();
                self.resume_at(resume);
                element
            }
        };

        let close = self.advance();
        match close.tok {
            Tok::RBrace => Ok(BlockNode { nodes: vec![node] }),
            Tok::Lss => Err(self
                .error(
                    ErrorKind::InvalidBlock,
                    format!("there must be a single element inside the {construct} block"),
                    close.start,
                    close.end,
                )
                .with_help("wrap sibling elements in <text>...</text>")),
            Tok::Eof => Err(self.error(
                ErrorKind::UnclosedBlock,
                format!("unclosed {construct} block; expected '}}'"),
                open.start,
                open.end,
            )),
            _ => Err(self.error(
                ErrorKind::UnexpectedToken,
                format!("expected '}}' to close the {construct} block, found '{}'", close.lit),
                close.start,
                close.end,
            )),
        }
    }

    fn parse_partial(&mut self, marker: usize) -> Result<Node, ParseError> {
        let name = self.advance();
        let block = self.parse_stmt_block("partial")?;
        Ok(Node::Partial(PartialNode {
            name: name.lit.to_string(),
            span: self.ctx.span(marker, self.offset()),
            block,
        }))
    }

    /// `{ ... }` with balanced braces; the content is kept verbatim.
    fn parse_code_block(&mut self, context: CodeContext) -> Result<Node, ParseError> {
        let open = self.advance();
        let mut depth = 1usize;
        let close = loop {
            let token = self.advance();
            match token.tok {
                Tok::LBrace => depth += 1,
                Tok::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        break token;
                    }
                }
                Tok::Eof => {
                    return Err(self.error(
                        ErrorKind::UnclosedBlock,
                        "unterminated code block; expected '}'",
                        open.start,
                        open.end,
                    ));
                }
                _ => {}
            }
        };

        Ok(Node::Code(CodeNode {
            context,
            code: self.src[open.end..close.start].to_string(),
            span: self.ctx.span(open.end, close.start),
        }))
    }

    /// `^( ... )`: everything between the parentheses is the expression.
    fn parse_explicit_expr(&mut self) -> Result<Node, ParseError> {
        let open = self.advance();
        let mut depth = 1usize;
        let close = loop {
            let token = self.advance();
            match token.tok {
                Tok::LParen => depth += 1,
                Tok::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        break token;
                    }
                }
                Tok::Eof => {
                    return Err(self.error(
                        ErrorKind::UnexpectedEof,
                        "unterminated explicit expression; expected ')'",
                        open.start,
                        open.end,
                    ));
                }
                _ => {}
            }
        };

        self.expression(open.end, close.start)
    }

    /// `^name` extended by directly adjacent `.field`, `(args)` and
    /// `[index]`. Anything else, including whitespace, ends it.
    fn parse_implicit_expr(&mut self) -> Result<Node, ParseError> {
        let ident = self.advance();
        let start = ident.start;
        let mut end = ident.end;

        loop {
            let next = self.peek();
            if next.start != end {
                break;
            }
            match next.tok {
                Tok::Period => {
                    self.advance();
                    let field = self.peek();
                    if field.tok == Tok::Ident && field.start == next.end {
                        self.advance();
                        end = field.end;
                    } else {
                        // A trailing '.' is text
                        self.backup();
                        break;
                    }
                }
                Tok::LParen | Tok::LBrack => end = self.skip_balanced()?,
                _ => break,
            }
        }

        self.expression(start, end)
    }

    /// Consume a bracketed group starting at the lookahead token.
    fn skip_balanced(&mut self) -> Result<usize, ParseError> {
        let open = self.advance();
        let mut depth = 0usize;
        let mut token = open;
        loop {
            match token.tok {
                Tok::LParen | Tok::LBrack | Tok::LBrace => depth += 1,
                Tok::RParen | Tok::RBrack | Tok::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(token.end);
                    }
                }
                Tok::Eof => {
                    return Err(self.error(
                        ErrorKind::UnexpectedEof,
                        format!("unclosed '{}' in expression", open.lit),
                        open.start,
                        open.end,
                    ));
                }
                _ => {}
            }
            token = self.advance();
        }
    }

    fn expression(&mut self, start: usize, end: usize) -> Result<Node, ParseError> {
        let src = self.src;
        let text = &src[start..end];
        if !self.ctx.is_go_expression(text) {
            let message = if text.trim().is_empty() {
                "empty expression".to_string()
            } else {
                format!("'{text}' is not a valid Go expression")
            };
            return Err(self.error(ErrorKind::InvalidExpression, message, start, end));
        }
        Ok(Node::StrExpr(StrExprNode {
            expr: text.to_string(),
            span: self.ctx.span(start, end),
        }))
    }

    fn parse_import(&mut self, marker: usize) -> Result<Node, ParseError> {
        self.advance();
        let mut token = self.advance();
        let pkg_alias = match token.tok {
            Tok::Ident => {
                let alias = token.lit.to_string();
                token = self.advance();
                Some(alias)
            }
            Tok::Period => {
                token = self.advance();
                Some(".".to_string())
            }
            _ => None,
        };

        if token.tok != Tok::String {
            return Err(self
                .error(
                    ErrorKind::InvalidImport,
                    "expected an import path string",
                    token.start,
                    token.end.max(token.start + 1),
                )
                .with_help("write ^import \"path\", ^import name \"path\" or ^import . \"path\""));
        }

        let path = unquote(token.lit);
        if path.is_empty() {
            return Err(self.error(ErrorKind::InvalidImport, "empty import path", token.start, token.end));
        }

        Ok(Node::Import(ImportNode {
            decl: ImportDecl { pkg_alias, path },
            span: self.ctx.span(marker, token.end),
        }))
    }
}

/// Contents of a Go string literal.
fn unquote(lit: &str) -> String {
    if let Some(raw) = lit.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return raw.to_string();
    }
    let inner = lit
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lit);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other @ ('\\' | '"')) => out.push(other),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
