pub mod attrs;
mod code;
pub mod entities;
pub mod go_syntax;
mod markup;
pub mod positions;
pub mod scanner;

use std::sync::Arc;

use crate::ast::{Ast, Span};
use crate::error::{ErrorKind, ParseError};
use attrs::LexDiagnostic;
use go_syntax::GoSyntax;

/// Parser trait - converts source code to AST
pub trait Parser {
    fn parse(&self, source: &str) -> Result<Ast, ParseError>;
}

/// Template parser: markup with `^`-prefixed Go
pub struct UpParser {
    // Configuration only, no state
}

impl UpParser {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for UpParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for UpParser {
    fn parse(&self, source: &str) -> Result<Ast, ParseError> {
        let mut session = Session::new(source);
        let nodes = {
            let mut ctx = ParseContext::new(source, &mut session);
            markup::parse_document(&mut ctx)?
        };

        for diagnostic in &session.diagnostics {
            let (line, column) = positions::line_col(source, diagnostic.offset);
            tracing::warn!(kind = diagnostic.kind.as_str(), line, column, "attribute lexer diagnostic");
        }

        Ok(Ast::new(nodes, Arc::from(source), session.diagnostics))
    }
}

/// State shared by every context of one parse
pub(crate) struct Session<'a> {
    root: &'a str,
    go: GoSyntax,
    diagnostics: Vec<LexDiagnostic>,
}

impl<'a> Session<'a> {
    fn new(root: &'a str) -> Self {
        Self {
            root,
            go: GoSyntax::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// The cursor both sub-parsers advance.
///
/// `src` is the text being parsed and `offset` indexes into it. A nested
/// context (see [`ParseContext::scoped`]) covers a slice of its parent's
/// text; `base` maps its offsets back to the original source.
pub(crate) struct ParseContext<'a, 's> {
    src: &'a str,
    base: usize,
    offset: usize,
    session: &'s mut Session<'a>,
}

impl<'a, 's> ParseContext<'a, 's> {
    fn new(src: &'a str, session: &'s mut Session<'a>) -> Self {
        Self {
            src,
            base: 0,
            offset: 0,
            session,
        }
    }

    /// Context over `src[start..end]` sharing this parse's session.
    pub(crate) fn scoped(&mut self, start: usize, end: usize) -> ParseContext<'a, '_> {
        ParseContext {
            src: &self.src[start..end],
            base: self.base + start,
            offset: 0,
            session: &mut *self.session,
        }
    }

    pub(crate) fn src(&self) -> &'a str {
        self.src
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn set_offset(&mut self, offset: usize) {
        self.offset = offset.min(self.src.len());
    }

    pub(crate) fn rest(&self) -> &'a str {
        &self.src[self.offset..]
    }

    pub(crate) fn at_end(&self) -> bool {
        self.offset >= self.src.len()
    }

    /// Absolute source span for a range of this context's text.
    pub(crate) fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.base + start, self.base + end)
    }

    pub(crate) fn error(
        &self,
        kind: ErrorKind,
        message: impl Into<String>,
        start: usize,
        end: usize,
    ) -> ParseError {
        ParseError::new(kind, message, self.span(start, end), self.session.root)
    }

    pub(crate) fn is_go_expression(&mut self, text: &str) -> bool {
        self.session.go.is_expression(text)
    }

    /// Record lexer diagnostics found in text starting at `start`.
    pub(crate) fn report(&mut self, start: usize, diagnostics: &[LexDiagnostic]) {
        let base = self.base + start;
        self.session
            .diagnostics
            .extend(diagnostics.iter().map(|d| LexDiagnostic {
                kind: d.kind,
                offset: base + d.offset,
            }));
    }
}

#[cfg(test)]
mod tests;
