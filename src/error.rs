use std::path::PathBuf;

use thiserror::Error;

use crate::ast::Span;
use crate::parser::positions::{line_col, line_text};

/// Kind of parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnclosedElement,
    UnclosedBlock,
    UnterminatedTag,
    UnterminatedComment,
    MismatchedCloseTag,
    UnexpectedToken,
    UnexpectedEof,
    InvalidExpression,
    InvalidBlock,
    InvalidAttribute,
    InvalidImport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnclosedElement => "Unclosed element",
            ErrorKind::UnclosedBlock => "Unclosed block",
            ErrorKind::UnterminatedTag => "Unterminated tag",
            ErrorKind::UnterminatedComment => "Unterminated comment",
            ErrorKind::MismatchedCloseTag => "Mismatched close tag",
            ErrorKind::UnexpectedToken => "Unexpected token",
            ErrorKind::UnexpectedEof => "Unexpected end of input",
            ErrorKind::InvalidExpression => "Invalid expression",
            ErrorKind::InvalidBlock => "Invalid block",
            ErrorKind::InvalidAttribute => "Invalid attribute",
            ErrorKind::InvalidImport => "Invalid import",
        }
    }
}

/// Syntax error in a template
#[derive(Debug, Clone, Error)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    /// 1-based line of `span.start`
    pub line: usize,
    /// 1-based byte column of `span.start`
    pub column: usize,
    pub related_span: Option<Span>,
    pub related_label: Option<String>,
    pub help: Option<String>,
}

impl ParseError {
    /// Create a new parse error; line and column are resolved against `source`
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span, source: &str) -> Self {
        let (line, column) = line_col(source, span.start);
        Self {
            kind,
            message: message.into(),
            span,
            line,
            column,
            related_span: None,
            related_label: None,
            help: None,
        }
    }

    /// Add a related span with a label (e.g., "opened here")
    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related_span = Some(span);
        self.related_label = Some(label.into());
        self
    }

    /// Add help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render the error with source context
    pub fn render(&self, source: &str, filename: &str) -> String {
        Report::from_parse(self).render(source, filename, false)
    }

    /// Render the error with ANSI color codes
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        Report::from_parse(self).render(source, filename, true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantKind {
    DuplicateHandler,
    NestedHandler,
    DuplicatePartial,
}

/// A well-formed template that breaks a page-level rule
#[derive(Debug, Clone, Error)]
#[error("{line}:{column}: {message}")]
pub struct InvariantError {
    pub kind: InvariantKind,
    pub message: String,
    pub span: Span,
    pub line: usize,
    pub column: usize,
    pub related_span: Option<Span>,
}

impl InvariantError {
    pub fn new(kind: InvariantKind, message: impl Into<String>, span: Span, source: &str) -> Self {
        let (line, column) = line_col(source, span.start);
        Self {
            kind,
            message: message.into(),
            span,
            line,
            column,
            related_span: None,
        }
    }

    pub fn with_related(mut self, span: Span) -> Self {
        self.related_span = Some(span);
        self
    }

    pub fn render(&self, source: &str, filename: &str) -> String {
        Report::from_invariant(self).render(source, filename, false)
    }

    pub fn render_color(&self, source: &str, filename: &str) -> String {
        Report::from_invariant(self).render(source, filename, true)
    }
}

/// Error during compilation
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Invariant(#[from] InvariantError),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }

    /// Render the error with source context (no color)
    pub fn render(&self, source: &str, filename: &str) -> String {
        match self {
            CompileError::Parse(err) => err.render(source, filename),
            CompileError::Invariant(err) => err.render(source, filename),
            CompileError::Io { .. } => format!("error: {self}\n"),
        }
    }

    /// Render the error with ANSI color codes
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        match self {
            CompileError::Parse(err) => err.render_color(source, filename),
            CompileError::Invariant(err) => err.render_color(source, filename),
            CompileError::Io { .. } => format!("\x1b[1;31merror:\x1b[0m {self}\n"),
        }
    }
}

/// Common shape of everything that renders with a source excerpt
struct Report<'e> {
    label: &'static str,
    message: &'e str,
    span: Span,
    related: Option<(Span, &'e str)>,
    help: Option<&'e str>,
}

impl<'e> Report<'e> {
    fn from_parse(err: &'e ParseError) -> Self {
        Self {
            label: "error",
            message: &err.message,
            span: err.span,
            related: err
                .related_span
                .map(|span| (span, err.related_label.as_deref().unwrap_or("opened here"))),
            help: err.help.as_deref(),
        }
    }

    fn from_invariant(err: &'e InvariantError) -> Self {
        Self {
            label: "build error",
            message: &err.message,
            span: err.span,
            related: err.related_span.map(|span| (span, "first defined here")),
            help: None,
        }
    }

    fn render(&self, source: &str, filename: &str, color: bool) -> String {
        // Visual hierarchy: red for errors only, dim for structural chrome
        let red = if color { "\x1b[1;31m" } else { "" };
        let dim = if color { "\x1b[2m" } else { "" };
        let cyan = if color { "\x1b[1;38;5;73m" } else { "" };
        let reset = if color { "\x1b[0m" } else { "" };

        let mut output = String::from("\n");

        let (line, column) = line_col(source, self.span.start);
        output.push_str(&format!(" {dim}file:{reset} {filename}:{line}:{column}\n"));

        let message = if color {
            highlight_quoted(self.message)
        } else {
            self.message.to_string()
        };
        output.push_str(&format!("{red}{}:{reset} {message}\n", self.label));

        excerpt(&mut output, source, self.span, None, color);
        if let Some((span, label)) = self.related {
            excerpt(&mut output, source, span, Some(label), color);
        }

        if let Some(help) = self.help {
            output.push('\n');
            for (i, help_line) in help.lines().enumerate() {
                let content = if color {
                    highlight_quoted(help_line)
                } else {
                    help_line.to_string()
                };
                if i == 0 {
                    output.push_str(&format!(" {cyan}help:{reset} {content}\n"));
                } else {
                    output.push_str(&format!("       {content}\n"));
                }
            }
        }

        output.push('\n');
        output
    }
}

/// Source line plus caret underline. A `label` marks secondary context.
fn excerpt(output: &mut String, source: &str, span: Span, label: Option<&str>, color: bool) {
    let red = if color { "\x1b[1;31m" } else { "" };
    let dim = if color { "\x1b[2m" } else { "" };
    let reset = if color { "\x1b[0m" } else { "" };

    let (line, column) = line_col(source, span.start);
    let text = line_text(source, span.start);
    let width = line.to_string().len().max(2);

    if label.is_none() {
        output.push_str(&format!("{dim}{:>width$} |{reset}\n", ""));
    }
    output.push_str(&format!("{dim}{line:>width$} |{reset} {text}\n"));

    let underline_start = column - 1;
    let underline_len = span
        .len()
        .min(text.len().saturating_sub(underline_start))
        .max(1);
    let spaces = " ".repeat(underline_start);
    let carets = "^".repeat(underline_len);
    match label {
        None => output.push_str(&format!("{dim}{:>width$} |{reset} {spaces}{red}{carets}{reset}\n", "")),
        Some(label) => output.push_str(&format!(
            "{dim}{:>width$} |{reset} {spaces}{dim}{carets} {label}{reset}\n",
            ""
        )),
    }
}

/// Highlight `'quoted'` fragments in prose (error messages, help text)
fn highlight_quoted(text: &str) -> String {
    const CODE: &str = "\x1b[38;5;180m";
    const RESET: &str = "\x1b[0m";

    let mut result = String::with_capacity(text.len());
    let mut parts = text.split('\'');
    if let Some(first) = parts.next() {
        result.push_str(first);
    }
    for (i, part) in parts.enumerate() {
        if i % 2 == 0 {
            result.push_str(&format!("'{CODE}{part}{RESET}"));
        } else {
            result.push('\'');
            result.push_str(part);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_line_col_message() {
        let source = "<p>\n  ^if {\n";
        let err = ParseError::new(ErrorKind::UnexpectedToken, "missing condition", Span::new(8, 9), source);
        assert_eq!((err.line, err.column), (2, 5));
        assert_eq!(err.to_string(), "2:5: missing condition");
    }

    #[test]
    fn test_render_points_at_span() {
        let source = "<div>\n<p>^(x +)</p>\n</div>";
        let start = source.find("x +").unwrap();
        let err = ParseError::new(
            ErrorKind::InvalidExpression,
            "'x +' is not a valid Go expression",
            Span::new(start, start + 3),
            source,
        )
        .with_help("check the expression between the parentheses");
        let rendered = err.render(source, "index.up");
        assert!(rendered.contains(" file: index.up:2:6\n"));
        assert!(rendered.contains("error: 'x +' is not a valid Go expression\n"));
        assert!(rendered.contains(" 2 | <p>^(x +)</p>\n"));
        assert!(rendered.contains("   |      ^^^\n"));
        assert!(rendered.contains(" help: check the expression"));
    }

    #[test]
    fn test_compile_error_is_transparent() {
        let source = "^handler {}\n^handler {}";
        let err: CompileError =
            InvariantError::new(InvariantKind::DuplicateHandler, "only one handler is allowed", Span::new(12, 23), source)
                .into();
        assert_eq!(err.to_string(), "2:1: only one handler is allowed");
        assert!(err.render(source, "a.up").contains("build error: only one handler"));
    }

    #[test]
    fn test_highlight_quoted() {
        let highlighted = highlight_quoted("expected '}' here");
        assert_eq!(highlighted, "expected '\x1b[38;5;180m}\x1b[0m' here");
    }
}
