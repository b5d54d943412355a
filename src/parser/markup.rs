//! Markup sub-parser.
//!
//! Splits the buffer into text, tags and comments, builds elements, and
//! hands control to the code sub-parser at every `^`. Attribute names and
//! values containing a marker are split so that the start tag becomes a run
//! of literals and expressions.

use super::attrs::{self, LexedTag};
use super::{ParseContext, code};
use crate::ast::{Attr, ElementNode, LiteralNode, Node, StringPos, Tag};
use crate::error::{ErrorKind, ParseError};
use crate::html;

/// Offsets are relative to the context's text.
enum Token {
    StartTag { tag: LexedTag, start: usize },
    EndTag { name: String, start: usize, end: usize },
    /// Text, comments, doctypes and processing instructions
    Text { start: usize, end: usize },
    Eof,
}

#[derive(Debug, Clone, Copy)]
enum Mode<'t> {
    Data,
    /// Content of `script`, `style` and friends; ends at `</name`
    RawText(&'t str),
}

struct OpenElement<'t> {
    name: &'t str,
    start: usize,
    tag_end: usize,
}

pub(super) fn parse_document(ctx: &mut ParseContext<'_, '_>) -> Result<Vec<Node>, ParseError> {
    parse_nodes(ctx, None, Mode::Data)
}

/// Parse exactly one element, allowing leading whitespace. Used for the
/// body of `^if`, `^for` and `^partial` blocks.
pub(super) fn parse_block_element(ctx: &mut ParseContext<'_, '_>) -> Result<Node, ParseError> {
    let rest = ctx.rest();
    let skipped = rest.len() - rest.trim_start().len();
    ctx.set_offset(ctx.offset() + skipped);

    let start = ctx.offset();
    if ctx.at_end() {
        return Err(ctx.error(ErrorKind::UnclosedBlock, "unexpected end of input in block", start, start));
    }
    if !starts_start_tag(ctx.rest()) {
        let end = start + ctx.rest().chars().next().map_or(1, char::len_utf8);
        return Err(ctx
            .error(
                ErrorKind::InvalidBlock,
                "a block must contain a single element or a ^ construct",
                start,
                end,
            )
            .with_help("wrap text and sibling elements in <text>...</text>"));
    }

    match next_token(ctx, Mode::Data)? {
        Token::StartTag { tag, start } => parse_element(ctx, tag, start),
        _ => Err(ctx.error(ErrorKind::InvalidBlock, "expected an element", start, start + 1)),
    }
}

/// Handle the `^` at the cursor: `^^` is a literal marker, anything else
/// belongs to the code sub-parser.
pub(super) fn parse_transition(ctx: &mut ParseContext<'_, '_>) -> Result<Node, ParseError> {
    let at = ctx.offset();
    if ctx.rest().starts_with("^^") {
        ctx.set_offset(at + 2);
        return Ok(Node::Literal(LiteralNode {
            text: "^".to_string(),
            span: ctx.span(at, at + 2),
        }));
    }
    ctx.set_offset(at + 1);
    code::parse_code(ctx, at)
}

fn parse_nodes(
    ctx: &mut ParseContext<'_, '_>,
    open: Option<&OpenElement<'_>>,
    mode: Mode<'_>,
) -> Result<Vec<Node>, ParseError> {
    let mut nodes = Vec::new();
    loop {
        if ctx.rest().starts_with('^') {
            nodes.push(parse_transition(ctx)?);
            continue;
        }

        match next_token(ctx, mode)? {
            Token::Eof => {
                return match open {
                    None => Ok(nodes),
                    Some(el) => Err(ctx
                        .error(
                            ErrorKind::UnclosedElement,
                            format!("unclosed element <{}>", el.name),
                            el.start,
                            el.tag_end,
                        )
                        .with_help(format!("add '</{}>' to close it", el.name))),
                };
            }
            Token::Text { start, end } => push_literal(ctx, &mut nodes, start, end),
            Token::StartTag { tag, start } => nodes.push(parse_element(ctx, tag, start)?),
            Token::EndTag { name, start, end } => match open {
                // Stray end tags at the top level pass through untouched
                None => push_literal(ctx, &mut nodes, start, end),
                Some(el) if name.eq_ignore_ascii_case(el.name) => return Ok(nodes),
                Some(el) => {
                    return Err(ctx
                        .error(
                            ErrorKind::MismatchedCloseTag,
                            format!("mismatched close tag </{name}>, expected </{}>", el.name),
                            start,
                            end,
                        )
                        .with_related(ctx.span(el.start, el.tag_end), "opened here"));
                }
            },
        }
    }
}

fn parse_element(
    ctx: &mut ParseContext<'_, '_>,
    tag: LexedTag,
    start: usize,
) -> Result<Node, ParseError> {
    let tag_end = start + tag.len;
    let start_tag_nodes = split_start_tag(ctx, &tag, start, tag_end)?;
    let attrs = tag
        .attrs
        .into_iter()
        .map(|attr| rebase_attr(ctx, attr, start))
        .collect();
    let name = tag.name;

    if tag.self_closing || html::is_void_element(&name) {
        return Ok(Node::Element(ElementNode {
            tag: Tag { name, attrs },
            start_tag_nodes,
            children: Vec::new(),
            self_closing: true,
            span: ctx.span(start, tag_end),
        }));
    }

    let mode = if html::is_raw_text_element(&name) {
        Mode::RawText(&name)
    } else {
        Mode::Data
    };
    let open = OpenElement {
        name: &name,
        start,
        tag_end,
    };
    let children = parse_nodes(ctx, Some(&open), mode)?;

    Ok(Node::Element(ElementNode {
        tag: Tag { name, attrs },
        start_tag_nodes,
        children,
        self_closing: false,
        span: ctx.span(start, ctx.offset()),
    }))
}

fn rebase_attr(ctx: &ParseContext<'_, '_>, attr: Attr, tag_start: usize) -> Attr {
    let rebase = |pos: StringPos| {
        let span = ctx.span(tag_start + pos.start, tag_start + pos.end);
        StringPos {
            text: pos.text,
            start: span.start,
            end: span.end,
        }
    };
    Attr {
        name: rebase(attr.name),
        value: rebase(attr.value),
    }
}

/// Flatten the raw start tag into literals, splitting every attribute name
/// or value that contains a marker.
fn split_start_tag(
    ctx: &mut ParseContext<'_, '_>,
    tag: &LexedTag,
    start: usize,
    tag_end: usize,
) -> Result<Vec<Node>, ParseError> {
    let mut nodes = Vec::new();
    let mut cursor = start;
    for attr in &tag.attrs {
        let pieces = [
            (start + attr.name.start, start + attr.name.end),
            (start + attr.value.start, start + attr.value.end),
        ];
        for (piece_start, piece_end) in pieces {
            if !ctx.src()[piece_start..piece_end].contains('^') {
                continue;
            }
            push_literal(ctx, &mut nodes, cursor, piece_start);
            split_markers(ctx, piece_start, piece_end, &mut nodes)?;
            cursor = piece_end;
        }
    }
    push_literal(ctx, &mut nodes, cursor, tag_end);
    Ok(nodes)
}

fn split_markers(
    ctx: &mut ParseContext<'_, '_>,
    start: usize,
    end: usize,
    nodes: &mut Vec<Node>,
) -> Result<(), ParseError> {
    let mut sub = ctx.scoped(start, end);
    let mut literal_start = 0;
    while let Some(found) = sub.rest().find('^') {
        let at = sub.offset() + found;
        push_literal(&sub, nodes, literal_start, at);
        sub.set_offset(at);
        match parse_transition(&mut sub)? {
            node @ (Node::Literal(_) | Node::StrExpr(_)) => nodes.push(node),
            _ => {
                return Err(sub
                    .error(
                        ErrorKind::InvalidAttribute,
                        "only expressions are allowed inside attributes",
                        at,
                        at + 1,
                    )
                    .with_help("use ^name or ^(expression) here"));
            }
        }
        literal_start = sub.offset();
    }
    let len = sub.src().len();
    push_literal(&sub, nodes, literal_start, len);
    Ok(())
}

fn push_literal(ctx: &ParseContext<'_, '_>, nodes: &mut Vec<Node>, start: usize, end: usize) {
    if start < end {
        nodes.push(Node::Literal(LiteralNode {
            text: ctx.src()[start..end].to_string(),
            span: ctx.span(start, end),
        }));
    }
}

fn starts_start_tag(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.first() == Some(&b'<') && bytes.get(1).is_some_and(u8::is_ascii_alphabetic)
}

/// `<` that begins a tag, comment or declaration rather than text
fn is_tag_like(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    if bytes.first() != Some(&b'<') {
        return false;
    }
    match bytes.get(1) {
        Some(b) if b.is_ascii_alphabetic() => true,
        Some(b'!') | Some(b'?') => true,
        Some(b'/') => bytes.get(2).is_some_and(u8::is_ascii_alphabetic),
        _ => false,
    }
}

fn is_end_tag_of(rest: &str, name: &str) -> bool {
    let Some(after) = rest.strip_prefix("</") else {
        return false;
    };
    let Some(candidate) = after.get(..name.len()) else {
        return false;
    };
    candidate.eq_ignore_ascii_case(name)
        && match after.as_bytes().get(name.len()) {
            None => true,
            Some(b) => matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b'/' | b'>'),
        }
}

fn next_token(ctx: &mut ParseContext<'_, '_>, mode: Mode<'_>) -> Result<Token, ParseError> {
    let start = ctx.offset();
    let rest = ctx.rest();
    if rest.is_empty() {
        return Ok(Token::Eof);
    }

    let token = match mode {
        Mode::RawText(name) if is_end_tag_of(rest, name) => end_tag(ctx, start)?,
        Mode::RawText(name) => {
            let end = text_end(rest, |at| is_end_tag_of(at, name));
            Token::Text {
                start,
                end: start + end,
            }
        }
        Mode::Data if is_tag_like(rest) => tag(ctx, start)?,
        Mode::Data => {
            let end = text_end(rest, is_tag_like);
            Token::Text {
                start,
                end: start + end,
            }
        }
    };

    let end = match &token {
        Token::StartTag { tag, start } => start + tag.len,
        Token::EndTag { end, .. } | Token::Text { end, .. } => *end,
        Token::Eof => ctx.src().len(),
    };
    ctx.set_offset(end);
    Ok(token)
}

/// Length of the text run at the start of `rest`: up to the next marker or
/// the next position where `stops` holds. The first byte always belongs to
/// the run.
fn text_end(rest: &str, stops: impl Fn(&str) -> bool) -> usize {
    rest.char_indices()
        .skip(1)
        .find(|&(i, c)| c == '^' || (c == '<' && stops(&rest[i..])))
        .map_or(rest.len(), |(i, _)| i)
}

fn tag(ctx: &mut ParseContext<'_, '_>, start: usize) -> Result<Token, ParseError> {
    let rest = ctx.rest();

    if let Some(body) = rest.strip_prefix("<!--") {
        return match body.find("-->") {
            Some(close) => Ok(Token::Text {
                start,
                end: start + 4 + close + 3,
            }),
            None => Err(ctx.error(ErrorKind::UnterminatedComment, "unterminated comment", start, start + 4)),
        };
    }
    if rest.starts_with("<!") || rest.starts_with("<?") {
        return match rest.find('>') {
            Some(close) => Ok(Token::Text {
                start,
                end: start + close + 1,
            }),
            None => Err(ctx.error(ErrorKind::UnterminatedTag, "unterminated declaration", start, start + 2)),
        };
    }
    if rest.starts_with("</") {
        return end_tag(ctx, start);
    }

    let tag = attrs::lex_tag(rest)
        .map_err(|err| ctx.error(ErrorKind::UnexpectedToken, err.to_string(), start, start + 1))?;
    if tag.is_unterminated() {
        return Err(ctx
            .error(
                ErrorKind::UnterminatedTag,
                format!("unterminated start tag <{}>", tag.name),
                start,
                start + 1 + tag.name.len(),
            )
            .with_help("add the closing '>'"));
    }
    ctx.report(start, &tag.diagnostics);
    Ok(Token::StartTag { tag, start })
}

fn end_tag(ctx: &ParseContext<'_, '_>, start: usize) -> Result<Token, ParseError> {
    let rest = ctx.rest();
    let after = &rest[2..];
    let name_len = after
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(after.len());
    let name = after[..name_len].to_string();
    match rest.find('>') {
        Some(close) => Ok(Token::EndTag {
            name,
            start,
            end: start + close + 1,
        }),
        None => Err(ctx.error(
            ErrorKind::UnterminatedTag,
            format!("unterminated end tag </{name}>"),
            start,
            start + 2 + name_len,
        )),
    }
}
