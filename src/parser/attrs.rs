//! Attribute lexer.
//!
//! A reduced version of the HTML tag tokenizer states. It reads one start
//! (or self-closing) tag and reports every attribute with the byte range its
//! name and value occupy in the raw tag text, which is what lets the markup
//! parser split attribute values around embedded expressions.
//!
//! Malformed input is reported as advisory [`LexDiagnostic`]s and lexing
//! carries on the way a browser would. Only a missing `<` or tag name is a
//! hard failure.

use serde::Serialize;
use thiserror::Error;

use super::entities::{self, NumericIssue};
use crate::ast::{Attr, StringPos};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LexErrorKind {
    DuplicateAttribute,
    MissingWhitespaceBetweenAttributes,
    UnexpectedCharacterInAttributeName,
    UnexpectedCharacterInUnquotedAttributeValue,
    UnexpectedEqualsSignBeforeAttributeName,
    MissingAttributeValue,
    UnexpectedSolidusInTag,
    EofInTag,
    MissingSemicolonAfterCharacterReference,
    UnknownNamedCharacterReference,
    AbsenceOfDigitsInNumericCharacterReference,
    NullCharacterReference,
    CharacterReferenceOutsideUnicodeRange,
    SurrogateCharacterReference,
    NoncharacterCharacterReference,
    ControlCharacterReference,
}

impl LexErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LexErrorKind::DuplicateAttribute => "duplicate-attribute",
            LexErrorKind::MissingWhitespaceBetweenAttributes => {
                "missing-whitespace-between-attributes"
            }
            LexErrorKind::UnexpectedCharacterInAttributeName => {
                "unexpected-character-in-attribute-name"
            }
            LexErrorKind::UnexpectedCharacterInUnquotedAttributeValue => {
                "unexpected-character-in-unquoted-attribute-value"
            }
            LexErrorKind::UnexpectedEqualsSignBeforeAttributeName => {
                "unexpected-equals-sign-before-attribute-name"
            }
            LexErrorKind::MissingAttributeValue => "missing-attribute-value",
            LexErrorKind::UnexpectedSolidusInTag => "unexpected-solidus-in-tag",
            LexErrorKind::EofInTag => "eof-in-tag",
            LexErrorKind::MissingSemicolonAfterCharacterReference => {
                "missing-semicolon-after-character-reference"
            }
            LexErrorKind::UnknownNamedCharacterReference => "unknown-named-character-reference",
            LexErrorKind::AbsenceOfDigitsInNumericCharacterReference => {
                "absence-of-digits-in-numeric-character-reference"
            }
            LexErrorKind::NullCharacterReference => "null-character-reference",
            LexErrorKind::CharacterReferenceOutsideUnicodeRange => {
                "character-reference-outside-unicode-range"
            }
            LexErrorKind::SurrogateCharacterReference => "surrogate-character-reference",
            LexErrorKind::NoncharacterCharacterReference => "noncharacter-character-reference",
            LexErrorKind::ControlCharacterReference => "control-character-reference",
        }
    }
}

impl From<NumericIssue> for LexErrorKind {
    fn from(issue: NumericIssue) -> Self {
        match issue {
            NumericIssue::Null => LexErrorKind::NullCharacterReference,
            NumericIssue::OutsideUnicodeRange => LexErrorKind::CharacterReferenceOutsideUnicodeRange,
            NumericIssue::Surrogate => LexErrorKind::SurrogateCharacterReference,
            NumericIssue::Noncharacter => LexErrorKind::NoncharacterCharacterReference,
            NumericIssue::Control => LexErrorKind::ControlCharacterReference,
        }
    }
}

/// Advisory problem found while lexing a tag. Offsets are relative to the
/// text handed to the lexer until the parser rebases them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LexDiagnostic {
    pub kind: LexErrorKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagLexError {
    #[error("tag must start with '<'")]
    MissingOpenAngle,
    #[error("expected a tag name after '<'")]
    MissingTagName,
}

/// Result of lexing one tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexedTag {
    pub name: String,
    pub attrs: Vec<Attr>,
    pub self_closing: bool,
    /// Bytes consumed, including the closing `>` when present
    pub len: usize,
    pub diagnostics: Vec<LexDiagnostic>,
}

impl LexedTag {
    /// Whether the input ended before the closing `>`.
    pub fn is_unterminated(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind == LexErrorKind::EofInTag)
    }
}

/// Lex the tag at the start of `raw`. Lexing stops after the tag's `>`, so
/// `raw` may continue past it. Empty input yields an empty tag.
pub fn lex_tag(raw: &str) -> Result<LexedTag, TagLexError> {
    if raw.is_empty() {
        return Ok(LexedTag::default());
    }
    TagLexer::new(raw).run()
}

/// Attributes of the tag at the start of `raw`.
pub fn lex_attributes(raw: &str) -> Result<Vec<Attr>, TagLexError> {
    lex_tag(raw).map(|tag| tag.attrs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    TagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    AfterAttributeValueQuoted,
    SelfClosingStartTag,
}

#[derive(Debug, Default)]
struct PendingAttr {
    name: String,
    name_start: usize,
    name_end: usize,
    value: String,
    value_start: Option<usize>,
    value_end: usize,
}

struct TagLexer<'a> {
    raw: &'a str,
    pos: usize,
    state: State,
    name: String,
    attrs: Vec<Attr>,
    current: Option<PendingAttr>,
    self_closing: bool,
    diagnostics: Vec<LexDiagnostic>,
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

impl<'a> TagLexer<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            raw,
            pos: 0,
            state: State::TagName,
            name: String::new(),
            attrs: Vec::new(),
            current: None,
            self_closing: false,
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.raw[self.pos..].chars().next()
    }

    fn bump(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    fn report(&mut self, kind: LexErrorKind, offset: usize) {
        self.diagnostics.push(LexDiagnostic { kind, offset });
    }

    fn run(mut self) -> Result<LexedTag, TagLexError> {
        if !self.raw.starts_with('<') {
            return Err(TagLexError::MissingOpenAngle);
        }
        self.pos = 1;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => {}
            _ => return Err(TagLexError::MissingTagName),
        }

        loop {
            let c = self.peek();
            match self.state {
                State::TagName => match c {
                    None => break self.eof_in_tag(),
                    Some(c) if is_whitespace(c) => {
                        self.bump(c);
                        self.state = State::BeforeAttributeName;
                    }
                    Some('/') => {
                        self.pos += 1;
                        self.state = State::SelfClosingStartTag;
                    }
                    Some('>') => {
                        self.pos += 1;
                        break;
                    }
                    Some(c) => {
                        self.name.push(c);
                        self.bump(c);
                    }
                },

                State::BeforeAttributeName => match c {
                    Some(c) if is_whitespace(c) => self.bump(c),
                    None | Some('/') | Some('>') => self.state = State::AfterAttributeName,
                    Some('=') => {
                        self.report(LexErrorKind::UnexpectedEqualsSignBeforeAttributeName, self.pos);
                        self.start_attr();
                        self.push_name('=');
                        self.pos += 1;
                        self.state = State::AttributeName;
                    }
                    Some(_) => {
                        self.start_attr();
                        self.state = State::AttributeName;
                    }
                },

                State::AttributeName => match c {
                    None | Some('/') | Some('>') => {
                        self.finish_name();
                        self.state = State::AfterAttributeName;
                    }
                    Some(c) if is_whitespace(c) => {
                        self.finish_name();
                        self.state = State::AfterAttributeName;
                    }
                    Some('=') => {
                        self.finish_name();
                        self.pos += 1;
                        self.state = State::BeforeAttributeValue;
                    }
                    Some(c) => {
                        if matches!(c, '"' | '\'' | '<') {
                            self.report(LexErrorKind::UnexpectedCharacterInAttributeName, self.pos);
                        }
                        self.push_name(c);
                        self.bump(c);
                    }
                },

                State::AfterAttributeName => match c {
                    Some(c) if is_whitespace(c) => self.bump(c),
                    Some('/') => {
                        self.emit_attr();
                        self.pos += 1;
                        self.state = State::SelfClosingStartTag;
                    }
                    Some('=') => {
                        self.pos += 1;
                        self.state = State::BeforeAttributeValue;
                    }
                    Some('>') => {
                        self.emit_attr();
                        self.pos += 1;
                        break;
                    }
                    None => {
                        self.emit_attr();
                        break self.eof_in_tag();
                    }
                    Some(_) => {
                        self.emit_attr();
                        self.start_attr();
                        self.state = State::AttributeName;
                    }
                },

                State::BeforeAttributeValue => match c {
                    Some(c) if is_whitespace(c) => self.bump(c),
                    Some('"') => {
                        self.pos += 1;
                        self.start_value();
                        self.state = State::AttributeValueDoubleQuoted;
                    }
                    Some('\'') => {
                        self.pos += 1;
                        self.start_value();
                        self.state = State::AttributeValueSingleQuoted;
                    }
                    Some('>') => {
                        self.report(LexErrorKind::MissingAttributeValue, self.pos);
                        self.emit_attr();
                        self.pos += 1;
                        break;
                    }
                    _ => {
                        self.start_value();
                        self.state = State::AttributeValueUnquoted;
                    }
                },

                State::AttributeValueDoubleQuoted | State::AttributeValueSingleQuoted => {
                    let quote = if self.state == State::AttributeValueDoubleQuoted {
                        '"'
                    } else {
                        '\''
                    };
                    match c {
                        Some(c) if c == quote => {
                            self.end_value();
                            self.pos += 1;
                            self.state = State::AfterAttributeValueQuoted;
                        }
                        Some('&') => self.character_reference(),
                        None => {
                            self.end_value();
                            self.emit_attr();
                            break self.eof_in_tag();
                        }
                        Some(c) => {
                            self.push_value(c);
                            self.bump(c);
                        }
                    }
                }

                State::AttributeValueUnquoted => match c {
                    Some(c) if is_whitespace(c) => {
                        self.end_value();
                        self.emit_attr();
                        self.bump(c);
                        self.state = State::BeforeAttributeName;
                    }
                    Some('&') => self.character_reference(),
                    Some('>') => {
                        self.end_value();
                        self.emit_attr();
                        self.pos += 1;
                        break;
                    }
                    None => {
                        self.end_value();
                        self.emit_attr();
                        break self.eof_in_tag();
                    }
                    Some(c) => {
                        if matches!(c, '"' | '\'' | '<' | '=' | '`') {
                            self.report(
                                LexErrorKind::UnexpectedCharacterInUnquotedAttributeValue,
                                self.pos,
                            );
                        }
                        self.push_value(c);
                        self.bump(c);
                    }
                },

                State::AfterAttributeValueQuoted => match c {
                    Some(c) if is_whitespace(c) => {
                        self.emit_attr();
                        self.bump(c);
                        self.state = State::BeforeAttributeName;
                    }
                    Some('/') => {
                        self.emit_attr();
                        self.pos += 1;
                        self.state = State::SelfClosingStartTag;
                    }
                    Some('>') => {
                        self.emit_attr();
                        self.pos += 1;
                        break;
                    }
                    None => {
                        self.emit_attr();
                        break self.eof_in_tag();
                    }
                    Some(_) => {
                        self.emit_attr();
                        self.report(LexErrorKind::MissingWhitespaceBetweenAttributes, self.pos);
                        self.state = State::BeforeAttributeName;
                    }
                },

                State::SelfClosingStartTag => match c {
                    Some('>') => {
                        self.self_closing = true;
                        self.pos += 1;
                        break;
                    }
                    None => break self.eof_in_tag(),
                    Some(_) => {
                        self.report(LexErrorKind::UnexpectedSolidusInTag, self.pos);
                        self.state = State::BeforeAttributeName;
                    }
                },
            }
        }

        Ok(LexedTag {
            name: self.name,
            attrs: self.attrs,
            self_closing: self.self_closing,
            len: self.pos,
            diagnostics: self.diagnostics,
        })
    }

    fn eof_in_tag(&mut self) {
        self.report(LexErrorKind::EofInTag, self.pos);
    }

    fn start_attr(&mut self) {
        self.current = Some(PendingAttr {
            name_start: self.pos,
            name_end: self.pos,
            ..PendingAttr::default()
        });
    }

    fn push_name(&mut self, c: char) {
        if let Some(attr) = &mut self.current {
            attr.name.push(c);
        }
    }

    fn finish_name(&mut self) {
        let Some(attr) = &mut self.current else {
            return;
        };
        attr.name_end = self.pos;
        let name_start = attr.name_start;
        let duplicate = self
            .attrs
            .iter()
            .any(|existing| existing.name.text.eq_ignore_ascii_case(&attr.name));
        if duplicate {
            self.report(LexErrorKind::DuplicateAttribute, name_start);
        }
    }

    fn start_value(&mut self) {
        let pos = self.pos;
        if let Some(attr) = &mut self.current {
            attr.value_start = Some(pos);
            attr.value_end = pos;
        }
    }

    fn push_value(&mut self, c: char) {
        if let Some(attr) = &mut self.current {
            attr.value.push(c);
        }
    }

    fn push_value_str(&mut self, s: &str) {
        if let Some(attr) = &mut self.current {
            attr.value.push_str(s);
        }
    }

    fn end_value(&mut self) {
        let pos = self.pos;
        if let Some(attr) = &mut self.current {
            attr.value_end = pos;
        }
    }

    fn emit_attr(&mut self) {
        let Some(attr) = self.current.take() else {
            return;
        };
        // A valueless attribute gets an empty value at the end of its name.
        let (value_start, value_end) = match attr.value_start {
            Some(start) => (start, attr.value_end),
            None => (attr.name_end, attr.name_end),
        };
        self.attrs.push(Attr {
            name: StringPos {
                text: attr.name,
                start: attr.name_start,
                end: attr.name_end,
            },
            value: StringPos {
                text: attr.value,
                start: value_start,
                end: value_end,
            },
        });
    }

    /// Decode a character reference at `&` inside an attribute value.
    fn character_reference(&mut self) {
        let amp = self.pos;
        self.pos += 1;
        let rest = &self.raw[self.pos..];
        match rest.chars().next() {
            Some('#') => self.numeric_reference(amp),
            Some(c) if c.is_ascii_alphanumeric() => self.named_reference(amp),
            _ => self.push_value('&'),
        }
    }

    fn named_reference(&mut self, amp: usize) {
        let rest = &self.raw[self.pos..];
        match entities::lookup_named(rest) {
            Some((len, value)) => {
                let matched = &rest[..len];
                let next = rest[len..].chars().next();
                if !matched.ends_with(';') {
                    // Legacy bare references inside attribute values stay
                    // literal when followed by `=` or an alphanumeric.
                    if matches!(next, Some(c) if c == '=' || c.is_ascii_alphanumeric()) {
                        self.push_value('&');
                        self.push_value_str(matched);
                        self.pos += len;
                        return;
                    }
                    self.report(LexErrorKind::MissingSemicolonAfterCharacterReference, amp);
                }
                self.push_value_str(&value);
                self.pos += len;
            }
            None => {
                let run = rest
                    .find(|c: char| !c.is_ascii_alphanumeric())
                    .unwrap_or(rest.len());
                if rest[run..].starts_with(';') {
                    self.report(LexErrorKind::UnknownNamedCharacterReference, amp);
                }
                self.push_value('&');
                self.push_value_str(&rest[..run]);
                self.pos += run;
            }
        }
    }

    fn numeric_reference(&mut self, amp: usize) {
        // Skip '#'
        self.pos += 1;
        let mut prefix = String::from("&#");
        let hex = matches!(self.peek(), Some('x' | 'X'));
        if hex {
            if let Some(x) = self.peek() {
                prefix.push(x);
            }
            self.pos += 1;
        }

        let rest = &self.raw[self.pos..];
        let digits_len = rest
            .find(|c: char| if hex { !c.is_ascii_hexdigit() } else { !c.is_ascii_digit() })
            .unwrap_or(rest.len());
        if digits_len == 0 {
            self.report(LexErrorKind::AbsenceOfDigitsInNumericCharacterReference, amp);
            self.push_value_str(&prefix);
            return;
        }

        let digits = &rest[..digits_len];
        let radix = if hex { 16 } else { 10 };
        let code = digits.chars().fold(0u32, |acc, c| {
            let digit = c.to_digit(radix).unwrap_or(0);
            acc.saturating_mul(radix).saturating_add(digit)
        });
        self.pos += digits_len;

        if self.peek() == Some(';') {
            self.pos += 1;
        } else {
            self.report(LexErrorKind::MissingSemicolonAfterCharacterReference, amp);
        }

        let (c, issue) = entities::resolve_numeric(code);
        if let Some(issue) = issue {
            self.report(issue.into(), amp);
        }
        self.push_value(c);
    }
}
