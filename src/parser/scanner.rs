//! Go token scanner used by the code sub-parser.
//!
//! It works on the same buffer as the markup sub-parser and reports byte
//! offsets into it, so either side can pick up where the other stopped.
//! Whitespace and comments are skipped, no automatic semicolons are
//! inserted, and scanning never fails: anything unrecognizable comes back as
//! [`Tok::Illegal`] and the parser decides what to do with it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tok {
    Eof,
    Illegal,
    Ident,
    Keyword,
    Int,
    Float,
    Imag,
    Char,
    String,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Period,
    Comma,
    Semicolon,
    Colon,
    Ellipsis,
    /// `^`, which is also the transition marker
    Xor,
    /// `<`, which also starts markup
    Lss,
    /// Every other operator
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub tok: Tok,
    pub start: usize,
    pub end: usize,
    pub lit: &'a str,
}

impl Token<'_> {
    pub fn is_keyword(&self, word: &str) -> bool {
        self.tok == Tok::Keyword && self.lit == word
    }

    pub fn is_ident(&self, word: &str) -> bool {
        self.tok == Tok::Ident && self.lit == word
    }
}

const KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// Multi-character operators, longest first.
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "&^=", "&&", "||", "<-", "++", "--", "==", "!=", "<=", ">=", ":=", "+=", "-=",
    "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", "&^",
];

pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Start scanning `src` at byte offset `pos`.
    pub fn new(src: &'a str, pos: usize) -> Self {
        Self {
            src,
            pos: pos.min(src.len()),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn token(&self, tok: Tok, start: usize) -> Token<'a> {
        Token {
            tok,
            start,
            end: self.pos,
            lit: &self.src[start..self.pos],
        }
    }

    /// Skip whitespace and comments. Returns false if a block comment ran
    /// off the end of the input.
    fn skip_trivia(&mut self) -> bool {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start_matches([' ', '\t', '\n', '\r']);
            self.pos += rest.len() - trimmed.len();

            if trimmed.starts_with("//") {
                self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
            } else if let Some(body) = trimmed.strip_prefix("/*") {
                match body.find("*/") {
                    Some(end) => self.pos += 2 + end + 2,
                    None => return false,
                }
            } else {
                return true;
            }
        }
    }

    pub fn next_token(&mut self) -> Token<'a> {
        if !self.skip_trivia() {
            let start = self.pos;
            self.pos = self.src.len();
            return self.token(Tok::Illegal, start);
        }

        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return self.token(Tok::Eof, start);
        };

        if c == '_' || c.is_alphabetic() {
            let len = self
                .rest()
                .find(|c: char| !(c == '_' || c.is_alphanumeric()))
                .unwrap_or(self.rest().len());
            self.pos += len;
            let word = &self.src[start..self.pos];
            let tok = if KEYWORDS.contains(&word) {
                Tok::Keyword
            } else {
                Tok::Ident
            };
            return self.token(tok, start);
        }

        let next_is_digit = self.rest()[c.len_utf8()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit());
        if c.is_ascii_digit() || (c == '.' && next_is_digit) {
            return self.number(start);
        }

        match c {
            '"' => return self.quoted(start, '"', Tok::String),
            '\'' => return self.quoted(start, '\'', Tok::Char),
            '`' => {
                return match self.rest()[1..].find('`') {
                    Some(end) => {
                        self.pos += end + 2;
                        self.token(Tok::String, start)
                    }
                    None => {
                        self.pos = self.src.len();
                        self.token(Tok::Illegal, start)
                    }
                };
            }
            _ => {}
        }

        if self.rest().starts_with("...") {
            self.pos += 3;
            return self.token(Tok::Ellipsis, start);
        }
        if let Some(op) = OPERATORS.iter().find(|op| self.rest().starts_with(**op)) {
            self.pos += op.len();
            return self.token(Tok::Operator, start);
        }

        self.pos += c.len_utf8();
        let tok = match c {
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '[' => Tok::LBrack,
            ']' => Tok::RBrack,
            '{' => Tok::LBrace,
            '}' => Tok::RBrace,
            '.' => Tok::Period,
            ',' => Tok::Comma,
            ';' => Tok::Semicolon,
            ':' => Tok::Colon,
            '^' => Tok::Xor,
            '<' => Tok::Lss,
            '+' | '-' | '*' | '/' | '%' | '&' | '|' | '>' | '=' | '!' | '~' => Tok::Operator,
            _ => Tok::Illegal,
        };
        self.token(tok, start)
    }

    fn number(&mut self, start: usize) -> Token<'a> {
        let bytes = self.src.as_bytes();
        let hex = self.rest().starts_with("0x") || self.rest().starts_with("0X");
        let mut float = false;
        let mut i = self.pos;
        while i < bytes.len() {
            let b = bytes[i];
            let exponent = if hex {
                matches!(b, b'p' | b'P')
            } else {
                matches!(b, b'e' | b'E')
            };
            if exponent {
                float = true;
                i += 1;
                if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
                    i += 1;
                }
            } else if b == b'.' {
                // `1..` never appears in Go; stop before a second dot
                if float || bytes.get(i + 1) == Some(&b'.') {
                    break;
                }
                float = true;
                i += 1;
            } else if b.is_ascii_alphanumeric() || b == b'_' {
                i += 1;
            } else {
                break;
            }
        }
        self.pos = i;

        let lit = &self.src[start..self.pos];
        let tok = if lit.ends_with('i') {
            Tok::Imag
        } else if float {
            Tok::Float
        } else {
            Tok::Int
        };
        self.token(tok, start)
    }

    fn quoted(&mut self, start: usize, quote: char, tok: Tok) -> Token<'a> {
        let mut chars = self.rest()[1..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    chars.next();
                }
                '\n' => break,
                c if c == quote => {
                    self.pos += 1 + i + 1;
                    return self.token(tok, start);
                }
                _ => {}
            }
        }
        // Unterminated: consume up to the end of the line
        let line_end = self.rest().find('\n').unwrap_or(self.rest().len());
        self.pos += line_end;
        self.token(Tok::Illegal, start)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.next_token();
        (token.tok != Tok::Eof).then_some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<(Tok, &str)> {
        Scanner::new(src, 0).map(|t| (t.tok, t.lit)).collect()
    }

    #[test]
    fn test_identifiers_and_keywords() {
        assert_eq!(
            toks("if user.Name != nil {"),
            [
                (Tok::Keyword, "if"),
                (Tok::Ident, "user"),
                (Tok::Period, "."),
                (Tok::Ident, "Name"),
                (Tok::Operator, "!="),
                (Tok::Ident, "nil"),
                (Tok::LBrace, "{"),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            toks("42 3.14 .5 1e-3 0x1F 2i items[0]"),
            [
                (Tok::Int, "42"),
                (Tok::Float, "3.14"),
                (Tok::Float, ".5"),
                (Tok::Float, "1e-3"),
                (Tok::Int, "0x1F"),
                (Tok::Imag, "2i"),
                (Tok::Ident, "items"),
                (Tok::LBrack, "["),
                (Tok::Int, "0"),
                (Tok::RBrack, "]"),
            ]
        );
    }

    #[test]
    fn test_strings_and_comments() {
        assert_eq!(
            toks(r#""a \"b\"" `raw` 'x' // trailing"#),
            [
                (Tok::String, r#""a \"b\"""#),
                (Tok::String, "`raw`"),
                (Tok::Char, "'x'"),
            ]
        );
        assert_eq!(toks("a /* b */ c"), [(Tok::Ident, "a"), (Tok::Ident, "c")]);
    }

    #[test]
    fn test_markers_and_markup_starts() {
        assert_eq!(
            toks("{ ^x <p>"),
            [
                (Tok::LBrace, "{"),
                (Tok::Xor, "^"),
                (Tok::Ident, "x"),
                (Tok::Lss, "<"),
                (Tok::Ident, "p"),
                (Tok::Operator, ">"),
            ]
        );
    }

    #[test]
    fn test_offsets_are_absolute() {
        let src = "<p>^name</p>";
        let mut scanner = Scanner::new(src, 4);
        let ident = scanner.next_token();
        assert_eq!((ident.tok, ident.start, ident.end), (Tok::Ident, 4, 8));
        let lss = scanner.next_token();
        assert_eq!((lss.tok, lss.start), (Tok::Lss, 8));
    }

    #[test]
    fn test_never_fails() {
        assert_eq!(toks("@ \"open"), [(Tok::Illegal, "@"), (Tok::Illegal, "\"open")]);
        let mut scanner = Scanner::new("/* open", 0);
        assert_eq!(scanner.next_token().tok, Tok::Illegal);
        assert_eq!(scanner.next_token().tok, Tok::Eof);
    }
}
