use serde::Serialize;

/// Line-level source mapping. Both lines are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mapping {
    pub gen_line: usize,
    pub src_line: usize,
}

/// Output buffer that accumulates generated code with mappings
pub struct Output {
    lines: Vec<String>,
    current_line: String,
    line_number: usize,
    indent: usize,
    mappings: Vec<Mapping>,
}

impl Output {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            current_line: String::new(),
            line_number: 0,
            indent: 0,
            mappings: Vec::new(),
        }
    }

    /// Add text without mapping
    pub fn push(&mut self, text: &str) {
        self.current_line.push_str(text);
    }

    /// Add a newline
    pub fn newline(&mut self) {
        self.current_line.push('\n');
        self.lines.push(std::mem::take(&mut self.current_line));
        self.line_number += 1;
    }

    /// One indented line
    pub fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.current_line.push('\t');
        }
        self.push(text);
        self.newline();
    }

    pub fn blank(&mut self) {
        self.newline();
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Copy user code as-is, line by line, ending on a fresh line.
    pub fn push_verbatim(&mut self, code: &str) {
        for piece in code.split_inclusive('\n') {
            self.push(piece.strip_suffix('\n').unwrap_or(piece));
            self.newline();
        }
    }

    /// Map the next line to `src_line`, optionally announcing it to the Go
    /// toolchain with a `//line` directive (which must start in column 1).
    pub fn mark(&mut self, file: Option<&str>, src_line: usize) {
        if let Some(file) = file {
            self.push(&format!("//line {file}:{src_line}"));
            self.newline();
        }
        self.mappings.push(Mapping {
            gen_line: self.line_number + 1,
            src_line,
        });
    }

    /// Finish and return the generated code
    pub fn finish(mut self) -> (String, Vec<Mapping>) {
        if !self.current_line.is_empty() {
            self.lines.push(std::mem::take(&mut self.current_line));
        }

        (self.lines.join(""), self.mappings)
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

/// Interpreted Go string literal for `text`.
pub fn go_string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            // Go source may not contain a BOM or raw line/paragraph separators
            '\u{feff}' | '\u{2028}' | '\u{2029}' => {
                out.push_str(&format!("\\u{:04x}", ch as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
