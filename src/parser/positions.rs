//! Position conversion utilities.
//!
//! Everything in the AST is tracked as byte offsets. Line and column are
//! only computed when a diagnostic or a `//line` directive needs them.

/// Convert a byte offset to a 1-based `(line, column)` pair.
///
/// The column is the byte distance from the preceding newline, so the first
/// byte of a line is column 1. Offsets past the end are clamped.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let column = match before.iter().rposition(|&b| b == b'\n') {
        Some(newline) => offset - newline,
        None => offset + 1,
    };
    (line, column)
}

/// 1-based line containing `offset`.
pub fn line_of(source: &str, offset: usize) -> usize {
    line_col(source, offset).0
}

/// Line-start offsets of a source, for repeated line lookups.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.bytes().enumerate().filter(|&(_, b)| b == b'\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    /// 1-based line containing `offset`; agrees with [`line_of`].
    pub fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }
}

/// The full text of the line containing `offset`, without its newline.
pub fn line_text(source: &str, offset: usize) -> &str {
    let offset = offset.min(source.len());
    let start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = source[offset..].find('\n').map_or(source.len(), |i| offset + i);
    source[start..end].trim_end_matches('\r')
}
