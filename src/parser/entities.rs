//! HTML character references used by the attribute lexer.

/// Legacy references HTML still accepts without the trailing `;`.
const LEGACY: &[(&str, &str)] = &[
    ("AElig", "\u{c6}"),
    ("AMP", "&"),
    ("Aacute", "\u{c1}"),
    ("Acirc", "\u{c2}"),
    ("Agrave", "\u{c0}"),
    ("Aring", "\u{c5}"),
    ("Atilde", "\u{c3}"),
    ("Auml", "\u{c4}"),
    ("COPY", "\u{a9}"),
    ("Ccedil", "\u{c7}"),
    ("ETH", "\u{d0}"),
    ("Eacute", "\u{c9}"),
    ("Ecirc", "\u{ca}"),
    ("Egrave", "\u{c8}"),
    ("Euml", "\u{cb}"),
    ("GT", ">"),
    ("Iacute", "\u{cd}"),
    ("Icirc", "\u{ce}"),
    ("Igrave", "\u{cc}"),
    ("Iuml", "\u{cf}"),
    ("LT", "<"),
    ("Ntilde", "\u{d1}"),
    ("Oacute", "\u{d3}"),
    ("Ocirc", "\u{d4}"),
    ("Ograve", "\u{d2}"),
    ("Oslash", "\u{d8}"),
    ("Otilde", "\u{d5}"),
    ("Ouml", "\u{d6}"),
    ("QUOT", "\""),
    ("REG", "\u{ae}"),
    ("THORN", "\u{de}"),
    ("Uacute", "\u{da}"),
    ("Ucirc", "\u{db}"),
    ("Ugrave", "\u{d9}"),
    ("Uuml", "\u{dc}"),
    ("Yacute", "\u{dd}"),
    ("aacute", "\u{e1}"),
    ("acirc", "\u{e2}"),
    ("acute", "\u{b4}"),
    ("aelig", "\u{e6}"),
    ("agrave", "\u{e0}"),
    ("amp", "&"),
    ("aring", "\u{e5}"),
    ("atilde", "\u{e3}"),
    ("auml", "\u{e4}"),
    ("brvbar", "\u{a6}"),
    ("ccedil", "\u{e7}"),
    ("cedil", "\u{b8}"),
    ("cent", "\u{a2}"),
    ("copy", "\u{a9}"),
    ("curren", "\u{a4}"),
    ("deg", "\u{b0}"),
    ("divide", "\u{f7}"),
    ("eacute", "\u{e9}"),
    ("ecirc", "\u{ea}"),
    ("egrave", "\u{e8}"),
    ("eth", "\u{f0}"),
    ("euml", "\u{eb}"),
    ("frac12", "\u{bd}"),
    ("frac14", "\u{bc}"),
    ("frac34", "\u{be}"),
    ("gt", ">"),
    ("iacute", "\u{ed}"),
    ("icirc", "\u{ee}"),
    ("iexcl", "\u{a1}"),
    ("igrave", "\u{ec}"),
    ("iquest", "\u{bf}"),
    ("iuml", "\u{ef}"),
    ("laquo", "\u{ab}"),
    ("lt", "<"),
    ("macr", "\u{af}"),
    ("micro", "\u{b5}"),
    ("middot", "\u{b7}"),
    ("nbsp", "\u{a0}"),
    ("not", "\u{ac}"),
    ("ntilde", "\u{f1}"),
    ("oacute", "\u{f3}"),
    ("ocirc", "\u{f4}"),
    ("ograve", "\u{f2}"),
    ("ordf", "\u{aa}"),
    ("ordm", "\u{ba}"),
    ("oslash", "\u{f8}"),
    ("otilde", "\u{f5}"),
    ("ouml", "\u{f6}"),
    ("para", "\u{b6}"),
    ("plusmn", "\u{b1}"),
    ("pound", "\u{a3}"),
    ("quot", "\""),
    ("raquo", "\u{bb}"),
    ("reg", "\u{ae}"),
    ("sect", "\u{a7}"),
    ("shy", "\u{ad}"),
    ("sup1", "\u{b9}"),
    ("sup2", "\u{b2}"),
    ("sup3", "\u{b3}"),
    ("szlig", "\u{df}"),
    ("thorn", "\u{fe}"),
    ("times", "\u{d7}"),
    ("uacute", "\u{fa}"),
    ("ucirc", "\u{fb}"),
    ("ugrave", "\u{f9}"),
    ("uml", "\u{a8}"),
    ("uuml", "\u{fc}"),
    ("yacute", "\u{fd}"),
    ("yen", "\u{a5}"),
    ("yuml", "\u{ff}"),
];

/// Named reference that prefixes `input` (which starts just after the
/// `&`). Returns the matched length in bytes and the replacement text.
///
/// `name;` forms are resolved against the full HTML entity table; a bare
/// name falls back to the longest legacy prefix.
pub fn lookup_named(input: &str) -> Option<(usize, String)> {
    let run = input
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(input.len());
    if run > 0 && input[run..].starts_with(';') {
        let reference = format!("&{};", &input[..run]);
        let decoded = html_escape::decode_html_entities(&reference);
        // Entity values are at most two code points; anything longer is
        // a partial decode of a legacy prefix.
        if decoded != reference.as_str() && !decoded.contains('&') && decoded.chars().count() <= 2 {
            return Some((run + 1, decoded.into_owned()));
        }
    }

    LEGACY
        .iter()
        .filter(|(name, _)| input.starts_with(name))
        .max_by_key(|(name, _)| name.len())
        .map(|(name, value)| (name.len(), value.to_string()))
}

/// Why a numeric reference was replaced or flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericIssue {
    Null,
    OutsideUnicodeRange,
    Surrogate,
    Noncharacter,
    Control,
}

/// Windows-1252 remapping for references in 0x80..=0x9F.
const C1_REMAP: [(u32, char); 27] = [
    (0x80, '\u{20ac}'),
    (0x82, '\u{201a}'),
    (0x83, '\u{0192}'),
    (0x84, '\u{201e}'),
    (0x85, '\u{2026}'),
    (0x86, '\u{2020}'),
    (0x87, '\u{2021}'),
    (0x88, '\u{02c6}'),
    (0x89, '\u{2030}'),
    (0x8a, '\u{0160}'),
    (0x8b, '\u{2039}'),
    (0x8c, '\u{0152}'),
    (0x8e, '\u{017d}'),
    (0x91, '\u{2018}'),
    (0x92, '\u{2019}'),
    (0x93, '\u{201c}'),
    (0x94, '\u{201d}'),
    (0x95, '\u{2022}'),
    (0x96, '\u{2013}'),
    (0x97, '\u{2014}'),
    (0x98, '\u{02dc}'),
    (0x99, '\u{2122}'),
    (0x9a, '\u{0161}'),
    (0x9b, '\u{203a}'),
    (0x9c, '\u{0153}'),
    (0x9e, '\u{017e}'),
    (0x9f, '\u{0178}'),
];

/// Resolve a numeric reference per the HTML replacement rules.
pub fn resolve_numeric(code: u32) -> (char, Option<NumericIssue>) {
    const REPLACEMENT: char = '\u{fffd}';
    match code {
        0 => (REPLACEMENT, Some(NumericIssue::Null)),
        0x11_0000.. => (REPLACEMENT, Some(NumericIssue::OutsideUnicodeRange)),
        0xd800..=0xdfff => (REPLACEMENT, Some(NumericIssue::Surrogate)),
        0xfdd0..=0xfdef => (char::from_u32(code).unwrap_or(REPLACEMENT), Some(NumericIssue::Noncharacter)),
        _ if code & 0xfffe == 0xfffe => (char::from_u32(code).unwrap_or(REPLACEMENT), Some(NumericIssue::Noncharacter)),
        0x80..=0x9f => {
            let mapped = C1_REMAP
                .iter()
                .find(|(from, _)| *from == code)
                .map(|(_, to)| *to)
                .or_else(|| char::from_u32(code))
                .unwrap_or(REPLACEMENT);
            (mapped, Some(NumericIssue::Control))
        }
        0x0d => ('\r', Some(NumericIssue::Control)),
        0x01..=0x1f if !matches!(code, 0x09 | 0x0a | 0x0c) => {
            (char::from_u32(code).unwrap_or(REPLACEMENT), Some(NumericIssue::Control))
        }
        0x7f => ('\u{7f}', Some(NumericIssue::Control)),
        _ => (char::from_u32(code).unwrap_or(REPLACEMENT), None),
    }
}
