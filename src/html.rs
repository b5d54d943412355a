//! HTML element classification used by the markup parser and generator.

/// Void elements: cannot have children or a closing tag.
/// https://html.spec.whatwg.org/multipage/syntax.html#void-elements
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose content is text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title",
];

/// Groups sibling nodes without rendering a tag of its own.
pub const TEXT_ELEMENT: &str = "text";

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub fn is_text_element(tag: &str) -> bool {
    tag.eq_ignore_ascii_case(TEXT_ELEMENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_ignores_case() {
        assert!(is_void_element("BR"));
        assert!(!is_void_element("div"));
        assert!(is_raw_text_element("Script"));
        assert!(is_text_element("TEXT"));
    }
}
