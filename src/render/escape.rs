//! HTML escaping and element classification.
//!
//! - `escape()` - text content, all five metacharacters
//! - `escape_attr()` - attribute values, same set (quotes matter here)
//! - `escape_quotes()` - trusted markup placed in an attribute value
//! - `is_void_element()`, `is_raw_text_element()`, `keeps_whitespace()`

use std::borrow::Cow;

/// Characters that require escaping.
const ESCAPE_CHARS: [char; 5] = ['<', '>', '&', '"', '\''];

#[inline]
fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '&' => Some("&amp;"),
        '"' => Some("&quot;"),
        '\'' => Some("&#39;"),
        _ => None,
    }
}

/// Escape text content; borrows when nothing needs escaping.
#[inline]
pub fn escape(s: &str) -> Cow<'_, str> {
    escape_with(s, &ESCAPE_CHARS)
}

/// Escape an attribute value for a double-quoted attribute.
#[inline]
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    escape_with(s, &ESCAPE_CHARS)
}

/// Only `"` is replaced: trusted markup stays markup but cannot close the
/// attribute it sits in.
#[inline]
pub fn escape_quotes(s: &str) -> Cow<'_, str> {
    escape_with(s, &['"'])
}

fn escape_with<'a>(s: &'a str, chars: &[char]) -> Cow<'a, str> {
    if !s.contains(chars) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match escape_char(c).filter(|_| chars.contains(&c)) {
            Some(entity) => result.push_str(entity),
            None => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Void elements have no content and no end tag.
#[inline]
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Raw text elements: body is not parsed for holes or tags.
#[inline]
pub fn is_raw_text_element(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("script") || tag.eq_ignore_ascii_case("style")
}

/// Literal-content elements where whitespace is significant.
#[inline]
pub fn keeps_whitespace(tag: &str) -> bool {
    is_raw_text_element(tag)
        || ["pre", "code", "textarea"]
            .iter()
            .any(|t| tag.eq_ignore_ascii_case(t))
}

/// Attribute names must not be able to break out of the tag.
pub fn is_valid_attr_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '>' | '<' | '/' | '=' | '{' | '}')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_all_five() {
        assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_escape_borrows_clean_input() {
        assert!(matches!(escape("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_quotes_only() {
        assert_eq!(escape_quotes(r#"<b class="x">"#), "<b class=&quot;x&quot;>");
    }

    #[test]
    fn test_element_classes() {
        assert!(is_void_element("br"));
        assert!(!is_void_element("div"));
        assert!(is_raw_text_element("SCRIPT"));
        assert!(keeps_whitespace("pre"));
        assert!(keeps_whitespace("style"));
        assert!(!keeps_whitespace("p"));
    }

    #[test]
    fn test_attr_names() {
        assert!(is_valid_attr_name("data-user-id"));
        assert!(is_valid_attr_name("hx-on:click"));
        assert!(!is_valid_attr_name("a b"));
        assert!(!is_valid_attr_name("x\"onload"));
        assert!(!is_valid_attr_name(""));
    }
}
