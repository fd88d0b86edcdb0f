//! Text normalization around block markers and holes that stand alone
//! on their line.

use std::borrow::Cow;

use crate::template::{Text, WhitespaceMode};

/// Apply `mode` to one text node.
pub(crate) fn normalize(text: &Text, mode: WhitespaceMode) -> Cow<'_, str> {
    match mode {
        WhitespaceMode::Keep => Cow::Borrowed(&text.content),
        WhitespaceMode::Trim => Cow::Borrowed(trim_markers(text)),
        WhitespaceMode::Dedent => dedent(trim_markers(text), text.after_block),
        WhitespaceMode::Strip => Cow::Borrowed(text.content.trim()),
    }
}

/// Drop the newline ending a marker line and the indentation starting the
/// next marker's line.
fn trim_markers(text: &Text) -> &str {
    let mut s = text.content.as_str();
    if text.after_block {
        s = s
            .strip_prefix("\r\n")
            .or_else(|| s.strip_prefix('\n'))
            .unwrap_or(s);
    }
    if text.before_block
        && let Some(nl) = s.rfind('\n')
        && s[nl + 1..].chars().all(|c| c == ' ' || c == '\t')
    {
        s = &s[..=nl];
    }
    s
}

/// Remove the indentation shared by every line that starts a line.
///
/// The first line only counts when the text itself begins a line.
fn dedent(s: &str, starts_line: bool) -> Cow<'_, str> {
    let indent_of = |line: &str| line.len() - line.trim_start_matches([' ', '\t']).len();
    let counted = s
        .split('\n')
        .enumerate()
        .filter(|(i, line)| (*i > 0 || starts_line) && !line.trim().is_empty());
    let common = counted.map(|(_, line)| indent_of(line)).min().unwrap_or(0);
    if common == 0 {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    for (i, line) in s.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if i > 0 || starts_line {
            out.push_str(&line[indent_of(line).min(common)..]);
        } else {
            out.push_str(line);
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(content: &str, after_block: bool, before_block: bool) -> Text {
        Text {
            content: content.to_string(),
            after_block,
            before_block,
        }
    }

    #[test]
    fn test_keep_is_verbatim() {
        let t = text("\n  a\n  ", true, true);
        assert_eq!(normalize(&t, WhitespaceMode::Keep), "\n  a\n  ");
    }

    #[test]
    fn test_trim_only_touches_marker_edges() {
        let t = text("\n  <p>x</p>\n  ", true, true);
        assert_eq!(normalize(&t, WhitespaceMode::Trim), "  <p>x</p>\n");
        let t = text("\n  <p>x</p>\n  ", false, false);
        assert_eq!(normalize(&t, WhitespaceMode::Trim), "\n  <p>x</p>\n  ");
    }

    #[test]
    fn test_trim_keeps_trailing_text_on_marker_line() {
        let t = text("a\n  b ", false, true);
        assert_eq!(normalize(&t, WhitespaceMode::Trim), "a\n  b ");
    }

    #[test]
    fn test_dedent() {
        let t = text("\n    <li>a</li>\n      <li>b</li>\n  ", true, true);
        assert_eq!(normalize(&t, WhitespaceMode::Dedent), "<li>a</li>\n  <li>b</li>\n");
    }

    #[test]
    fn test_dedent_mid_line_text() {
        let t = text(" tail\n    next\n    more", false, false);
        assert_eq!(normalize(&t, WhitespaceMode::Dedent), " tail\nnext\nmore");
    }

    #[test]
    fn test_strip() {
        assert_eq!(normalize(&text(" \n\t ", false, false), WhitespaceMode::Strip), "");
        assert_eq!(normalize(&text("\n  hi  \n", false, false), WhitespaceMode::Strip), "hi");
    }
}
