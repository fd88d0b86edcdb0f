//! Template lexer.
//!
//! Splits source text into text runs, `{...}` holes, and tags. Holes are
//! found with a brace-depth counter that skips quoted strings, so
//! expressions containing mapping literals (`class={{"a": on}}`) stay in
//! one piece. The lexer knows nothing about markers or components beyond
//! the `<{...}>` tag form; classification is the parser's job.

use std::borrow::Cow;

use super::node::Span;
use crate::render::escape::is_raw_text_element;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexError {
    pub message: String,
    pub offset: usize,
}

fn lex_error(message: impl Into<String>, offset: usize) -> LexError {
    LexError {
        message: message.into(),
        offset,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TagName<'a> {
    Html(&'a str),
    /// `<{Name}>`: inner text trimmed, plus its absolute offset.
    Brace(&'a str, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawValue<'a> {
    Bare,
    Quoted(&'a str),
    Brace { body: &'a str, offset: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawAttr<'a> {
    Named {
        name: &'a str,
        value: RawValue<'a>,
        span: Span,
    },
    Brace {
        body: &'a str,
        offset: usize,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tag<'a> {
    pub name: TagName<'a>,
    pub attrs: Vec<RawAttr<'a>>,
    pub self_closing: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token<'a> {
    Text { text: Cow<'a, str>, span: Span },
    /// Body of a `{...}` hole, without the braces.
    Hole { body: &'a str, span: Span },
    Open(Tag<'a>),
    Close { name: TagName<'a>, span: Span },
}

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token<'a>>,
    text: String,
    text_start: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            text: String::new(),
            text_start: 0,
        }
    }

    fn run(mut self) -> Result<Vec<Token<'a>>, LexError> {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'<' => self.lex_angle()?,
                b'{' if self.peek(1) == Some(b'{') => self.push_text("{", 2),
                b'{' => {
                    let end = scan_braces(self.bytes, self.pos)?;
                    self.flush_text();
                    self.tokens.push(Token::Hole {
                        body: &self.src[self.pos + 1..end],
                        span: Span::new(self.pos, end + 1),
                    });
                    self.pos = end + 1;
                }
                b'}' if self.peek(1) == Some(b'}') => self.push_text("}", 2),
                _ => {
                    let end = self.bytes[self.pos..]
                        .iter()
                        .position(|b| matches!(b, b'<' | b'{' | b'}'))
                        .map_or(self.bytes.len(), |i| self.pos + i);
                    // a lone `}` is literal text
                    let end = if end == self.pos { end + 1 } else { end };
                    let run = &self.src[self.pos..end];
                    self.push_text(run, run.len());
                }
            }
        }
        self.flush_text();
        Ok(self.tokens)
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn push_text(&mut self, text: &str, consumed: usize) {
        if self.text.is_empty() {
            self.text_start = self.pos;
        }
        self.text.push_str(text);
        self.pos += consumed;
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        let span = Span::new(self.text_start, self.pos);
        // borrow the source when no `{{`/`}}` was collapsed
        let text = match self.src.get(span.start..span.end) {
            Some(slice) if slice == text => Cow::Borrowed(slice),
            _ => Cow::Owned(text),
        };
        self.tokens.push(Token::Text { text, span });
    }

    fn lex_angle(&mut self) -> Result<(), LexError> {
        let rest = &self.src[self.pos..];
        if rest.starts_with("<!--") {
            let end = rest
                .find("-->")
                .ok_or_else(|| lex_error("unterminated comment", self.pos))?;
            let comment = &self.src[self.pos..self.pos + end + 3];
            self.push_text(comment, comment.len());
            return Ok(());
        }
        if rest.starts_with("<!") {
            let end = rest
                .find('>')
                .ok_or_else(|| lex_error("unterminated declaration", self.pos))?;
            let decl = &self.src[self.pos..=self.pos + end];
            self.push_text(decl, decl.len());
            return Ok(());
        }
        match (self.peek(1), self.peek(2)) {
            (Some(b'/'), Some(b'{')) => self.lex_close(),
            (Some(b'/'), Some(c)) if c.is_ascii_alphabetic() => self.lex_close(),
            (Some(b'{'), _) => self.lex_open(),
            (Some(c), _) if c.is_ascii_alphabetic() => self.lex_open(),
            _ => {
                self.push_text("<", 1);
                Ok(())
            }
        }
    }

    fn lex_name(&mut self) -> Result<TagName<'a>, LexError> {
        if self.bytes.get(self.pos) == Some(&b'{') {
            let open = self.pos;
            let close = self.bytes[open..]
                .iter()
                .position(|b| *b == b'}')
                .map(|i| open + i)
                .ok_or_else(|| lex_error("unterminated component tag", open))?;
            let inner = &self.src[open + 1..close];
            let lead = inner.len() - inner.trim_start().len();
            self.pos = close + 1;
            return Ok(TagName::Brace(inner.trim(), open + 1 + lead));
        }
        let start = self.pos;
        while self.pos < self.bytes.len() && is_name_byte(self.bytes[self.pos]) {
            self.pos += 1;
        }
        Ok(TagName::Html(&self.src[start..self.pos]))
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn lex_close(&mut self) -> Result<(), LexError> {
        self.flush_text();
        let start = self.pos;
        self.pos += 2;
        let name = self.lex_name()?;
        self.skip_ws();
        if self.bytes.get(self.pos) != Some(&b'>') {
            return Err(lex_error("expected `>` to end the closing tag", self.pos));
        }
        self.pos += 1;
        self.tokens.push(Token::Close {
            name,
            span: Span::new(start, self.pos),
        });
        Ok(())
    }

    fn lex_open(&mut self) -> Result<(), LexError> {
        self.flush_text();
        let start = self.pos;
        self.pos += 1;
        let name = self.lex_name()?;
        let mut attrs = Vec::new();

        let self_closing = loop {
            self.skip_ws();
            match self.bytes.get(self.pos) {
                None => return Err(lex_error("unterminated tag", start)),
                Some(b'>') => {
                    self.pos += 1;
                    break false;
                }
                Some(b'/') if self.peek(1) == Some(b'>') => {
                    self.pos += 2;
                    break true;
                }
                Some(b'{') => {
                    let end = scan_braces(self.bytes, self.pos)?;
                    attrs.push(RawAttr::Brace {
                        body: &self.src[self.pos + 1..end],
                        offset: self.pos + 1,
                        span: Span::new(self.pos, end + 1),
                    });
                    self.pos = end + 1;
                }
                Some(&b) if is_attr_name_byte(b) => attrs.push(self.lex_attr()?),
                Some(_) => {
                    return Err(lex_error("unexpected character in tag", self.pos));
                }
            }
        };

        let raw_tag = match name {
            TagName::Html(tag) if !self_closing && is_raw_text_element(tag) => Some(tag),
            _ => None,
        };
        self.tokens.push(Token::Open(Tag {
            name,
            attrs,
            self_closing,
            span: Span::new(start, self.pos),
        }));

        if let Some(tag) = raw_tag {
            self.lex_raw_body(tag, start)?;
        }
        Ok(())
    }

    fn lex_attr(&mut self) -> Result<RawAttr<'a>, LexError> {
        let start = self.pos;
        while self.pos < self.bytes.len() && is_attr_name_byte(self.bytes[self.pos]) {
            self.pos += 1;
        }
        let name = &self.src[start..self.pos];
        self.skip_ws();
        if self.bytes.get(self.pos) != Some(&b'=') {
            return Ok(RawAttr::Named {
                name,
                value: RawValue::Bare,
                span: Span::new(start, self.pos),
            });
        }
        self.pos += 1;
        self.skip_ws();

        let value = match self.bytes.get(self.pos) {
            Some(&quote) if quote == b'"' || quote == b'\'' => {
                let open = self.pos;
                let len = self.bytes[open + 1..]
                    .iter()
                    .position(|b| *b == quote)
                    .ok_or_else(|| lex_error("unterminated attribute value", open))?;
                self.pos = open + 1 + len + 1;
                RawValue::Quoted(&self.src[open + 1..open + 1 + len])
            }
            Some(b'{') => {
                let open = self.pos;
                let end = scan_braces(self.bytes, open)?;
                self.pos = end + 1;
                RawValue::Brace {
                    body: &self.src[open + 1..end],
                    offset: open + 1,
                }
            }
            Some(_) => {
                let open = self.pos;
                while self.pos < self.bytes.len()
                    && !self.bytes[self.pos].is_ascii_whitespace()
                    && self.bytes[self.pos] != b'>'
                    && !(self.bytes[self.pos] == b'/' && self.peek(1) == Some(b'>'))
                {
                    self.pos += 1;
                }
                RawValue::Quoted(&self.src[open..self.pos])
            }
            None => return Err(lex_error("missing attribute value", self.pos)),
        };
        Ok(RawAttr::Named {
            name,
            value,
            span: Span::new(start, self.pos),
        })
    }

    /// Body of `<script>`/`<style>`: literal up to the matching close tag.
    fn lex_raw_body(&mut self, tag: &str, open: usize) -> Result<(), LexError> {
        let needle = format!("</{}", tag.to_ascii_lowercase());
        let end = self.src[self.pos..]
            .to_ascii_lowercase()
            .find(&needle)
            .map(|i| self.pos + i)
            .ok_or_else(|| lex_error(format!("unclosed <{tag}>"), open))?;
        if end > self.pos {
            self.tokens.push(Token::Text {
                text: Cow::Borrowed(&self.src[self.pos..end]),
                span: Span::new(self.pos, end),
            });
        }
        self.pos = end;
        self.lex_close()
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

fn is_attr_name_byte(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'' | b'{' | b'}' | b'<')
}

/// Index of the `}` matching the `{` at `open`.
///
/// Quoted strings inside the hole are skipped, including escaped quotes.
pub(crate) fn scan_braces(bytes: &[u8], open: usize) -> Result<usize, LexError> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(lex_error("unterminated `{`", open))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_holes() {
        let tokens = tokenize("Hi {user.name}!").unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(matches!(&tokens[0], Token::Text { text, .. } if text == "Hi "));
        assert!(matches!(&tokens[1], Token::Hole { body: "user.name", span } if span.start == 3));
        assert!(matches!(&tokens[2], Token::Text { text, .. } if text == "!"));
    }

    #[test]
    fn test_double_braces_are_literal() {
        let tokens = tokenize("a {{b}} c").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(matches!(&tokens[0], Token::Text { text, .. } if text == "a {b} c"));
    }

    #[test]
    fn test_nested_braces_and_strings() {
        let src = r#"<a class={["x", {"a}": on}]}>"#;
        let tokens = tokenize(src).unwrap();
        let Token::Open(tag) = &tokens[0] else {
            panic!("expected an open tag");
        };
        let RawAttr::Named { name, value, .. } = &tag.attrs[0] else {
            panic!("expected a named attribute");
        };
        assert_eq!(*name, "class");
        assert!(matches!(value, RawValue::Brace { body, .. } if *body == r#"["x", {"a}": on}]"#));
    }

    #[test]
    fn test_unterminated_hole() {
        let err = tokenize("ok {oops").unwrap_err();
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn test_component_tags() {
        let tokens = tokenize("<{ layouts.Base } title=\"t\" {...rest}/></{Card}>").unwrap();
        let Token::Open(tag) = &tokens[0] else {
            panic!("expected an open tag");
        };
        assert_eq!(tag.name, TagName::Brace("layouts.Base", 3));
        assert!(tag.self_closing);
        assert_eq!(tag.attrs.len(), 2);
        assert!(matches!(&tokens[1], Token::Close { name: TagName::Brace("Card", _), .. }));
    }

    #[test]
    fn test_script_body_is_raw() {
        let tokens = tokenize("<script>if (a < b) { x() }</SCRIPT>").unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(matches!(&tokens[1], Token::Text { text, .. } if text == "if (a < b) { x() }"));
        assert!(matches!(&tokens[2], Token::Close { .. }));
    }

    #[test]
    fn test_comments_and_stray_angles_are_text() {
        let tokens = tokenize("<!DOCTYPE html><!-- {x} -->1 < 2").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(matches!(&tokens[0], Token::Text { text, .. } if text == "<!DOCTYPE html><!-- {x} -->1 < 2"));
    }
}
