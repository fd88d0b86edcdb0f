//! Template error types.
//!
//! | Kind      | Raised by        | Meaning                                        |
//! |-----------|------------------|------------------------------------------------|
//! | `Syntax`  | parser           | malformed nesting, unterminated construct      |
//! | `Binding` | renderer         | unknown slot/component, missing prop, bad name |
//! | `Value`   | renderer / eval  | value of a type the context cannot accept      |
//!
//! All three abort the current parse or render and carry an [`Origin`].

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Location
// ============================================================================

/// Position inside a template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    /// Byte offset from the start of the source.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Byte offsets of line starts, for offset -> line/column conversion.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    starts: Vec<usize>,
    source: Arc<str>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            starts,
            source: Arc::from(source),
        }
    }

    pub fn locate(&self, offset: usize) -> Location {
        let offset = offset.min(self.source.len());
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.starts[line];
        let column = self
            .source
            .get(start..offset)
            .map_or(offset - start, |s| s.chars().count())
            + 1;
        Location {
            offset,
            line: line + 1,
            column,
        }
    }
}

// ============================================================================
// Origin
// ============================================================================

/// Where an error happened: template name plus location, when known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    pub template: Option<Arc<str>>,
    pub location: Option<Location>,
}

impl Origin {
    pub fn new(template: Arc<str>, location: Location) -> Self {
        Self {
            template: Some(template),
            location: Some(location),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.template.is_none() && self.location.is_none()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.template, &self.location) {
            (Some(name), Some(loc)) => write!(f, "{name}:{loc}"),
            (Some(name), None) => write!(f, "{name}"),
            (None, Some(loc)) => write!(f, "{loc}"),
            (None, None) => write!(f, "<unknown>"),
        }
    }
}

// ============================================================================
// TemplateError
// ============================================================================

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    Binding,
    Value,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "TemplateSyntaxError",
            Self::Binding => "TemplateBindingError",
            Self::Value => "TemplateValueError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while parsing or rendering a template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("syntax error at {origin}: {message}")]
    Syntax { message: String, origin: Origin },

    #[error("binding error at {origin}: {message}")]
    Binding { message: String, origin: Origin },

    #[error("value error at {origin}: {message}")]
    Value { message: String, origin: Origin },
}

pub type TemplateResult<T> = Result<T, TemplateError>;

impl TemplateError {
    pub fn syntax(message: impl Into<String>, origin: Origin) -> Self {
        Self::Syntax {
            message: message.into(),
            origin,
        }
    }

    /// Binding error without a location yet; see [`TemplateError::at`].
    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding {
            message: message.into(),
            origin: Origin::default(),
        }
    }

    /// Value error without a location yet; see [`TemplateError::at`].
    pub fn value(message: impl Into<String>) -> Self {
        Self::Value {
            message: message.into(),
            origin: Origin::default(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::Binding { .. } => ErrorKind::Binding,
            Self::Value { .. } => ErrorKind::Value,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Syntax { message, .. }
            | Self::Binding { message, .. }
            | Self::Value { message, .. } => message,
        }
    }

    pub fn origin(&self) -> &Origin {
        match self {
            Self::Syntax { origin, .. }
            | Self::Binding { origin, .. }
            | Self::Value { origin, .. } => origin,
        }
    }

    pub fn location(&self) -> Option<Location> {
        self.origin().location
    }

    /// Attach an origin unless one is already present.
    ///
    /// Errors bubble up through nested components; the innermost origin is
    /// the useful one, so outer frames never overwrite it.
    pub fn at(mut self, new: Origin) -> Self {
        let origin = match &mut self {
            Self::Syntax { origin, .. }
            | Self::Binding { origin, .. }
            | Self::Value { origin, .. } => origin,
        };
        if origin.is_unknown() {
            *origin = new;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_locate() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.locate(0), Location { offset: 0, line: 1, column: 1 });
        assert_eq!(index.locate(1), Location { offset: 1, line: 1, column: 2 });
        assert_eq!(index.locate(3), Location { offset: 3, line: 2, column: 1 });
        assert_eq!(index.locate(7), Location { offset: 7, line: 4, column: 1 });
    }

    #[test]
    fn test_line_index_counts_chars() {
        let index = LineIndex::new("é{x}");
        // 'é' is two bytes but one column
        assert_eq!(index.locate(2).column, 2);
    }

    #[test]
    fn test_error_kind_names() {
        assert_eq!(ErrorKind::Syntax.as_str(), "TemplateSyntaxError");
        assert_eq!(ErrorKind::Binding.as_str(), "TemplateBindingError");
        assert_eq!(ErrorKind::Value.as_str(), "TemplateValueError");
    }

    #[test]
    fn test_at_keeps_innermost_origin() {
        let inner = Origin::new(Arc::from("card.html"), Location { offset: 4, line: 1, column: 5 });
        let outer = Origin::new(Arc::from("page.html"), Location::default());
        let err = TemplateError::binding("missing prop `title`")
            .at(inner.clone())
            .at(outer);
        assert_eq!(err.origin(), &inner);
        assert_eq!(
            err.to_string(),
            "binding error at card.html:1:5: missing prop `title`"
        );
    }
}
