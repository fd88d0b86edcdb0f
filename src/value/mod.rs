//! Runtime values flowing through the binding context.
//!
//! `Value` is what expressions evaluate to and what the host puts into a
//! [`Context`](crate::Context). The set of variants is closed; anything the
//! renderer cannot place in a given position (a mapping as text, a function
//! as an attribute) is reported as a `TemplateValueError`.

mod convert;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::template::TemplateResult;

/// Insertion-ordered mapping; order matters for `style` and `class` maps.
pub type Map = IndexMap<String, Value>;

// ============================================================================
// Markup
// ============================================================================

/// Trusted markup: emitted verbatim, never escaped.
///
/// Wrapping a string in `Markup` is a promise by its producer that the
/// content is safe to place in a document as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Markup(Arc<str>);

impl Markup {
    pub fn new(html: impl Into<Arc<str>>) -> Self {
        Self(html.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Function
// ============================================================================

type NativeFn = dyn Fn(&[Value]) -> TemplateResult<Value> + Send + Sync;

/// Host function callable from template expressions.
#[derive(Clone)]
pub struct Function(Arc<NativeFn>);

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> TemplateResult<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> TemplateResult<Value> {
        (self.0)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<function>")
    }
}

// ============================================================================
// Value
// ============================================================================

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Markup(Markup),
    List(Vec<Value>),
    Map(Map),
    Func(Function),
}

impl Value {
    /// Build a function value from a closure.
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> TemplateResult<Value> + Send + Sync + 'static,
    {
        Self::Func(Function::new(f))
    }

    /// Build a trusted markup value.
    pub fn markup(html: impl Into<Arc<str>>) -> Self {
        Self::Markup(Markup::new(html))
    }

    /// Dynamic-language truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::Markup(m) => !m.as_str().is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
            Self::Func(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Markup(_) => "markup",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Func(_) => "function",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Field access; anything that is not a mapping has no fields.
    pub fn field(&self, name: &str) -> Value {
        match self {
            Self::Map(map) => map.get(name).cloned().unwrap_or_default(),
            _ => Value::Null,
        }
    }

    /// Subscript access: lists by (possibly negative) int, maps by str.
    pub fn index(&self, key: &Value) -> Value {
        match (self, key) {
            (Self::List(items), Self::Int(i)) => {
                let len = items.len() as i64;
                let idx = if *i < 0 { len + i } else { *i };
                usize::try_from(idx)
                    .ok()
                    .and_then(|idx| items.get(idx))
                    .cloned()
                    .unwrap_or_default()
            }
            (Self::Map(map), Self::Str(k)) => map.get(&**k).cloned().unwrap_or_default(),
            (Self::Str(s), Self::Int(i)) => {
                let len = s.chars().count() as i64;
                let idx = if *i < 0 { len + i } else { *i };
                usize::try_from(idx)
                    .ok()
                    .and_then(|idx| s.chars().nth(idx))
                    .map(|c| Value::from(c.to_string()))
                    .unwrap_or_default()
            }
            _ => Value::Null,
        }
    }

    /// Default string conversion used for text and attribute values.
    ///
    /// `None` converts to the empty string; lists join their items with a
    /// space. Mappings and functions have no text form.
    pub fn to_text(&self) -> TemplateResult<Cow<'_, str>> {
        Ok(match self {
            Self::Null => Cow::Borrowed(""),
            Self::Bool(true) => Cow::Borrowed("true"),
            Self::Bool(false) => Cow::Borrowed("false"),
            Self::Int(i) => Cow::Owned(i.to_string()),
            Self::Float(f) => Cow::Owned(format_float(*f)),
            Self::Str(s) => Cow::Borrowed(s),
            Self::Markup(m) => Cow::Borrowed(m.as_str()),
            Self::List(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(item.to_text()?.into_owned());
                }
                Cow::Owned(parts.join(" "))
            }
            Self::Map(_) | Self::Func(_) => {
                return Err(crate::template::TemplateError::value(format!(
                    "a {} has no text form",
                    self.type_name()
                )));
            }
        })
    }

    /// Ordering for comparison operators; `None` when incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                self.compare(other) == Some(Ordering::Equal)
            }
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Markup(a), Self::Markup(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(!Value::Map(Map::new()).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::from(vec![Value::Null]).is_truthy());
        assert!(Value::func(|_| Ok(Value::Null)).is_truthy());
    }

    #[test]
    fn test_to_text() {
        assert_eq!(Value::Null.to_text().unwrap(), "");
        assert_eq!(Value::from(true).to_text().unwrap(), "true");
        assert_eq!(Value::from(42).to_text().unwrap(), "42");
        assert_eq!(Value::from(2.0).to_text().unwrap(), "2.0");
        assert_eq!(Value::from(2.5).to_text().unwrap(), "2.5");
        assert_eq!(
            Value::from(vec![Value::from("a"), Value::from(1)]).to_text().unwrap(),
            "a 1"
        );
        assert!(Value::Map(Map::new()).to_text().is_err());
    }

    #[test]
    fn test_index_and_field() {
        let list = Value::from(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(list.index(&Value::from(0)), Value::from("a"));
        assert_eq!(list.index(&Value::from(-1)), Value::from("b"));
        assert_eq!(list.index(&Value::from(5)), Value::Null);

        let mut map = Map::new();
        map.insert("k".into(), Value::from(1));
        let map = Value::Map(map);
        assert_eq!(map.field("k"), Value::from(1));
        assert_eq!(map.field("missing"), Value::Null);
        assert_eq!(map.index(&Value::from("k")), Value::from(1));
        assert_eq!(Value::Null.field("x"), Value::Null);
    }

    #[test]
    fn test_numeric_equality_crosses_types() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_ne!(Value::from(1), Value::from("1"));
        assert_eq!(
            Value::from(1).compare(&Value::from(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::from("a").compare(&Value::from(1)), None);
    }
}
