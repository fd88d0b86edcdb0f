//! Conversions between `Value` and Rust / JSON values.

use std::sync::Arc;

use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use super::{Map, Markup, Value};

// =============================================================================
// From Rust scalars and collections
// =============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

macro_rules! from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(i: $ty) -> Self {
                Self::Int(i64::from(i))
            }
        })*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        i64::try_from(i).map_or(Self::Float(i as f64), Self::Int)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Arc::from(s))
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Self::Str(s)
    }
}

impl From<Markup> for Value {
    fn from(m: Markup) -> Self {
        Self::Markup(m)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Map(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// =============================================================================
// JSON
// =============================================================================

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Self::from(s),
            Json::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            // preserve_order keeps the document's key order
            Json::Object(obj) => Self::Map(obj.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

/// TOML values from prop schema sidecars; datetimes become strings.
impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        use toml::Value as Toml;
        match value {
            Toml::String(s) => Self::from(s),
            Toml::Integer(i) => Self::Int(i),
            Toml::Float(f) => Self::Float(f),
            Toml::Boolean(b) => Self::Bool(b),
            Toml::Datetime(dt) => Self::from(dt.to_string()),
            Toml::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Toml::Table(table) => Self::Map(table.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Markup(m) => serializer.serialize_str(m.as_str()),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Self::Func(_) => Err(S::Error::custom("functions cannot be serialized")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_key_order() {
        let value = Value::from(json!({"zeta": 1, "alpha": [true, null], "mid": 2.5}));
        let map = value.as_map().unwrap();
        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
        assert_eq!(map["alpha"], Value::from(vec![Value::from(true), Value::Null]));
        assert_eq!(map["mid"], Value::from(2.5));
    }

    #[test]
    fn test_serialize_round_trips_through_json() {
        let value: Value = [("a", Value::from(1)), ("b", Value::markup("<i>x</i>"))]
            .into_iter()
            .collect();
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"a":1,"b":"<i>x</i>"}"#);
    }

    #[test]
    fn test_serialize_function_fails() {
        let value = Value::func(|_| Ok(Value::Null));
        assert!(serde_json::to_string(&value).is_err());
    }

    #[test]
    fn test_from_toml() {
        let table: toml::Value = toml::from_str("size = \"md\"\ntags = [1, 2.5]").unwrap();
        let value = Value::from(table);
        assert_eq!(value.field("size"), Value::from("md"));
        assert_eq!(value.field("tags"), Value::from(vec![Value::from(1), Value::from(2.5)]));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
