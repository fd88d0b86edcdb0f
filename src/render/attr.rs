//! Attribute value resolution.
//!
//! | Name          | Accepted value                  | Output                              |
//! |---------------|---------------------------------|-------------------------------------|
//! | `class`       | str, list, map (nested freely)  | space-joined tokens, omitted if none |
//! | `style`       | map or str                      | `key: value; key: value`            |
//! | `data`/`aria` | map                             | one `data-key` / `aria-key` per entry |
//! | other         | bool                            | bare name when true, omitted when false |
//! | other         | str, number, list, markup       | escaped text                        |
//!
//! Attributes are applied left to right; a later write to the same name
//! replaces the earlier value in place, and a later falsy boolean removes it.

use smallvec::SmallVec;

use crate::template::{TemplateError, TemplateResult};
use crate::value::Value;

use super::escape::{escape_attr, escape_quotes, is_valid_attr_name};

/// Resolved attributes in output order. Values are already escaped.
#[derive(Debug, Default)]
pub(crate) struct AttrSet {
    entries: SmallVec<[(String, Option<String>); 8]>,
}

impl AttrSet {
    pub fn set(&mut self, name: &str, value: Option<String>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    /// Template-authored literal; trusted except for the quote character.
    pub fn set_literal(&mut self, name: &str, literal: &str) {
        self.set(name, Some(escape_quotes(literal).into_owned()));
    }

    pub fn write_to(&self, out: &mut String) {
        for (name, value) in &self.entries {
            out.push(' ');
            out.push_str(name);
            if let Some(value) = value {
                out.push_str("=\"");
                out.push_str(value);
                out.push('"');
            }
        }
    }

    #[cfg(test)]
    fn render(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }
}

/// Apply one evaluated attribute.
pub(crate) fn apply(set: &mut AttrSet, name: &str, value: Value) -> TemplateResult<()> {
    check_name(name)?;
    match (name, value) {
        ("class", value) => {
            let mut tokens = Vec::new();
            class_tokens(&value, &mut tokens)?;
            if tokens.is_empty() {
                set.remove(name);
            } else {
                set.set(name, Some(escape_attr(&tokens.join(" ")).into_owned()));
            }
        }
        ("style", Value::Map(map)) => {
            let mut parts = Vec::with_capacity(map.len());
            for (key, v) in &map {
                if v.is_null() || matches!(v, Value::Bool(false)) {
                    continue;
                }
                parts.push(format!("{key}: {}", v.to_text()?));
            }
            if parts.is_empty() {
                set.remove(name);
            } else {
                set.set(name, Some(escape_attr(&parts.join("; ")).into_owned()));
            }
        }
        ("data" | "aria", Value::Map(map)) => {
            for (key, v) in map {
                let full = format!("{name}-{key}");
                check_name(&full)?;
                if v.is_null() {
                    set.remove(&full);
                } else {
                    // booleans stringify to `true`/`false` here, never bare
                    set.set(&full, Some(escape_attr(&v.to_text()?).into_owned()));
                }
            }
        }
        (_, value) => apply_plain(set, name, value)?,
    }
    Ok(())
}

/// Expand a `{mapping}` spread as if each entry were written in place.
pub(crate) fn apply_spread(set: &mut AttrSet, value: Value) -> TemplateResult<()> {
    match value {
        Value::Map(map) => {
            for (name, v) in map {
                apply(set, &name, v)?;
            }
            Ok(())
        }
        Value::Null => Ok(()),
        other => Err(TemplateError::value(format!(
            "attribute spread expects a mapping, got a {}",
            other.type_name()
        ))),
    }
}

fn apply_plain(set: &mut AttrSet, name: &str, value: Value) -> TemplateResult<()> {
    match value {
        Value::Bool(true) => set.set(name, None),
        Value::Bool(false) | Value::Null => set.remove(name),
        Value::Markup(m) => set.set(name, Some(escape_quotes(m.as_str()).into_owned())),
        Value::Map(_) | Value::Func(_) => {
            return Err(TemplateError::value(format!(
                "a {} cannot be the value of attribute `{name}`",
                value.type_name()
            )));
        }
        other => set.set(name, Some(escape_attr(&other.to_text()?).into_owned())),
    }
    Ok(())
}

fn check_name(name: &str) -> TemplateResult<()> {
    if is_valid_attr_name(name) {
        Ok(())
    } else {
        Err(TemplateError::value(format!("invalid attribute name `{name}`")))
    }
}

/// Flatten a class value into tokens, in encounter order.
fn class_tokens(value: &Value, out: &mut Vec<String>) -> TemplateResult<()> {
    match value {
        Value::Str(s) if !s.is_empty() => out.push(s.to_string()),
        Value::Markup(m) if !m.as_str().is_empty() => out.push(m.as_str().to_string()),
        Value::Int(_) | Value::Float(_) if value.is_truthy() => out.push(value.to_text()?.into_owned()),
        Value::List(items) => {
            for item in items {
                class_tokens(item, out)?;
            }
        }
        Value::Map(map) => out.extend(
            map.iter()
                .filter(|(_, on)| on.is_truthy())
                .map(|(name, _)| name.clone()),
        ),
        Value::Func(_) => {
            return Err(TemplateError::value("a function cannot be a class"));
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ErrorKind;
    use crate::value::Map;
    use serde_json::json;

    fn render(attrs: &[(&str, Value)]) -> TemplateResult<String> {
        let mut set = AttrSet::default();
        for (name, value) in attrs {
            apply(&mut set, name, value.clone())?;
        }
        Ok(set.render())
    }

    #[test]
    fn test_class_list_and_map() {
        let class = Value::from(json!(["btn", {"active": true, "disabled": false}]));
        assert_eq!(render(&[("class", class)]).unwrap(), r#" class="btn active""#);
    }

    #[test]
    fn test_class_flattens_and_keeps_duplicates() {
        let class = Value::from(json!(["a", null, false, ["b", ["a"]], "", {"c": 1}]));
        assert_eq!(render(&[("class", class)]).unwrap(), r#" class="a b a c""#);
        let empty = Value::from(json!([null, {"x": false}]));
        assert_eq!(render(&[("class", empty)]).unwrap(), "");
    }

    #[test]
    fn test_style_map_in_order() {
        let style = Value::from(json!({"color": "red", "margin-top": "2px", "hidden": null}));
        assert_eq!(
            render(&[("style", style)]).unwrap(),
            r#" style="color: red; margin-top: 2px""#
        );
    }

    #[test]
    fn test_data_and_aria_prefixes() {
        let data = Value::from(json!({"user-id": 7, "on": true}));
        let aria = Value::from(json!({"hidden": false, "label": "Close"}));
        assert_eq!(
            render(&[("data", data), ("aria", aria)]).unwrap(),
            r#" data-user-id="7" data-on="true" aria-hidden="false" aria-label="Close""#
        );
    }

    #[test]
    fn test_boolean_attributes() {
        assert_eq!(
            render(&[("disabled", Value::from(true)), ("readonly", Value::from(false))]).unwrap(),
            " disabled"
        );
    }

    #[test]
    fn test_last_write_wins_in_place() {
        let out = render(&[
            ("id", Value::from("a")),
            ("title", Value::from("t")),
            ("id", Value::from("b")),
            ("title", Value::from(false)),
        ])
        .unwrap();
        assert_eq!(out, r#" id="b""#);
    }

    #[test]
    fn test_values_are_escaped() {
        let out = render(&[("title", Value::from(r#"x" onload="y"#))]).unwrap();
        assert_eq!(out, r#" title="x&quot; onload=&quot;y""#);
        let out = render(&[("title", Value::markup(r#"<b>"q"</b>"#))]).unwrap();
        assert_eq!(out, r#" title="<b>&quot;q&quot;</b>""#);
    }

    #[test]
    fn test_spread_and_bad_values() {
        let mut set = AttrSet::default();
        set.set_literal("type", "text");
        apply_spread(&mut set, Value::from(json!({"type": "email", "required": true}))).unwrap();
        assert_eq!(set.render(), r#" type="email" required"#);

        let err = apply_spread(&mut set, Value::from(3)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
        let err = render(&[("onclick", Value::func(|_| Ok(Value::Null)))]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
        let err = render(&[("title", Value::Map(Map::new()))]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_invalid_spread_key() {
        let err = apply_spread(
            &mut AttrSet::default(),
            Value::from(json!({"x onload": "y"})),
        )
        .unwrap_err();
        assert!(err.message().contains("invalid attribute name"));
    }
}
