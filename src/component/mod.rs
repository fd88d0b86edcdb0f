//! Components: templates invoked from other templates with props and slots.
//!
//! Each component carries an explicit [`ComponentSchema`]:
//!
//! | Part  | Source                                  | Entry                            |
//! |-------|-----------------------------------------|----------------------------------|
//! | props | declared by the host or a sidecar TOML  | `PropDecl { required, default, kind }` |
//! | slots | derived from the component's own tree   | `SlotDecl { has_default }`       |
//!
//! A schema with no declared props is *open*: every supplied prop is bound
//! by name. A schema with declarations binds exactly those; anything else
//! lands in the `attrs` mapping (or is rejected under strict props).
//!
//! # Sidecar format (`card.props.toml` next to `card.html`)
//!
//! ```toml
//! [props.title]
//! required = true
//! kind = "str"
//!
//! [props.size]
//! default = "md"
//! ```

mod registry;

use std::sync::Arc;

use anyhow::{Result, bail};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::template::{Template, TemplateError, TemplateResult};
use crate::value::{Map, Value};

pub use registry::{ComponentRegistry, DirRegistry, MemoryRegistry};

/// Binding that receives undeclared props.
pub const ATTRS_BINDING: &str = "attrs";

// ============================================================================
// Schema
// ============================================================================

/// Semantic type of a prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropKind {
    #[default]
    Any,
    Str,
    Int,
    Float,
    Bool,
    List,
    Map,
    Markup,
}

impl PropKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Map => "map",
            Self::Markup => "markup",
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Str => matches!(value, Value::Str(_)),
            Self::Int => matches!(value, Value::Int(_)),
            Self::Float => matches!(value, Value::Int(_) | Value::Float(_)),
            Self::Bool => matches!(value, Value::Bool(_)),
            Self::List => matches!(value, Value::List(_)),
            Self::Map => matches!(value, Value::Map(_)),
            Self::Markup => matches!(value, Value::Markup(_) | Value::Str(_)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropDecl {
    pub required: bool,
    pub default: Option<Value>,
    pub kind: PropKind,
}

impl PropDecl {
    pub fn required(kind: PropKind) -> Self {
        Self {
            required: true,
            default: None,
            kind,
        }
    }

    pub fn optional(default: impl Into<Value>) -> Self {
        Self {
            required: false,
            default: Some(default.into()),
            kind: PropKind::Any,
        }
    }

    pub fn with_kind(mut self, kind: PropKind) -> Self {
        self.kind = kind;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotDecl {
    pub has_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentSchema {
    pub props: IndexMap<String, PropDecl>,
    pub slots: IndexMap<String, SlotDecl>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    #[serde(default)]
    props: IndexMap<String, PropSpec>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PropSpec {
    #[serde(default)]
    required: bool,
    default: Option<toml::Value>,
    #[serde(default)]
    kind: PropKind,
}

impl ComponentSchema {
    /// Parse prop declarations from a sidecar TOML document.
    pub fn props_from_toml(text: &str) -> Result<IndexMap<String, PropDecl>> {
        let file: SchemaFile = toml::from_str(text)?;
        let mut props = IndexMap::with_capacity(file.props.len());
        for (name, entry) in file.props {
            if entry.required && entry.default.is_some() {
                bail!("prop `{name}` is required and also has a default");
            }
            let default = entry.default.map(Value::from);
            if let Some(value) = &default
                && !entry.kind.accepts(value)
            {
                bail!(
                    "default of prop `{name}` is a {}, expected {}",
                    value.type_name(),
                    entry.kind.as_str()
                );
            }
            props.insert(
                name,
                PropDecl {
                    required: entry.required,
                    default,
                    kind: entry.kind,
                },
            );
        }
        Ok(props)
    }

    pub fn is_open(&self) -> bool {
        self.props.is_empty()
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Resolve supplied props against the declarations.
    ///
    /// Returns the bindings for the component's child context.
    pub(crate) fn bind(
        &self,
        component: &str,
        supplied: Vec<(String, Value)>,
        strict: bool,
    ) -> TemplateResult<Vec<(String, Value)>> {
        // later writes win, as with attributes
        let mut supplied: Map = supplied.into_iter().collect();

        if self.is_open() {
            let mut bound: Vec<_> = supplied.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            bound.push((ATTRS_BINDING.to_string(), Value::Map(supplied)));
            return Ok(bound);
        }

        let mut bound = Vec::with_capacity(self.props.len() + 1);
        for (name, decl) in &self.props {
            let value = match (supplied.shift_remove(name), &decl.default) {
                (Some(value), _) => value,
                (None, Some(default)) => default.clone(),
                (None, None) if decl.required => {
                    return Err(TemplateError::binding(format!(
                        "missing required prop `{name}` for component `{component}`"
                    )));
                }
                (None, None) => Value::Null,
            };
            if !value.is_null() && !decl.kind.accepts(&value) {
                return Err(TemplateError::binding(format!(
                    "prop `{name}` of component `{component}` expects {}, got {}",
                    decl.kind.as_str(),
                    value.type_name()
                )));
            }
            bound.push((name.clone(), value));
        }

        if strict && let Some(name) = supplied.keys().next() {
            return Err(TemplateError::binding(format!(
                "component `{component}` has no prop `{name}`"
            )));
        }
        bound.push((ATTRS_BINDING.to_string(), Value::Map(supplied)));
        Ok(bound)
    }
}

// ============================================================================
// Component
// ============================================================================

/// A parsed component template plus its schema.
#[derive(Debug)]
pub struct Component {
    name: Arc<str>,
    template: Arc<Template>,
    schema: ComponentSchema,
}

impl Component {
    /// Slots are taken from the template; props come from the caller.
    pub fn new(
        name: impl Into<Arc<str>>,
        template: Arc<Template>,
        props: IndexMap<String, PropDecl>,
    ) -> Self {
        let slots = template
            .declared_slots()
            .into_iter()
            .map(|(slot, has_default)| (slot.to_string(), SlotDecl { has_default }))
            .collect();
        Self {
            name: name.into(),
            template,
            schema: ComponentSchema { props, slots },
        }
    }

    /// Parse `source` as a component named `name`.
    pub fn parse(name: &str, source: &str, props: IndexMap<String, PropDecl>) -> TemplateResult<Self> {
        let template = Template::parse(name, source)?;
        Ok(Self::new(name, Arc::new(template), props))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    pub fn schema(&self) -> &ComponentSchema {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ErrorKind;

    fn card_props() -> IndexMap<String, PropDecl> {
        IndexMap::from([
            ("title".to_string(), PropDecl::required(PropKind::Str)),
            ("size".to_string(), PropDecl::optional("md")),
        ])
    }

    #[test]
    fn test_slots_derived_from_template() {
        let card = Component::parse(
            "Card",
            "<div><{slot:header}>H</{slot:header}><{slot}/></div>",
            IndexMap::new(),
        )
        .unwrap();
        let slots = &card.schema().slots;
        assert_eq!(slots["header"], SlotDecl { has_default: true });
        assert_eq!(slots["default"], SlotDecl { has_default: false });
    }

    #[test]
    fn test_bind_defaults_and_attrs() {
        let schema = ComponentSchema {
            props: card_props(),
            slots: IndexMap::new(),
        };
        let bound = schema
            .bind(
                "Card",
                vec![
                    ("title".into(), Value::from("Hi")),
                    ("id".into(), Value::from("c1")),
                ],
                false,
            )
            .unwrap();
        let map: Map = bound.into_iter().collect();
        assert_eq!(map["title"], Value::from("Hi"));
        assert_eq!(map["size"], Value::from("md"));
        assert_eq!(map[ATTRS_BINDING].field("id"), Value::from("c1"));
    }

    #[test]
    fn test_bind_errors() {
        let schema = ComponentSchema {
            props: card_props(),
            slots: IndexMap::new(),
        };
        let err = schema.bind("Card", vec![], false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Binding);
        assert!(err.message().contains("missing required prop `title`"));

        let err = schema
            .bind("Card", vec![("title".into(), Value::from(3))], false)
            .unwrap_err();
        assert!(err.message().contains("expects str, got int"));

        let err = schema
            .bind(
                "Card",
                vec![("title".into(), Value::from("x")), ("extra".into(), Value::from(1))],
                true,
            )
            .unwrap_err();
        assert!(err.message().contains("has no prop `extra`"));
    }

    #[test]
    fn test_open_schema_binds_everything() {
        let schema = ComponentSchema::default();
        let bound = schema
            .bind("Any", vec![("x".into(), Value::from(1))], true)
            .unwrap();
        let map: Map = bound.into_iter().collect();
        assert_eq!(map["x"], Value::from(1));
        assert_eq!(map[ATTRS_BINDING].field("x"), Value::from(1));
    }

    #[test]
    fn test_props_from_toml() {
        let props = ComponentSchema::props_from_toml(
            r#"
            [props.title]
            required = true
            kind = "str"

            [props.count]
            default = 3
            kind = "float"
            "#,
        )
        .unwrap();
        assert_eq!(props["title"], PropDecl::required(PropKind::Str));
        assert_eq!(props["count"].default, Some(Value::from(3)));
        assert_eq!(props.get_index(0).map(|(k, _)| k.as_str()), Some("title"));
    }

    #[test]
    fn test_props_from_toml_rejects_bad_specs() {
        assert!(ComponentSchema::props_from_toml("[props.a]\nrequired = true\ndefault = 1").is_err());
        assert!(ComponentSchema::props_from_toml("[props.a]\ndefault = 1\nkind = \"str\"").is_err());
        assert!(ComponentSchema::props_from_toml("[props.a]\nrequird = true").is_err());
        assert!(ComponentSchema::props_from_toml("[props.a]\nkind = \"uuid\"").is_err());
    }
}
