//! Fragment selection.
//!
//! A [`Selection`] is the set of fragment names a caller wants rendered.
//! Names that match no fragment simply contribute nothing: selections often
//! come from client request headers, and a partial mismatch must not break
//! the fragments that do exist.

use rustc_hash::FxHashSet;

use crate::context::Context;
use crate::template::{FragmentName, TemplateError, TemplateResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    names: FxHashSet<String>,
}

impl Selection {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma- or whitespace-separated list (`"a, b c"`).
    pub fn parse_list(list: &str) -> Self {
        Self::new(
            list.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|name| !name.is_empty()),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Resolve a fragment marker's name for this render.
pub(crate) fn resolve_name(name: &FragmentName, ctx: &Context) -> TemplateResult<String> {
    match name {
        FragmentName::Static(name) => Ok(name.clone()),
        FragmentName::Dynamic(expr) => {
            let value = expr.eval(ctx)?;
            let name = value.to_text()?.trim().to_string();
            if name.is_empty() {
                Err(TemplateError::binding(
                    "fragment name resolved to an empty string",
                ))
            } else {
                Ok(name)
            }
        }
    }
}
