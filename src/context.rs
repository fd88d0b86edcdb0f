//! Binding context: the names an expression can see during a render.
//!
//! A context is two layers:
//!
//! | Layer   | Shared | Contents                                          |
//! |---------|--------|---------------------------------------------------|
//! | globals | `Arc`  | helpers and site-wide data, visible in components |
//! | locals  | no     | per-request data, or a component's resolved props |
//!
//! Loaders never mutate a shared namespace: a [`DataLoader`] returns a
//! [`LoaderOutput`] that is merged into the locals before the tree walk.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::value::Value;

type Bindings = FxHashMap<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct Context {
    globals: Arc<Bindings>,
    locals: Bindings,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a JSON object; non-object JSON yields an
    /// empty context.
    pub fn from_json(json: serde_json::Value) -> Self {
        let mut ctx = Self::new();
        if let serde_json::Value::Object(obj) = json {
            for (k, v) in obj {
                ctx.insert(k, Value::from(v));
            }
        }
        ctx
    }

    /// Builder-style local binding.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.locals.insert(name.into(), value.into());
    }

    /// Bind a name in the globals layer (copy-on-write when shared).
    pub fn insert_global(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        Arc::make_mut(&mut self.globals).insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.locals.get(name).or_else(|| self.globals.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Context for a component body: same globals, fresh locals.
    pub fn child(&self, locals: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            globals: Arc::clone(&self.globals),
            locals: locals.into_iter().collect(),
        }
    }

    /// Run a loader and merge its output into the locals.
    pub fn apply_loader(&mut self, loader: &dyn DataLoader) -> anyhow::Result<()> {
        let output = loader.load(self)?;
        self.merge(output);
        Ok(())
    }

    /// Merge loader output; later keys overwrite existing locals.
    pub fn merge(&mut self, output: LoaderOutput) {
        self.locals.extend(output.entries);
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Context {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = Self::new();
        ctx.extend(iter);
        ctx
    }
}

// ============================================================================
// Loaders
// ============================================================================

/// Key/value result of a loader step.
#[derive(Debug, Clone, Default)]
pub struct LoaderOutput {
    entries: Vec<(String, Value)>,
}

impl LoaderOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Produces extra bindings for a render from the bindings already present
/// (for example resolved path parameters).
pub trait DataLoader {
    fn load(&self, ctx: &Context) -> anyhow::Result<LoaderOutput>;
}

impl<F> DataLoader for F
where
    F: Fn(&Context) -> anyhow::Result<LoaderOutput>,
{
    fn load(&self, ctx: &Context) -> anyhow::Result<LoaderOutput> {
        self(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_locals_shadow_globals() {
        let mut ctx = Context::new().with("name", "local");
        ctx.insert_global("name", "global");
        ctx.insert_global("site", "veneer");
        assert_eq!(ctx.get("name"), Some(&Value::from("local")));
        assert_eq!(ctx.get("site"), Some(&Value::from("veneer")));
        assert!(ctx.get("missing").is_none());
    }

    #[test]
    fn test_child_keeps_globals_only() {
        let mut ctx = Context::new().with("user", "ann");
        ctx.insert_global("site", "veneer");
        let child = ctx.child([("title".to_string(), Value::from("Hi"))]);
        assert!(child.get("user").is_none());
        assert_eq!(child.get("site"), Some(&Value::from("veneer")));
        assert_eq!(child.get("title"), Some(&Value::from("Hi")));
    }

    #[test]
    fn test_apply_loader_merges_output() {
        let mut ctx = Context::new().with("id", 7);
        let loader = |ctx: &Context| -> anyhow::Result<LoaderOutput> {
            let id = ctx.get("id").cloned().unwrap_or_default();
            Ok(LoaderOutput::new().set("post", id).set("loaded", true))
        };
        ctx.apply_loader(&loader).unwrap();
        assert_eq!(ctx.get("post"), Some(&Value::from(7)));
        assert_eq!(ctx.get("loaded"), Some(&Value::from(true)));
    }

    #[test]
    fn test_failing_loader_leaves_context_untouched() {
        let mut ctx = Context::new().with("id", 1);
        let loader = |_: &Context| -> anyhow::Result<LoaderOutput> { anyhow::bail!("db down") };
        assert!(ctx.apply_loader(&loader).is_err());
        assert!(!ctx.contains("post"));
    }

    #[test]
    fn test_from_json() {
        let ctx = Context::from_json(json!({"a": 1, "b": {"c": "d"}}));
        assert_eq!(ctx.get("a"), Some(&Value::from(1)));
        assert_eq!(ctx.get("b").unwrap().field("c"), Value::from("d"));
        assert!(Context::from_json(json!([1, 2])).get("0").is_none());
    }
}
