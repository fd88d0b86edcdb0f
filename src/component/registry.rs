//! Component lookup.
//!
//! The renderer never resolves paths itself; it asks a [`ComponentRegistry`]
//! for a name and gets back a parsed component with its schema.
//!
//! - [`MemoryRegistry`]: components registered programmatically
//! - [`DirRegistry`]: `layouts.Base` -> `<root>/layouts/Base.<ext>`, reloaded
//!   whenever the file (or its `.props.toml` sidecar) changes on disk

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use indexmap::IndexMap;
use jwalk::WalkDir;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::{Component, ComponentSchema, PropDecl};
use crate::debug;
use crate::template::{Template, TemplateError, TemplateResult};

/// Source of components for the renderer.
pub trait ComponentRegistry: Send + Sync {
    /// Look up a component; unknown names are a binding error.
    fn resolve(&self, name: &str) -> TemplateResult<Arc<Component>>;

    /// Names currently available, sorted.
    fn names(&self) -> Vec<String>;
}

fn unknown(name: &str) -> TemplateError {
    TemplateError::binding(format!("unknown component `{name}`"))
}

// ============================================================================
// MemoryRegistry
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryRegistry {
    components: RwLock<FxHashMap<String, Arc<Component>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with an open schema.
    pub fn register(&self, name: &str, source: &str) -> TemplateResult<Arc<Component>> {
        self.register_with(name, source, IndexMap::new())
    }

    /// Register a component with declared props.
    pub fn register_with(
        &self,
        name: &str,
        source: &str,
        props: IndexMap<String, PropDecl>,
    ) -> TemplateResult<Arc<Component>> {
        let component = Component::parse(name, source, props)?;
        Ok(self.insert(component))
    }

    /// Insert an already-built component, replacing any previous one.
    pub fn insert(&self, component: Component) -> Arc<Component> {
        let component = Arc::new(component);
        self.components
            .write()
            .insert(component.name().to_string(), Arc::clone(&component));
        component
    }

    pub fn remove(&self, name: &str) -> bool {
        self.components.write().remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.components.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.read().is_empty()
    }
}

impl ComponentRegistry for MemoryRegistry {
    fn resolve(&self, name: &str) -> TemplateResult<Arc<Component>> {
        self.components
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| unknown(name))
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.components.read().keys().cloned().collect();
        names.sort();
        names
    }
}

// ============================================================================
// DirRegistry
// ============================================================================

const SIDECAR_EXTENSION: &str = "props.toml";

/// Modification times of the template and its sidecar.
type Stamp = (Option<SystemTime>, Option<SystemTime>);

#[derive(Debug)]
struct Loaded {
    stamp: Stamp,
    component: Arc<Component>,
}

/// Components loaded from a directory tree.
#[derive(Debug)]
pub struct DirRegistry {
    root: PathBuf,
    extension: String,
    loaded: RwLock<FxHashMap<String, Loaded>>,
}

impl DirRegistry {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            loaded: RwLock::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing a dotted component name.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        let valid = name.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c == '_' || c == '-' || c.is_alphanumeric())
        });
        if !valid {
            return None;
        }
        let mut path = self.root.clone();
        path.extend(name.split('.'));
        path.set_extension(&self.extension);
        Some(path)
    }

    fn load(&self, name: &str, path: &Path, sidecar: &Path) -> TemplateResult<Component> {
        let source = fs::read_to_string(path).map_err(|err| {
            TemplateError::binding(format!(
                "cannot read component `{name}` from {}: {err}",
                path.display()
            ))
        })?;
        let props = if sidecar.is_file() {
            let text = fs::read_to_string(sidecar).map_err(|err| {
                TemplateError::binding(format!("cannot read {}: {err}", sidecar.display()))
            })?;
            ComponentSchema::props_from_toml(&text).map_err(|err| {
                TemplateError::binding(format!("invalid prop schema {}: {err:#}", sidecar.display()))
            })?
        } else {
            IndexMap::new()
        };
        let template = Template::parse(path.display().to_string(), &source)?;
        Ok(Component::new(name, Arc::new(template), props))
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl ComponentRegistry for DirRegistry {
    fn resolve(&self, name: &str) -> TemplateResult<Arc<Component>> {
        let path = self.path_for(name).ok_or_else(|| unknown(name))?;
        let sidecar = path.with_extension(SIDECAR_EXTENSION);
        let stamp = (modified(&path), modified(&sidecar));
        if stamp.0.is_none() {
            return Err(unknown(name));
        }

        if let Some(hit) = self.loaded.read().get(name)
            && hit.stamp == stamp
        {
            return Ok(Arc::clone(&hit.component));
        }

        let component = Arc::new(self.load(name, &path, &sidecar)?);
        debug!("registry"; "loaded `{}` from {}", name, path.display());
        self.loaded.write().insert(
            name.to_string(),
            Loaded {
                stamp,
                component: Arc::clone(&component),
            },
        );
        Ok(component)
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == self.extension.as_str()))
            .filter_map(|p| {
                let rel = p.strip_prefix(&self.root).ok()?.with_extension("");
                let parts = rel.iter().map(|s| s.to_str()).collect::<Option<Vec<_>>>()?;
                Some(parts.join("."))
            })
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_memory_register_and_resolve() {
        let registry = MemoryRegistry::new();
        registry.register("Card", "<div><{slot}/></div>").unwrap();
        let card = registry.resolve("Card").unwrap();
        assert!(card.schema().has_slot("default"));
        assert_eq!(registry.names(), vec!["Card"]);
        assert!(registry.remove("Card"));
        assert_eq!(registry.resolve("Card").unwrap_err().kind(), ErrorKind::Binding);
    }

    #[test]
    fn test_memory_register_reports_syntax_errors() {
        let registry = MemoryRegistry::new();
        let err = registry.register("Bad", "<div>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dir_resolves_dotted_names() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "layouts/Base.html", "<html><{slot}/></html>");
        write(
            dir.path(),
            "layouts/Base.props.toml",
            "[props.title]\nrequired = true\n",
        );
        let registry = DirRegistry::new(dir.path(), "html");

        let base = registry.resolve("layouts.Base").unwrap();
        assert_eq!(base.name(), "layouts.Base");
        assert!(base.schema().props["title"].required);
        assert_eq!(registry.resolve("Missing").unwrap_err().kind(), ErrorKind::Binding);
        assert!(registry.resolve("../etc").is_err());
    }

    #[test]
    fn test_dir_reuses_and_reloads() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Card.html", "<b>v1</b>");
        let registry = DirRegistry::new(dir.path(), "html");

        let first = registry.resolve("Card").unwrap();
        let again = registry.resolve("Card").unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        // a sidecar appearing changes the stamp
        write(dir.path(), "Card.props.toml", "[props.x]\ndefault = 1\n");
        let reloaded = registry.resolve("Card").unwrap();
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert!(reloaded.schema().props.contains_key("x"));
    }

    #[test]
    fn test_dir_bad_sidecar_is_binding_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Card.html", "<b/>");
        write(dir.path(), "Card.props.toml", "[props.x]\nkind = 5\n");
        let err = DirRegistry::new(dir.path(), "html").resolve("Card").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Binding);
        assert!(err.message().contains("invalid prop schema"));
    }

    #[test]
    fn test_dir_names() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Card.html", "");
        write(dir.path(), "layouts/Base.html", "");
        write(dir.path(), "layouts/Base.props.toml", "");
        write(dir.path(), "notes.txt", "");
        let registry = DirRegistry::new(dir.path(), "html");
        assert_eq!(registry.names(), vec!["Card", "layouts.Base"]);
    }
}
