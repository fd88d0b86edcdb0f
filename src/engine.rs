//! Engine facade: configuration, component registry and template cache.
//!
//! ```ignore
//! let engine = Engine::load("veneer.toml")?;
//! let page = engine.parse("page.html", &source)?;
//! let html = engine.render(&page, &ctx)?;
//! let rows = engine.render_fragments(&page, &ctx, &Selection::parse_list("row-1, row-2"))?;
//! ```
//!
//! Configuration sits behind an `ArcSwap`, so a reload is visible to the
//! next render without blocking renders in flight. The registry is chosen
//! once at construction and does not follow later `[components]` changes.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use rayon::prelude::*;

use crate::cache::TemplateCache;
use crate::component::{ComponentRegistry, DirRegistry, MemoryRegistry};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::render::{self, RenderOptions, Selection};
use crate::template::{Template, TemplateResult};
use crate::{debug, logger};

pub struct Engine {
    config: ArcSwap<EngineConfig>,
    registry: Arc<dyn ComponentRegistry>,
    cache: TemplateCache,
}

impl Engine {
    /// Build from a config, loading components from `[components] dir`
    /// when set and starting with an empty in-memory registry otherwise.
    pub fn new(config: EngineConfig) -> Self {
        let registry: Arc<dyn ComponentRegistry> = match &config.components.dir {
            Some(dir) => Arc::new(DirRegistry::new(dir, &config.components.extension)),
            None => Arc::new(MemoryRegistry::new()),
        };
        Self::with_registry(config, registry)
    }

    /// `[log] verbose = true` turns on process-wide debug output; an engine
    /// built without it leaves the current setting alone.
    pub fn with_registry(config: EngineConfig, registry: Arc<dyn ComponentRegistry>) -> Self {
        if config.log.verbose {
            logger::set_verbose(true);
        }
        let cache = TemplateCache::new(cache_capacity(&config));
        Self {
            config: ArcSwap::from_pointee(config),
            registry,
            cache,
        }
    }

    /// Load `veneer.toml` (or any path) and build an engine from it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(EngineConfig::load(path)?))
    }

    #[inline]
    pub fn config(&self) -> Arc<EngineConfig> {
        self.config.load_full()
    }

    /// Replace the configuration atomically.
    ///
    /// Verbosity is only written when `[log] verbose` itself changed.
    pub fn reload_config(&self, config: EngineConfig) {
        if config.log.verbose != self.config.load().log.verbose {
            logger::set_verbose(config.log.verbose);
        }
        self.cache.set_capacity(cache_capacity(&config));
        self.config.store(Arc::new(config));
    }

    /// Re-read the config file if it changed.
    ///
    /// Returns `Ok(true)` if config was updated, `Ok(false)` if unchanged.
    pub fn reload(&self) -> Result<bool> {
        let current = self.config();
        if current.config_path.as_os_str().is_empty() {
            return Ok(false);
        }
        let fresh = EngineConfig::load(&current.config_path)?;
        if fresh == *current {
            return Ok(false);
        }
        debug!("config"; "reloaded {}", current.config_path.display());
        self.reload_config(fresh);
        Ok(true)
    }

    /// Render options from the current `[render]` section.
    pub fn options(&self) -> RenderOptions {
        self.config.load().render.options()
    }

    pub fn registry(&self) -> &Arc<dyn ComponentRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    // ========================================================================
    // parsing
    // ========================================================================

    /// Parse through the cache when `[cache] enabled`.
    pub fn parse(&self, name: &str, source: &str) -> TemplateResult<Arc<Template>> {
        if self.config.load().cache.enabled {
            self.cache.get_or_parse(name, source)
        } else {
            Template::parse(name, source).map(Arc::new)
        }
    }

    /// Parse many `(name, source)` pairs in parallel, results in input order.
    pub fn parse_batch<N, S>(&self, sources: &[(N, S)]) -> Vec<TemplateResult<Arc<Template>>>
    where
        N: AsRef<str> + Sync,
        S: AsRef<str> + Sync,
    {
        sources
            .par_iter()
            .map(|(name, source)| self.parse(name.as_ref(), source.as_ref()))
            .collect()
    }

    // ========================================================================
    // rendering
    // ========================================================================

    pub fn render(&self, template: &Template, ctx: &Context) -> TemplateResult<String> {
        self.render_with(template, ctx, &self.options(), None)
    }

    /// Render only the selected fragments, in document order.
    pub fn render_fragments(
        &self,
        template: &Template,
        ctx: &Context,
        selection: &Selection,
    ) -> TemplateResult<String> {
        self.render_with(template, ctx, &self.options(), Some(selection))
    }

    pub fn render_with(
        &self,
        template: &Template,
        ctx: &Context,
        options: &RenderOptions,
        selection: Option<&Selection>,
    ) -> TemplateResult<String> {
        debug!("render"; "{} ({})", template.name(), match selection {
            Some(sel) => format!("{} fragments", sel.len()),
            None => "full".to_string(),
        });
        render::render(template, ctx, self.registry.as_ref(), options, selection)
    }

    /// One independent render per incoming context.
    ///
    /// The producer owns pacing and cancellation: dropping the iterator
    /// stops rendering. Options are read per item, so a config reload
    /// applies from the next update on.
    pub fn stream<'a, I>(
        &'a self,
        template: &'a Template,
        selection: Option<&'a Selection>,
        contexts: I,
    ) -> impl Iterator<Item = TemplateResult<String>> + 'a
    where
        I: IntoIterator<Item = Context>,
        I::IntoIter: 'a,
    {
        contexts
            .into_iter()
            .map(move |ctx| self.render_with(template, &ctx, &self.options(), selection))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn cache_capacity(config: &EngineConfig) -> usize {
    if config.cache.enabled {
        config.cache.max_entries
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LoaderOutput;
    use crate::template::{ErrorKind, WhitespaceMode};
    use std::fs;
    use tempfile::TempDir;

    fn memory_engine() -> (Engine, Arc<MemoryRegistry>) {
        let registry = Arc::new(MemoryRegistry::new());
        let engine = Engine::with_registry(EngineConfig::default(), registry.clone());
        (engine, registry)
    }

    #[test]
    fn test_parse_uses_cache() {
        let (engine, _) = memory_engine();
        let a = engine.parse("a.html", "<p>{x}</p>").unwrap();
        let b = engine.parse("a.html", "<p>{x}</p>").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(engine.cache().len(), 1);

        let mut config = EngineConfig::default();
        config.cache.enabled = false;
        engine.reload_config(config);
        let c = engine.parse("a.html", "<p>{x}</p>").unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn test_parse_batch_keeps_order() {
        let (engine, _) = memory_engine();
        let results = engine.parse_batch(&[("a", "<b>a</b>"), ("bad", "<i>"), ("c", "c")]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name(), "a");
        assert_eq!(results[1].as_ref().unwrap_err().kind(), ErrorKind::Syntax);
        assert_eq!(results[2].as_ref().unwrap().name(), "c");
    }

    #[test]
    fn test_render_and_fragments() {
        let (engine, registry) = memory_engine();
        registry
            .register("Row", r#"<tr _fragment id={"row-" + key}><td>{label}</td></tr>"#)
            .unwrap();
        let page = engine
            .parse(
                "table.html",
                r#"<table><{Row} key="1" label="one"/><{Row} key="2" label="two"/></table>"#,
            )
            .unwrap();
        let ctx = Context::new();

        assert_eq!(
            engine.render(&page, &ctx).unwrap(),
            r#"<table><tr id="row-1"><td>one</td></tr><tr id="row-2"><td>two</td></tr></table>"#
        );
        assert_eq!(
            engine
                .render_fragments(&page, &ctx, &Selection::parse_list("row-2"))
                .unwrap(),
            r#"<tr id="row-2"><td>two</td></tr>"#
        );
    }

    #[test]
    fn test_stream_renders_each_context() {
        let (engine, _) = memory_engine();
        let page = engine
            .parse("live.html", r#"<div><span _fragment id="n">{n}</span></div>"#)
            .unwrap();
        let selection = Selection::new(["n"]);
        let updates: Vec<_> = engine
            .stream(&page, Some(&selection), (1..=3).map(|n| Context::new().with("n", n)))
            .collect::<TemplateResult<_>>()
            .unwrap();
        assert_eq!(
            updates,
            [
                r#"<span id="n">1</span>"#,
                r#"<span id="n">2</span>"#,
                r#"<span id="n">3</span>"#
            ]
        );
    }

    #[test]
    fn test_loader_output_feeds_render() {
        let (engine, _) = memory_engine();
        let page = engine.parse("user.html", "<p>{user}</p>").unwrap();
        let mut ctx = Context::new().with("id", 7);
        ctx.apply_loader(&|ctx: &Context| -> Result<LoaderOutput> {
            let id = ctx.get("id").cloned().unwrap_or_default();
            Ok(LoaderOutput::new().set("user", format!("user-{}", id.to_text()?)))
        })
        .unwrap();
        assert_eq!(engine.render(&page, &ctx).unwrap(), "<p>user-7</p>");
    }

    #[test]
    fn test_reload_config_changes_options() {
        let (engine, _) = memory_engine();
        assert_eq!(engine.options().whitespace, WhitespaceMode::Trim);
        let mut config = EngineConfig::default();
        config.render.whitespace = WhitespaceMode::Strip;
        engine.reload_config(config);
        assert_eq!(engine.options().whitespace, WhitespaceMode::Strip);

        let page = engine.parse("p.html", "<p>\n  x\n</p>").unwrap();
        assert_eq!(engine.render(&page, &Context::new()).unwrap(), "<p>x</p>");
        // not loaded from disk, nothing to re-read
        assert!(!engine.reload().unwrap());
    }

    #[test]
    fn test_verbosity_only_follows_explicit_settings() {
        let _guard = logger::VERBOSE_LOCK.lock();
        let before = logger::is_verbose();
        logger::set_verbose(true);

        // a second engine with default config does not silence the first
        let (engine, _) = memory_engine();
        assert!(logger::is_verbose());
        engine.reload_config(EngineConfig::default());
        assert!(logger::is_verbose());

        let mut verbose = EngineConfig::default();
        verbose.log.verbose = true;
        engine.reload_config(verbose);
        engine.reload_config(EngineConfig::default());
        assert!(!logger::is_verbose());

        logger::set_verbose(before);
    }

    #[test]
    fn test_load_with_component_dir() {
        let dir = TempDir::new().unwrap();
        let ui = dir.path().join("ui/layouts");
        fs::create_dir_all(&ui).unwrap();
        fs::write(ui.join("Base.vn"), "<main><{slot}/></main>").unwrap();
        let config_path = dir.path().join("veneer.toml");
        fs::write(&config_path, "[components]\ndir = \"ui\"\nextension = \"vn\"").unwrap();

        let engine = Engine::load(&config_path).unwrap();
        assert_eq!(engine.registry().names(), vec!["layouts.Base"]);
        let page = engine
            .parse("page.vn", "<{layouts.Base}><h1>{title}</h1></{layouts.Base}>")
            .unwrap();
        let ctx = Context::new().with("title", "Home");
        assert_eq!(engine.render(&page, &ctx).unwrap(), "<main><h1>Home</h1></main>");

        fs::write(&config_path, "[components]\ndir = \"ui\"\nextension = \"vn\"\n[render]\nmax_depth = 4").unwrap();
        assert!(engine.reload().unwrap());
        assert_eq!(engine.options().max_depth, 4);
        assert!(!engine.reload().unwrap());
    }
}
