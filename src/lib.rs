//! Veneer - a hypermedia template compiler.
//!
//! Templates are parsed once into an immutable node tree and rendered
//! against a binding context, either in full or as a selection of named
//! fragments for partial page updates.
//!
//! # Modules
//!
//! | Module      | Purpose                                            |
//! |-------------|----------------------------------------------------|
//! | `template`  | Lexer, parser, node tree, errors with locations    |
//! | `expr`      | Embedded expression language                       |
//! | `value`     | Dynamic values and the trusted-markup wrapper      |
//! | `context`   | Binding context and data loaders                   |
//! | `render`    | Tree walk: attributes, slots, fragments, whitespace |
//! | `component` | Component schemas and registries                   |
//! | `cache`     | Content-addressed cache of parsed templates        |
//! | `config`    | `veneer.toml`                                      |
//! | `engine`    | Facade tying the above together                    |
//!
//! # Example
//!
//! ```ignore
//! use veneer::{Context, Engine, Selection};
//!
//! let engine = Engine::default();
//! let page = engine.parse("list.html", r#"<ul><li _fragment id="first">{item}</li></ul>"#)?;
//! let ctx = Context::new().with("item", "<one>");
//! assert_eq!(engine.render(&page, &ctx)?, r#"<ul><li id="first">&lt;one&gt;</li></ul>"#);
//! assert_eq!(
//!     engine.render_fragments(&page, &ctx, &Selection::parse_list("first"))?,
//!     r#"<li id="first">&lt;one&gt;</li>"#,
//! );
//! ```

pub mod logger;

pub mod cache;
pub mod component;
pub mod config;
pub mod context;
pub mod engine;
pub mod expr;
pub mod render;
pub mod template;
pub mod value;

pub use cache::{TEMPLATE_CACHE, TemplateCache};
pub use component::{
    ATTRS_BINDING, Component, ComponentRegistry, ComponentSchema, DirRegistry, MemoryRegistry,
    PropDecl, PropKind, SlotDecl,
};
pub use config::EngineConfig;
pub use context::{Context, DataLoader, LoaderOutput};
pub use engine::Engine;
pub use render::{RenderOptions, Selection, render};
pub use template::{
    ErrorKind, Location, Origin, Template, TemplateError, TemplateResult, WhitespaceMode,
};
pub use value::{Map, Markup, Value};
