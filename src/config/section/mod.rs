//! Configuration section definitions.
//!
//! Each module corresponds to a section in `veneer.toml`:
//!
//! | Module       | TOML Section   | Purpose                            |
//! |--------------|----------------|------------------------------------|
//! | `render`     | `[render]`     | Whitespace mode, nesting limit     |
//! | `cache`      | `[cache]`      | Parsed-template cache              |
//! | `components` | `[components]` | Component directory and extension  |
//! | `log`        | `[log]`        | Diagnostic verbosity               |

mod cache;
mod components;
mod log;
mod render;

pub use cache::CacheConfig;
pub use components::ComponentsConfig;
pub use log::LogConfig;
pub use render::RenderConfig;
