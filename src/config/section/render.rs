//! `[render]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [render]
//! whitespace = "trim"     # keep | trim | dedent | strip
//! max_depth = 64          # component nesting limit
//! strict_props = false    # reject props a component does not declare
//! ```

use serde::Deserialize;

use crate::config::types::{ConfigDiagnostics, FieldPath};
use crate::render::RenderOptions;
use crate::template::WhitespaceMode;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Default whitespace mode for all templates.
    pub whitespace: WhitespaceMode,

    /// Maximum component nesting depth.
    pub max_depth: usize,

    pub strict_props: bool,
}

impl RenderConfig {
    pub const MAX_DEPTH: FieldPath = FieldPath::new("render.max_depth");

    pub fn options(&self) -> RenderOptions {
        RenderOptions {
            whitespace: self.whitespace,
            max_depth: self.max_depth,
            strict_props: self.strict_props,
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.max_depth == 0 {
            diag.error_with_hint(
                Self::MAX_DEPTH,
                "must be at least 1",
                "a depth of 0 forbids every component invocation",
            );
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        let options = RenderOptions::default();
        Self {
            whitespace: options.whitespace,
            max_depth: options.max_depth,
            strict_props: options.strict_props,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;
    use crate::template::WhitespaceMode;

    #[test]
    fn test_render_config() {
        let config = test_parse_config(
            "[render]\nwhitespace = \"dedent\"\nmax_depth = 8\nstrict_props = true",
        );
        let options = config.render.options();
        assert_eq!(options.whitespace, WhitespaceMode::Dedent);
        assert_eq!(options.max_depth, 8);
        assert!(options.strict_props);
    }

    #[test]
    fn test_render_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.render.whitespace, WhitespaceMode::Trim);
        assert_eq!(config.render.max_depth, 64);
        assert!(!config.render.strict_props);
    }

    #[test]
    fn test_unknown_whitespace_mode_fails() {
        assert!(crate::config::EngineConfig::from_str("[render]\nwhitespace = \"squash\"").is_err());
    }
}
