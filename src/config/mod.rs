//! Engine configuration from `veneer.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # One file per TOML section
//! │   ├── cache      # [cache]
//! │   ├── components # [components]
//! │   ├── log        # [log]
//! │   └── render     # [render]
//! ├── types/         # ConfigError, ConfigDiagnostics, FieldPath
//! └── mod.rs         # EngineConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section        | Purpose                                          |
//! |----------------|--------------------------------------------------|
//! | `[render]`     | Default whitespace mode, nesting limit, strictness |
//! | `[cache]`      | Parsed-template cache on/off and capacity        |
//! | `[components]` | Directory and extension for component lookup     |
//! | `[log]`        | Verbose diagnostics                              |
//!
//! Every section is optional; an empty file is a valid configuration.

pub mod section;
pub mod types;

pub use section::{CacheConfig, ComponentsConfig, LogConfig, RenderConfig};
pub use types::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath, Level};

use crate::log;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Conventional config file name.
pub const CONFIG_FILE: &str = "veneer.toml";

// ============================================================================
// root configuration
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Absolute path to the config file, empty when built in memory
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub components: ComponentsConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl EngineConfig {
    /// Load, normalize and validate a config file.
    ///
    /// Unknown keys are reported as warnings, not errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let mut config = Self::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        config.config_path = path.to_path_buf();
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.set_root(&root);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string, warning about unknown keys.
    pub fn from_str(content: &str) -> Result<Self> {
        let (config, ignored) = Self::parse_with_ignored(content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String]) {
        log!("warning"; "ignoring unknown fields in {}:", CONFIG_FILE);
        for field in fields {
            log!("warning"; "- {}", field);
        }
    }

    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Set the root directory and resolve relative paths against it.
    pub fn set_root(&mut self, root: &Path) {
        self.root = root.to_path_buf();
        self.components.normalize(root);
    }

    /// Collect every validation problem before failing.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.render.validate(&mut diag);
        self.cache.validate(&mut diag);
        self.components.validate(&mut diag);

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> EngineConfig {
    let (parsed, ignored) = EngineConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(EngineConfig::from_str("[render\nmax_depth = 1").is_err());
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = test_parse_config("");
        assert_eq!(config, EngineConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[render]\nmax_depth = 3\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = EngineConfig::parse_with_ignored(content).unwrap();
        assert_eq!(config.render.max_depth, 3);
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let config = test_parse_config(
            "[render]\nmax_depth = 0\n[cache]\nmax_entries = 0\n[components]\nextension = \"\"",
        );
        let err = config.validate().unwrap_err();
        let Some(ConfigError::Diagnostics(diag)) = err.downcast_ref::<ConfigError>() else {
            panic!("expected diagnostics, got {err:?}");
        };
        assert_eq!(diag.len(), 3);
    }

    #[test]
    fn test_load_resolves_component_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("ui")).unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[components]\ndir = \"ui\"\n[log]\nverbose = true").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.components.dir, Some(dir.path().join("ui")));
        assert_eq!(config.get_root(), dir.path());
        assert!(config.log.verbose);
    }

    #[test]
    fn test_load_missing_component_dir_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[components]\ndir = \"nowhere\"").unwrap();
        let err = EngineConfig::load(&path).unwrap_err();
        assert!(format!("{err}").contains("components.dir"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/definitely/not/veneer.toml").unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::Io(..))));
    }
}
