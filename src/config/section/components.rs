//! `[components]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [components]
//! dir = "components"   # relative to veneer.toml, `~` is expanded
//! extension = "html"   # `layouts.Base` -> components/layouts/Base.html
//! ```
//!
//! Without `dir`, components must be registered programmatically.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::types::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ComponentsConfig {
    pub dir: Option<PathBuf>,

    /// File extension of component templates, without the dot.
    pub extension: String,
}

impl ComponentsConfig {
    pub const DIR: FieldPath = FieldPath::new("components.dir");
    pub const EXTENSION: FieldPath = FieldPath::new("components.extension");

    /// Expand `~` and resolve `dir` against the config file's directory.
    pub fn normalize(&mut self, root: &Path) {
        if let Some(dir) = self.dir.take() {
            let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
            let path = PathBuf::from(expanded);
            self.dir = Some(if path.is_relative() {
                root.join(path)
            } else {
                path
            });
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.extension.is_empty() {
            diag.error_with_hint(Self::EXTENSION, "must not be empty", "use `html`");
        } else if self.extension.contains('.') {
            diag.error_with_hint(
                Self::EXTENSION,
                format!("`{}` must not contain a dot", self.extension),
                "write the extension without the leading dot",
            );
        }

        if let Some(dir) = &self.dir
            && !dir.is_dir()
        {
            diag.error(
                Self::DIR,
                format!("directory `{}` does not exist", dir.display()),
            );
        }
    }
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            extension: "html".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_components_config() {
        let config = test_parse_config("[components]\ndir = \"ui\"\nextension = \"vn\"");
        assert_eq!(config.components.dir, Some(PathBuf::from("ui")));
        assert_eq!(config.components.extension, "vn");
    }

    #[test]
    fn test_normalize_relative_and_absolute() {
        let mut section = ComponentsConfig {
            dir: Some(PathBuf::from("ui")),
            ..ComponentsConfig::default()
        };
        section.normalize(Path::new("/site"));
        assert_eq!(section.dir, Some(PathBuf::from("/site/ui")));

        let mut section = ComponentsConfig {
            dir: Some(PathBuf::from("/abs/ui")),
            ..ComponentsConfig::default()
        };
        section.normalize(Path::new("/site"));
        assert_eq!(section.dir, Some(PathBuf::from("/abs/ui")));
    }

    #[test]
    fn test_validate_extension() {
        let mut diag = ConfigDiagnostics::new();
        ComponentsConfig {
            extension: ".html".into(),
            ..ComponentsConfig::default()
        }
        .validate(&mut diag);
        ComponentsConfig {
            extension: String::new(),
            dir: Some(PathBuf::from("/definitely/not/here")),
        }
        .validate(&mut diag);
        assert_eq!(diag.len(), 3);
    }
}
