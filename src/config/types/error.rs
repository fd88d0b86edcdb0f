//! Errors raised while loading `veneer.toml`.
//!
//! Reading and TOML syntax fail fast. Semantic checks go through
//! [`ConfigDiagnostics`] so a single load reports every bad field:
//!
//! ```text
//! error[render.max_depth]: must be at least 1
//!   = hint: the default is 64
//! error[components.extension]: must not be empty
//! ```

use super::FieldPath;
use owo_colors::OwoColorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config is not valid TOML")]
    Toml(#[from] toml::de::Error),

    // no #[from]: source() would print the diagnostics twice
    #[error("{0}")]
    Diagnostics(ConfigDiagnostics),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

/// One problem with one field.
#[derive(Debug, Clone)]
pub struct ConfigDiagnostic {
    pub level: Level,
    pub field: FieldPath,
    pub message: String,
    pub hint: Option<String>,
}

impl ConfigDiagnostic {
    pub fn new(level: Level, field: FieldPath, message: impl Into<String>) -> Self {
        Self {
            level,
            field,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for ConfigDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Error => write!(f, "{}", "error".red().bold())?,
            Level::Warning => write!(f, "{}", "warning".yellow().bold())?,
        }
        write!(f, "[{}]: {}", self.field.as_str().cyan(), self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  {} {hint}", "= hint:".dimmed())?;
        }
        Ok(())
    }
}

/// Diagnostics gathered by the section validators.
#[derive(Debug, Default)]
pub struct ConfigDiagnostics {
    items: Vec<ConfigDiagnostic>,
}

impl ConfigDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: FieldPath, message: impl Into<String>) {
        self.items.push(ConfigDiagnostic::new(Level::Error, field, message));
    }

    pub fn error_with_hint(
        &mut self,
        field: FieldPath,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.items
            .push(ConfigDiagnostic::new(Level::Error, field, message).with_hint(hint));
    }

    pub fn warn(&mut self, field: FieldPath, message: impl Into<String>) {
        self.items.push(ConfigDiagnostic::new(Level::Warning, field, message));
    }

    pub fn print_warnings(&self) {
        for warning in self.warnings() {
            crate::log!("config"; "{}", warning);
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &ConfigDiagnostic> {
        self.items.iter().filter(|d| d.level == Level::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ConfigDiagnostic> {
        self.items.iter().filter(|d| d.level == Level::Warning)
    }

    /// Number of errors; warnings are not counted.
    pub fn len(&self) -> usize {
        self.errors().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Err(self)` when any error was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ConfigDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.len();
        let noun = if count == 1 { "error" } else { "errors" };
        write!(f, "{}", format_args!("invalid config ({count} {noun})").bold())?;
        for err in self.errors() {
            write!(f, "\n{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigDiagnostics {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_names_the_file() {
        let err = ConfigError::Io(
            PathBuf::from("veneer.toml"),
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.to_string(), "cannot read config file `veneer.toml`");
    }

    #[test]
    fn test_diagnostics_collect_all_errors() {
        let mut diag = ConfigDiagnostics::new();
        diag.error(FieldPath::new("render.max_depth"), "must be at least 1");
        diag.error_with_hint(
            FieldPath::new("components.extension"),
            "must not be empty",
            "use `html`",
        );
        diag.warn(FieldPath::new("cache.max_entries"), "ignored");
        assert_eq!(diag.len(), 2);
        assert_eq!(diag.warnings().count(), 1);

        let err = diag.into_result().unwrap_err();
        let display = format!("{err}");
        assert!(display.contains("2 errors"));
        assert!(display.contains("render.max_depth"));
        assert!(display.contains("use `html`"));
        assert!(!display.contains("ignored"));
    }

    #[test]
    fn test_warnings_alone_pass() {
        let mut diag = ConfigDiagnostics::new();
        diag.warn(FieldPath::new("cache.max_entries"), "ignored");
        assert!(diag.is_empty());
        assert!(diag.into_result().is_ok());
    }
}
