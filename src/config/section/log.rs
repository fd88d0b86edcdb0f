//! `[log]` section configuration.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Show `debug!` output (cache hits, registry loads).
    pub verbose: bool,
}
