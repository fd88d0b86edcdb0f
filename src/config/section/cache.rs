//! `[cache]` section configuration.
//!
//! ```toml
//! [cache]
//! enabled = true
//! max_entries = 512
//! ```

use serde::Deserialize;

use crate::cache::DEFAULT_CAPACITY;
use crate::config::types::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Memoize parsed templates by content hash.
    pub enabled: bool,

    /// Entries kept before eviction.
    pub max_entries: usize,
}

impl CacheConfig {
    pub const MAX_ENTRIES: FieldPath = FieldPath::new("cache.max_entries");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.enabled && self.max_entries == 0 {
            diag.error_with_hint(
                Self::MAX_ENTRIES,
                "must be at least 1 while the cache is enabled",
                "set `enabled = false` to turn caching off",
            );
        }
        if !self.enabled && self.max_entries != DEFAULT_CAPACITY {
            diag.warn(Self::MAX_ENTRIES, "ignored while the cache is disabled");
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: DEFAULT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;
    use crate::config::types::ConfigDiagnostics;

    #[test]
    fn test_cache_config() {
        let config = test_parse_config("[cache]\nenabled = false\nmax_entries = 0");
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.max_entries, 0);
    }

    #[test]
    fn test_cache_config_defaults() {
        let config = test_parse_config("");
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_entries, 512);
    }

    #[test]
    fn test_capacity_of_disabled_cache_only_warns() {
        let config = test_parse_config("[cache]\nenabled = false\nmax_entries = 0");
        let mut diag = ConfigDiagnostics::new();
        config.cache.validate(&mut diag);
        assert!(diag.is_empty());
        assert_eq!(diag.warnings().count(), 1);
    }
}
