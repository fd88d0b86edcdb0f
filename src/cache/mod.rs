//! Process-wide memo of parsed templates.
//!
//! Templates are keyed by a blake3 hash of their name and source, so an
//! edited source is a new entry and never a stale hit. Parsing is pure:
//! two threads racing on the same key parse twice and the later insert
//! wins, which is indistinguishable from a single parse.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use crate::debug;
use crate::template::{Template, TemplateResult};

/// Default capacity of [`TEMPLATE_CACHE`].
pub const DEFAULT_CAPACITY: usize = 512;

/// blake3 digest of a template's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(name: &str, source: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(name.as_bytes());
        // separator keeps ("ab", "c") and ("a", "bc") apart
        hasher.update(&[0]);
        hasher.update(source.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Bounded concurrent map from content hash to parsed template.
pub struct TemplateCache {
    entries: DashMap<ContentHash, Arc<Template>>,
    capacity: AtomicUsize,
}

impl TemplateCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: AtomicUsize::new(capacity),
        }
    }

    /// Cached template for `(name, source)`, parsing on a miss.
    ///
    /// Parse failures are returned and not cached.
    pub fn get_or_parse(&self, name: &str, source: &str) -> TemplateResult<Arc<Template>> {
        let key = ContentHash::of(name, source);
        if let Some(hit) = self.entries.get(&key) {
            debug!("cache"; "hit {} ({})", name, key);
            return Ok(Arc::clone(&hit));
        }

        debug!("cache"; "miss {} ({})", name, key);
        let template = Arc::new(Template::parse(name, source)?);
        self.insert(key, Arc::clone(&template));
        Ok(template)
    }

    fn insert(&self, key: ContentHash, template: Arc<Template>) {
        let capacity = self.capacity();
        if capacity == 0 {
            return;
        }
        while self.entries.len() >= capacity && !self.entries.contains_key(&key) {
            // any entry will do; the key is only a parse memo
            let victim = self.entries.iter().next().map(|entry| *entry.key());
            match victim {
                Some(victim) => {
                    self.entries.remove(&victim);
                }
                None => break,
            }
        }
        self.entries.insert(key, template);
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Change the capacity; shrinking evicts down to the new bound on the
    /// next insert.
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
        if capacity == 0 {
            self.clear();
        }
    }

    pub fn contains(&self, name: &str, source: &str) -> bool {
        self.entries.contains_key(&ContentHash::of(name, source))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Global template cache instance.
pub static TEMPLATE_CACHE: LazyLock<TemplateCache> = LazyLock::new(TemplateCache::default);
