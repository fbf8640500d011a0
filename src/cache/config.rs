//! Cache sizing and expiry backstops, from the `[cache]` settings section.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::config::CacheSettings;

const DEFAULT_CAPACITY: usize = 256;
const DEFAULT_STATS_TTL_SECS: u64 = 300;
const DEFAULT_CATEGORY_TTL_SECS: u64 = 300;
const DEFAULT_AVAILABLE_CATEGORIES_TTL_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum entries held by the in-memory store before LRU eviction.
    pub capacity: NonZeroUsize,
    /// Expiry of the dashboard statistics entry.
    pub stats_ttl: Duration,
    /// Expiry of the category picker entries.
    pub category_ttl: Duration,
    /// Expiry of the public "categories with posts" lists.
    pub available_categories_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            stats_ttl: Duration::from_secs(DEFAULT_STATS_TTL_SECS),
            category_ttl: Duration::from_secs(DEFAULT_CATEGORY_TTL_SECS),
            available_categories_ttl: Duration::from_secs(DEFAULT_AVAILABLE_CATEGORIES_TTL_SECS),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            capacity: settings.capacity,
            stats_ttl: settings.stats_ttl,
            category_ttl: settings.category_ttl,
            available_categories_ttl: settings.available_categories_ttl,
        }
    }
}
