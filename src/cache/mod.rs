//! Cache for views derived from posts and categories.
//!
//! Reads go through [`CacheLayer::get_or_load`]; writes call
//! [`CacheLayer::record`] with a [`WriteEvent`] so every affected
//! [`CacheKey`] is dropped before the next read. Entries also expire after
//! their configured TTL.
//!
//! ```toml
//! [cache]
//! capacity = 256
//! stats_ttl_seconds = 300
//! category_ttl_seconds = 300
//! available_categories_ttl_seconds = 600
//! ```

mod config;
mod events;
mod keys;
mod layer;
mod lock;
mod store;

pub use config::CacheConfig;
pub use events::WriteEvent;
pub use keys::CacheKey;
pub use layer::{CacheLayer, InvalidationReport};
pub(crate) use layer::METRIC_INVALIDATE_FAILED;
pub use store::{CacheError, CacheStore, MemoryCacheStore};
pub(crate) use store::{METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_MISS};
