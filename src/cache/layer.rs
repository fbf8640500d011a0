//! Coherence between writes and the derived views cached for reads.
//!
//! Every write path calls [`CacheLayer::record`] after its change is durable.
//! Cache trouble is contained here: failed reads are misses, failed writes and
//! deletes are logged and counted, and none of them reach the caller.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::events::WriteEvent;
use super::keys::CacheKey;
use super::store::{CacheError, CacheStore};

pub(crate) const METRIC_INVALIDATE_FAILED: &str = "quire_cache_invalidate_failed_total";

/// Outcome of one invalidation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    pub invalidated: Vec<CacheKey>,
    pub failed: Vec<CacheKey>,
}

impl InvalidationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
    /// Bumped by every invalidation; shared by all clones.
    generation: Arc<AtomicU64>,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Drop every key in `keys`. Each deletion is attempted independently.
    pub async fn invalidate(&self, keys: &BTreeSet<CacheKey>) -> InvalidationReport {
        let mut report = InvalidationReport::default();
        self.generation.fetch_add(1, Ordering::SeqCst);

        for &key in keys {
            match self.store.delete(key.as_str()).await {
                Ok(()) => report.invalidated.push(key),
                Err(err) => {
                    warn!(cache_key = %key, error = %err, "cache invalidation failed");
                    counter!(METRIC_INVALIDATE_FAILED, "key" => key.as_str()).increment(1);
                    report.failed.push(key);
                }
            }
        }

        report
    }

    /// Invalidate everything `event` made stale.
    pub async fn record(&self, event: WriteEvent) -> InvalidationReport {
        let report = self.invalidate(&event.affected_keys()).await;
        debug!(
            event = event.kind(),
            invalidated = report.invalidated.len(),
            failed = report.failed.len(),
            "cache invalidated after write"
        );
        report
    }

    /// Cached value for `key`, or `None` on miss or on any cache failure.
    pub async fn read_json<T: DeserializeOwned>(&self, key: CacheKey) -> Option<T> {
        let raw = match self.store.get(key.as_str()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(cache_key = %key, error = %err, "cache read failed; treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(cache_key = %key, error = %err, "cached value is undecodable; treating as miss");
                None
            }
        }
    }

    /// Store `value` under `key` with the key's configured expiry. Failures are logged only.
    pub async fn write_json<T: Serialize>(&self, key: CacheKey, value: &T) {
        let result: Result<(), CacheError> = async {
            let encoded = serde_json::to_string(value)?;
            self.store
                .set(key.as_str(), encoded, key.ttl(&self.config))
                .await
        }
        .await;

        if let Err(err) = result {
            warn!(cache_key = %key, error = %err, "cache write failed");
        }
    }

    /// Read-through: return the cached value, or run `load` and cache its result.
    ///
    /// Loader errors are returned unchanged and nothing is cached. A value loaded
    /// while an invalidation ran is returned but not cached, since it may predate
    /// the write. An invalidation landing between that check and the store's `set`
    /// can still leave a stale entry until its TTL expires.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: CacheKey, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.read_json(key).await {
            return Ok(cached);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let value = load().await?;
        if self.generation.load(Ordering::SeqCst) == generation {
            self.write_json(key, &value).await;
        } else {
            debug!(cache_key = %key, "skipped caching a value loaded during invalidation");
        }
        Ok(value)
    }
}
