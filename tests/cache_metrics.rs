use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::debugging::DebuggingRecorder;
use quire::cache::{
    CacheConfig, CacheError, CacheKey, CacheLayer, CacheStore, MemoryCacheStore, WriteEvent,
};

struct UnreachableStore;

#[async_trait]
impl CacheStore for UnreachableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::backend("unreachable"))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::backend("unreachable"))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::backend("unreachable"))
    }
}

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let config = CacheConfig {
        capacity: NonZeroUsize::MIN,
        ..CacheConfig::default()
    };
    let store = MemoryCacheStore::new(&config);
    let ttl = Duration::from_secs(60);

    assert!(store.get("a").await.expect("get").is_none());
    store.set("a", "1".into(), ttl).await.expect("set");
    assert!(store.get("a").await.expect("get").is_some());
    store.set("b", "2".into(), ttl).await.expect("set");
    assert_eq!(store.len(), 1);

    let layer = CacheLayer::new(Arc::new(UnreachableStore), config);
    let report = layer.record(WriteEvent::PostDeleted { post_id: 1 }).await;
    assert_eq!(report.failed.len(), CacheKey::ALL.len());

    let names: BTreeSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for expected in [
        "quire_cache_hit_total",
        "quire_cache_miss_total",
        "quire_cache_evict_total",
        "quire_cache_invalidate_failed_total",
    ] {
        assert!(names.contains(expected), "missing metric {expected}");
    }
}
