use chrono::{Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::store::Store;

/// Default freshness window for dashboard aggregates.
pub const DASHBOARD_TTL_MINUTES: i64 = 30;

/// Returns the cached value under `key` when it is younger than
/// `ttl_minutes`, otherwise recomputes, stores and returns it.
///
/// A cache row that fails to deserialize (shape changed between
/// releases) is treated as stale and recomputed.
pub fn get_or_compute<T, F>(store: &dyn Store, key: &str, ttl_minutes: i64, compute: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T>,
{
    let cutoff = Utc::now() - Duration::minutes(ttl_minutes);

    if let Some(entry) = store.get_cache_entry(key)? {
        if entry.updated_at >= cutoff {
            match serde_json::from_str(&entry.data) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!("Discarding unreadable cache entry '{key}': {e}");
                }
            }
        }
    }

    let value = compute()?;
    match serde_json::to_string(&value) {
        Ok(data) => store.upsert_cache_entry(key, &data)?,
        Err(e) => tracing::warn!("Failed to serialize cache entry '{key}': {e}"),
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        value: i64,
    }

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    #[test]
    fn test_computes_on_miss() {
        let store = test_store();
        let result: Payload =
            get_or_compute(&store, "k", 30, || Ok(Payload { value: 1 })).unwrap();
        assert_eq!(result, Payload { value: 1 });
        assert!(store.get_cache_entry("k").unwrap().is_some());
    }

    #[test]
    fn test_serves_fresh_entry_without_recompute() {
        let store = test_store();
        let _: Payload = get_or_compute(&store, "k", 30, || Ok(Payload { value: 1 })).unwrap();

        let result: Payload = get_or_compute(&store, "k", 30, || {
            panic!("compute must not run for a fresh entry")
        })
        .unwrap();
        assert_eq!(result, Payload { value: 1 });
    }

    #[test]
    fn test_recomputes_expired_entry() {
        let store = test_store();
        let _: Payload = get_or_compute(&store, "k", 30, || Ok(Payload { value: 1 })).unwrap();

        // A zero TTL makes the stored row immediately stale.
        let result: Payload = get_or_compute(&store, "k", 0, || Ok(Payload { value: 2 })).unwrap();
        assert_eq!(result, Payload { value: 2 });
    }

    #[test]
    fn test_recomputes_unreadable_entry() {
        let store = test_store();
        store.upsert_cache_entry("k", "not json").unwrap();

        let result: Payload =
            get_or_compute(&store, "k", 30, || Ok(Payload { value: 3 })).unwrap();
        assert_eq!(result, Payload { value: 3 });
    }

    #[test]
    fn test_keys_are_independent() {
        let store = test_store();
        let _: Payload = get_or_compute(&store, "a", 30, || Ok(Payload { value: 1 })).unwrap();
        let b: Payload = get_or_compute(&store, "b", 30, || Ok(Payload { value: 2 })).unwrap();
        assert_eq!(b, Payload { value: 2 });
    }
}
