//! Statistics cache service
//!
//! Memoizes expensive computations by `(operation, args)`. Guarantees:
//! - At most one computation per key unless a refresh is requested
//! - Concurrent misses on one key collapse into one computation and one write
//! - Different keys never wait on each other
//! - A failed computation writes nothing and its error reaches the caller as is

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::observability::{log_event_with_fields, Event};

use super::errors::{CacheError, CacheResult};
use super::key::CacheKey;
use super::store::{CacheEntry, CacheStore};

/// Counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub refreshes: u64,
}

/// Memoization service over a [`CacheStore`].
pub struct StatisticsCache {
    store: Arc<dyn CacheStore>,
    guards: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
}

impl StatisticsCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            guards: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Returns the cached result for `(operation, args)`, computing and
    /// storing it on a miss or when `refresh` is set.
    ///
    /// An entry that no longer decodes as `T` is treated as a miss.
    ///
    /// # Errors
    ///
    /// The computation's own error, or a store failure converted through
    /// `E: From<CacheError>`.
    pub fn get_or_compute<T, A, E, F>(
        &self,
        operation: &str,
        args: &A,
        refresh: bool,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        A: Serialize + ?Sized,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        let key = CacheKey::new(operation, args)?;
        let guard = self.acquire_guard(&key)?;

        let result = {
            let _held = guard.lock().unwrap_or_else(PoisonError::into_inner);
            self.lookup_or_compute(&key, refresh, compute)
        };

        self.release_guard(&key, guard);
        result
    }

    /// Removes the entry for `(operation, args)`. Returns whether one existed.
    pub fn invalidate<A: Serialize + ?Sized>(&self, operation: &str, args: &A) -> CacheResult<bool> {
        let key = CacheKey::new(operation, args)?;
        let removed = self.store.remove(&key)?;
        if removed {
            log_event_with_fields(
                Event::CacheInvalidated,
                &[("operation", operation), ("args", key.args())],
            );
        }
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
        }
    }

    fn lookup_or_compute<T, E, F>(&self, key: &CacheKey, refresh: bool, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        let fields = [("operation", key.operation()), ("args", key.args())];

        if refresh {
            self.refreshes.fetch_add(1, Ordering::Relaxed);
            log_event_with_fields(Event::CacheRefresh, &fields);
        } else {
            if let Some(value) = self.read_decoded(key)? {
                self.hits.fetch_add(1, Ordering::Relaxed);
                log_event_with_fields(Event::CacheHit, &fields);
                return Ok(value);
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
            log_event_with_fields(Event::CacheMiss, &fields);
        }

        let value = compute()?;

        let json = serde_json::to_value(&value)
            .map_err(|e| CacheError::Serialization(format!("result of {}: {}", key.operation(), e)))?;
        self.store.write(key, &CacheEntry::new(key, json))?;

        Ok(value)
    }

    /// Reads and decodes an entry; corrupt or stale-shaped entries are misses.
    fn read_decoded<T: DeserializeOwned>(&self, key: &CacheKey) -> CacheResult<Option<T>> {
        match self.store.read(key) {
            Ok(Some(entry)) => Ok(serde_json::from_value(entry.value).ok()),
            Ok(None) | Err(CacheError::Corrupt { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn acquire_guard(&self, key: &CacheKey) -> CacheResult<Arc<Mutex<()>>> {
        let mut guards = self
            .guards
            .lock()
            .map_err(|_| CacheError::LockPoisoned("cache guards"))?;
        Ok(guards
            .entry(key.digest().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Drops the per-key guard once no other caller holds it.
    fn release_guard(&self, key: &CacheKey, guard: Arc<Mutex<()>>) {
        if let Ok(mut guards) = self.guards.lock() {
            if Arc::strong_count(&guard) == 2 {
                guards.remove(key.digest());
            }
        }
    }

    #[cfg(test)]
    fn guard_count(&self) -> usize {
        self.guards.lock().map(|g| g.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Cache(String),
        Compute(&'static str),
    }

    impl From<CacheError> for TestError {
        fn from(e: CacheError) -> Self {
            TestError::Cache(e.to_string())
        }
    }

    fn cache() -> StatisticsCache {
        StatisticsCache::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_second_call_is_a_hit() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        let compute = || -> Result<Vec<String>, TestError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["CD3E".to_string()])
        };

        let first = cache.get_or_compute("genes", &("pbmc",), false, compute).unwrap();
        let second = cache.get_or_compute("genes", &("pbmc",), false, compute).unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, refreshes: 0 });
    }

    #[test]
    fn test_refresh_recomputes_and_overwrites() {
        let cache = cache();
        let v1: Result<u32, TestError> = cache.get_or_compute("op", &1, false, || Ok(1));
        assert_eq!(v1, Ok(1));

        let v2: Result<u32, TestError> = cache.get_or_compute("op", &1, true, || Ok(2));
        assert_eq!(v2, Ok(2));

        let v3: Result<u32, TestError> =
            cache.get_or_compute("op", &1, false, || Err(TestError::Compute("unused")));
        assert_eq!(v3, Ok(2));
    }

    #[test]
    fn test_failure_does_not_poison() {
        let cache = cache();
        let failed: Result<u32, TestError> =
            cache.get_or_compute("op", &"k", false, || Err(TestError::Compute("boom")));
        assert_eq!(failed, Err(TestError::Compute("boom")));

        let ok: Result<u32, TestError> = cache.get_or_compute("op", &"k", false, || Ok(7));
        assert_eq!(ok, Ok(7));
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_undecodable_entry_is_a_miss() {
        let cache = cache();
        let _: Result<String, TestError> = cache.get_or_compute("op", &0, false, || Ok("text".into()));
        let number: Result<u32, TestError> = cache.get_or_compute("op", &0, false, || Ok(5));
        assert_eq!(number, Ok(5));
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let cache = cache();
        let _: Result<u32, TestError> = cache.get_or_compute("op", &0, false, || Ok(1));
        assert!(cache.invalidate("op", &0).unwrap());
        assert!(!cache.invalidate("op", &0).unwrap());

        let again: Result<u32, TestError> = cache.get_or_compute("op", &0, false, || Ok(3));
        assert_eq!(again, Ok(3));
    }

    #[test]
    fn test_guards_are_released() {
        let cache = cache();
        let _: Result<u32, TestError> = cache.get_or_compute("op", &0, false, || Ok(1));
        let _: Result<u32, TestError> = cache.get_or_compute("op", &1, false, || Ok(1));
        assert_eq!(cache.guard_count(), 0);
    }
}
