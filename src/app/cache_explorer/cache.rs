//! Parameter group cache shared by every region task of one invocation.
//!
//! Many clusters share a handful of cache parameter groups, so resolving each group
//! once per run removes most `DescribeCacheParameters` traffic. The map sits behind a
//! single mutex that is held only for lookups and inserts:
//! - check under the lock, release it
//! - run the loader (network I/O) with no lock held
//! - re-lock and insert only if no other task stored the key in the meantime
//!
//! Racing tasks on a brand-new key may each run the loader, but the first stored value
//! is the one every caller gets back and the key is never overwritten.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// ============================================================================
// Types
// ============================================================================

/// Resolved parameter values of one parameter group; `None` when unset
pub type ParameterValues = BTreeMap<String, Option<i64>>;

/// Counters for the end-of-run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParameterCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub loads: u64,
    /// Loads whose result was dropped because another task stored the key first
    pub discarded_loads: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Arc<ParameterValues>>,
    stats: ParameterCacheStats,
}

// ============================================================================
// Parameter Cache
// ============================================================================

#[derive(Default)]
pub struct ParameterCache {
    inner: Mutex<Inner>,
}

impl ParameterCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The critical sections never panic mid-update, so a poisoned map is still consistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the cached values for `key`, running `loader` on a miss.
    ///
    /// Loader errors are returned to the caller and nothing is stored for the key.
    pub async fn get<F, Fut, E>(&self, key: &str, loader: F) -> Result<Arc<ParameterValues>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ParameterValues, E>>,
    {
        {
            let mut inner = self.lock();
            if let Some(values) = inner.entries.get(key).cloned() {
                inner.stats.hits += 1;
                debug!("Using shared cached parameters for {}", key);
                return Ok(values);
            }
        }

        debug!("Parameter cache miss for {}, loading", key);
        let loaded = Arc::new(loader().await?);

        let mut inner = self.lock();
        inner.stats.loads += 1;
        if let Some(existing) = inner.entries.get(key).cloned() {
            inner.stats.discarded_loads += 1;
            debug!("Parameters for {} were stored by another task, discarding ours", key);
            return Ok(existing);
        }
        inner.entries.insert(key.to_string(), Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Peek without loading
    #[cfg(test)]
    pub fn cached(&self, key: &str) -> Option<Arc<ParameterValues>> {
        self.lock().entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> ParameterCacheStats {
        let inner = self.lock();
        ParameterCacheStats {
            entries: inner.entries.len(),
            ..inner.stats
        }
    }
}
