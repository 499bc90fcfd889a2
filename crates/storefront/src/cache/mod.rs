//! Local durable key-value cache.
//!
//! A small trait with an in-memory and an on-disk implementation. Values are
//! opaque strings and every `set` replaces the previous value wholesale.

mod file;

pub use file::FileCache;

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// Errors raised by a [`LocalCache`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem operation failed.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key cannot be used as a storage name.
    #[error("invalid cache key: {0:?}")]
    InvalidKey(String),
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Durable key-value storage surviving restarts of the host.
pub trait LocalCache: Send + Sync {
    /// Read the value stored under `key`. `Ok(None)` when absent.
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Delete `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> CacheResult<()>;
}

/// Process-local cache, used by tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        self.entries().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_set_get_remove() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k").unwrap(), None);

        cache.set("k", "one").unwrap();
        cache.set("k", "two").unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("two"));

        cache.remove("k").unwrap();
        cache.remove("k").unwrap();
        assert_eq!(cache.get("k").unwrap(), None);
    }
}
