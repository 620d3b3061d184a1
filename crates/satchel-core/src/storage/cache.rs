//! Local Cache - best-effort key/value mirror for instant startup
//!
//! Reads and writes never fail loudly: a read that cannot be served is
//! `None`, a write that cannot be stored returns `false` and is logged.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::Storage;

/// Durable client-side string store
pub trait LocalCache: Send + Sync {
    /// Value stored under `key`, if readable
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`; `false` when the write was not kept
    fn set(&self, key: &str, value: &str) -> bool;
}

impl LocalCache for Storage {
    fn get(&self, key: &str) -> Option<String> {
        match self.get_cached(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read from local cache");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> bool {
        match self.set_cached(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to write to local cache");
                false
            }
        }
    }
}

/// In-memory cache with an optional byte quota
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache that refuses writes once keys plus values exceed `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        let mut entries = self.entries.lock();
        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > quota {
                tracing::warn!(key, quota, "Local cache quota exceeded");
                return false;
            }
        }
        entries.insert(key.to_string(), value.to_string());
        true
    }
}
