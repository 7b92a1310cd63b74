//! In-memory key-value backend
//!
//! Cloning a `MemoryStorage` gives another handle to the same map, which is
//! how tests simulate a reload: drop the wizard, keep a handle, mount again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{KycError, KycResult};

use super::KeyValueStore;

#[derive(Debug, Default)]
struct Inner {
    items: HashMap<String, String>,
    quota: Option<usize>,
}

impl Inner {
    fn used_bytes_excluding(&self, key: &str) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

/// Shared in-memory storage with an optional byte quota
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStorage {
    /// Create an empty, unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that refuses writes beyond `bytes` in total
    pub fn with_quota(bytes: usize) -> Self {
        let store = Self::default();
        store.lock().quota = Some(bytes);
        store
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned map still holds valid strings
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> KycResult<Option<String>> {
        Ok(self.lock().items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> KycResult<()> {
        let mut inner = self.lock();
        if let Some(quota) = inner.quota {
            let needed = key.len() + value.len();
            let available = quota.saturating_sub(inner.used_bytes_excluding(key));
            if needed > available {
                return Err(KycError::Quota { needed, available });
            }
        }
        inner.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> KycResult<()> {
        self.lock().items.remove(key);
        Ok(())
    }
}
