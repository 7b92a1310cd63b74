//! Progress store
//!
//! Holds exactly one `ProgressRecord` per storage key. Reads purge stale
//! records; writes and clears are best effort and never fail the caller.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::models::{ProgressRecord, StorageKey};

use super::KeyValueStore;

/// Default staleness threshold: 7 days in milliseconds
pub const DEFAULT_STALENESS_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Reads and writes progress records through a key-value backend
pub struct ProgressStore<S: KeyValueStore> {
    backend: S,
    clock: Arc<dyn Clock>,
    staleness_ms: i64,
}

impl<S: KeyValueStore> ProgressStore<S> {
    /// Create a store with the default staleness threshold
    pub fn new(backend: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            staleness_ms: DEFAULT_STALENESS_MS,
        }
    }

    /// Override the staleness threshold
    pub fn with_staleness_ms(mut self, staleness_ms: i64) -> Self {
        self.staleness_ms = staleness_ms;
        self
    }

    /// Current staleness threshold
    pub fn staleness_ms(&self) -> i64 {
        self.staleness_ms
    }

    /// Get the underlying backend
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Read the record for `key`
    ///
    /// Missing, unparseable and structurally invalid records all read as
    /// `None`. A stale record is deleted and also reads as `None`.
    pub fn read(&self, key: &StorageKey) -> Option<ProgressRecord> {
        let raw = match self.backend.get_item(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to read saved progress");
                return None;
            }
        };

        let record: ProgressRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                debug!(key = %key, error = %e, "ignoring malformed saved progress");
                return None;
            }
        };

        if record.is_stale(self.clock.now_ms(), self.staleness_ms) {
            debug!(key = %key, updated = record.updated, "purging stale saved progress");
            self.clear(key);
            return None;
        }

        Some(record)
    }

    /// Write the record for `key`, returning whether it landed
    pub fn write(&self, key: &StorageKey, record: &ProgressRecord) -> bool {
        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to serialize progress");
                return false;
            }
        };

        match self.backend.set_item(key.as_str(), &json) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "autosave skipped");
                false
            }
        }
    }

    /// Remove the record for `key`
    pub fn clear(&self, key: &StorageKey) {
        if let Err(e) = self.backend.remove_item(key.as_str()) {
            warn!(key = %key, error = %e, "failed to clear saved progress");
        }
    }
}
