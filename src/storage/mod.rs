//! Storage layer for envelope-kyc
//!
//! A small synchronous key-value contract (`get_item`/`set_item`/
//! `remove_item`) with an in-memory and a directory-backed implementation,
//! and the progress store that keeps one record per user on top of it.

pub mod file_store;
pub mod memory;
pub mod progress;

pub use file_store::FileStorage;
pub use memory::MemoryStorage;
pub use progress::{ProgressStore, DEFAULT_STALENESS_MS};

use crate::error::KycResult;

/// Synchronous string key-value storage
pub trait KeyValueStore {
    /// Get the value stored under `key`
    fn get_item(&self, key: &str) -> KycResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> KycResult<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove_item(&self, key: &str) -> KycResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get_item(&self, key: &str) -> KycResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> KycResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> KycResult<()> {
        (**self).remove_item(key)
    }
}
