//! Identity wrappers for the verification wizard
//!
//! `UserId` is the authenticated user (or nobody), `StorageKey` is the
//! persistent key that user's in-progress record lives under.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How sessions without an authenticated user are displayed
pub const ANONYMOUS_USER: &str = "anonymous";

/// Prefix of every progress storage key
const KEY_PREFIX: &str = "progress:";

/// The authenticated user, if any
///
/// Anonymous sessions share one key and one codec key until a user logs in.
/// Their key material is the empty id, which no authenticated user can have:
/// blank ids always normalize to anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct UserId(Option<String>);

impl UserId {
    /// Create an id for an authenticated user; a blank id is anonymous
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_option(Some(id))
    }

    /// The anonymous placeholder identity
    pub fn anonymous() -> Self {
        Self(None)
    }

    /// Build from an optional identifier; blank strings count as anonymous
    pub fn from_option(id: Option<impl Into<String>>) -> Self {
        match id.map(Into::into) {
            Some(s) if !s.trim().is_empty() => Self(Some(s)),
            _ => Self(None),
        }
    }

    /// Whether this session has no authenticated user
    pub fn is_anonymous(&self) -> bool {
        self.0.is_none()
    }

    /// The string used for key derivation and storage keys
    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }

    /// Derive the storage key for this user's progress record
    pub fn storage_key(&self) -> StorageKey {
        StorageKey(format!("{}{}", KEY_PREFIX, self.as_str()))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_deref().unwrap_or(ANONYMOUS_USER))
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::from_option(Some(s))
    }
}

impl From<u64> for UserId {
    fn from(n: u64) -> Self {
        Self::new(n.to_string())
    }
}

/// Persistent key of one user's progress record (`progress:<userId>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Get the raw key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
