//! Local record of verification status per user
//!
//! Stands in for the identity provider's status feed: the terminal wizard
//! records `pending` here when it submits, and reads it back on the next run.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::error::KycResult;
use crate::models::{UserId, VerificationStatus};

/// `verification.json`: user id to status
#[derive(Debug, Clone)]
pub struct StatusLedger {
    path: PathBuf,
}

impl StatusLedger {
    /// Ledger stored at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> KycResult<BTreeMap<String, VerificationStatus>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn store(&self, entries: &BTreeMap<String, VerificationStatus>) -> KycResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }

    /// Status for `user`; `NotStarted` if none was recorded
    pub fn get(&self, user: &UserId) -> KycResult<VerificationStatus> {
        Ok(self
            .load()?
            .get(user.as_str())
            .copied()
            .unwrap_or_default())
    }

    /// Record a status for `user`
    pub fn record(&self, user: &UserId, status: VerificationStatus) -> KycResult<()> {
        let mut entries = self.load()?;
        entries.insert(user.as_str().to_string(), status);
        self.store(&entries)
    }

    /// Forget `user`'s status; returns whether there was one
    pub fn remove(&self, user: &UserId) -> KycResult<bool> {
        let mut entries = self.load()?;
        let removed = entries.remove(user.as_str()).is_some();
        if removed {
            self.store(&entries)?;
        }
        Ok(removed)
    }
}
