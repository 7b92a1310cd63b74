//! The persisted progress record
//!
//! On disk this is `{"step": n, "data": {...}, "updated": ms}`. Records with a
//! missing `step` or `data` fail to deserialize and are treated as absent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field name to current value, for every field the wizard collects
pub type FieldValues = BTreeMap<String, String>;

/// In-progress wizard state for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Index of the step the user should land on when resuming
    pub step: usize,

    /// Field values; sensitive fields are stored encoded
    pub data: FieldValues,

    /// Epoch milliseconds of the last write (missing means stale)
    #[serde(default)]
    pub updated: i64,
}

impl ProgressRecord {
    /// Create a record stamped at `updated`
    pub fn new(step: usize, data: FieldValues, updated: i64) -> Self {
        Self {
            step,
            data,
            updated,
        }
    }

    /// Whether any field holds a non-empty value
    pub fn has_values(&self) -> bool {
        has_any_value(&self.data)
    }

    /// Whether the record is older than `threshold_ms` at `now_ms`
    pub fn is_stale(&self, now_ms: i64, threshold_ms: i64) -> bool {
        now_ms.saturating_sub(self.updated) > threshold_ms
    }
}

/// Whether any value in the map is non-blank
pub fn has_any_value(values: &FieldValues) -> bool {
    values.values().any(|v| !v.trim().is_empty())
}
