//! Live form state the wizard edits
//!
//! The coordinator only needs a snapshot of every value, a way to set one
//! value and a way to reset to defaults. `MemoryForm` is the implementation
//! the terminal wizard and the tests use.

use std::collections::BTreeSet;

use crate::models::FieldValues;

/// The three primitives the persistence layer needs from a form
pub trait FormBinding {
    /// Snapshot of every field's current value
    fn values(&self) -> FieldValues;

    /// Apply a value, marking the field dirty
    fn set_value(&mut self, field: &str, value: &str);

    /// Revert every field to its default and clear dirty state
    fn reset(&mut self);
}

/// A form held in memory, with empty-string defaults
#[derive(Debug, Clone, Default)]
pub struct MemoryForm {
    defaults: FieldValues,
    values: FieldValues,
    dirty: BTreeSet<String>,
}

impl MemoryForm {
    /// Create a form over `fields`, all defaulting to the empty string
    pub fn new<I, F>(fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        let defaults: FieldValues = fields
            .into_iter()
            .map(|f| (f.into(), String::new()))
            .collect();
        Self {
            values: defaults.clone(),
            defaults,
            dirty: BTreeSet::new(),
        }
    }

    /// Current value of one field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Whether the field was set since the last reset
    pub fn is_dirty(&self, field: &str) -> bool {
        self.dirty.contains(field)
    }
}

impl FormBinding for MemoryForm {
    fn values(&self) -> FieldValues {
        self.values.clone()
    }

    fn set_value(&mut self, field: &str, value: &str) {
        self.values.insert(field.to_string(), value.to_string());
        self.dirty.insert(field.to_string());
    }

    fn reset(&mut self) {
        self.values = self.defaults.clone();
        self.dirty.clear();
    }
}
