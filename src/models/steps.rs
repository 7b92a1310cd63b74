//! The ordered step sequence of the verification wizard
//!
//! Every plan ends with a field-less review step. Progress is only ever
//! persisted for the steps before it.

use serde::{Deserialize, Serialize};

/// One wizard step and the fields it must validate before advancing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDef {
    /// Short step name shown in the UI
    pub name: String,

    /// Fields that must validate before leaving this step
    pub fields: Vec<String>,

    /// Fields shown on this step that may be left blank
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional: Vec<String>,
}

impl StepDef {
    /// Create a step with required fields only
    pub fn new(name: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            name: name.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            optional: Vec::new(),
        }
    }

    /// Add fields that are collected on this step but not required
    pub fn with_optional(mut self, fields: &[&str]) -> Self {
        self.optional = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Every field collected on this step, required first
    pub fn all_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .chain(self.optional.iter())
            .map(String::as_str)
    }
}

/// A fixed, linear sequence of steps ending in review
///
/// Never empty: construction always leaves a review step at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    steps: Vec<StepDef>,
}

impl StepPlan {
    /// Build a plan; a review step is appended when the last step has fields
    pub fn new(mut steps: Vec<StepDef>) -> Self {
        if steps.last().map_or(true, |s| !s.fields.is_empty() || !s.optional.is_empty()) {
            steps.push(StepDef::new("review", &[]));
        }
        Self { steps }
    }

    /// The identity verification sequence the terminal wizard walks
    pub fn kyc_default() -> Self {
        Self::new(vec![
            StepDef::new("personal", &["legalFirstName", "legalLastName", "dateOfBirth"]),
            StepDef::new(
                "address",
                &["addressLine1", "city", "region", "postalCode", "country"],
            )
            .with_optional(&["addressLine2"]),
            StepDef::new("identity", &["ssnLast4", "occupation"]),
            StepDef::new("review", &[]),
        ])
    }

    /// Number of steps, review included
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps besides review
    pub fn is_empty(&self) -> bool {
        self.steps.len() <= 1
    }

    /// Get a step by index
    pub fn get(&self, index: usize) -> Option<&StepDef> {
        self.steps.get(index)
    }

    /// Get a step by index, clamped to the review step
    pub fn step(&self, index: usize) -> &StepDef {
        &self.steps[index.min(self.last_index())]
    }

    /// Iterate steps in order
    pub fn iter(&self) -> impl Iterator<Item = &StepDef> {
        self.steps.iter()
    }

    /// Index of the review step
    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    /// Index of the last step that still collects data
    pub fn last_editable_index(&self) -> usize {
        self.last_index().saturating_sub(1)
    }

    /// Whether `index` is the review step
    pub fn is_review(&self, index: usize) -> bool {
        index == self.last_index()
    }

    /// Every field the wizard collects, in step order
    pub fn all_fields(&self) -> Vec<String> {
        self.steps
            .iter()
            .flat_map(|s| s.all_fields())
            .map(str::to_string)
            .collect()
    }

    /// Every required field across the plan
    pub fn required_fields(&self) -> Vec<String> {
        self.steps.iter().flat_map(|s| s.fields.clone()).collect()
    }
}

impl Default for StepPlan {
    fn default() -> Self {
        Self::kyc_default()
    }
}
