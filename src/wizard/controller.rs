//! Wizard step controller
//!
//! A forward-linear index over the step plan. Advancing validates only the
//! current step's required fields and is guarded against double activation
//! by a fixed cooldown armed the moment `next` is called.

use crate::models::{FieldValues, StepDef, StepPlan};

use super::validation::{validate_fields, FieldErrors, FieldValidator};

/// Default advance cooldown in milliseconds
pub const DEFAULT_ADVANCE_COOLDOWN_MS: i64 = 300;

/// Outcome of a `next` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the contained step index
    Advanced(usize),
    /// The current step has invalid fields; the index did not change
    Invalid(FieldErrors),
    /// Swallowed by the re-entrancy guard
    Ignored,
    /// Already on the review step; submit instead
    AtEnd,
}

/// Tracks which step of the plan the user is on
#[derive(Debug, Clone)]
pub struct StepController {
    plan: StepPlan,
    index: usize,
    cooldown_ms: i64,
    advancing_until: Option<i64>,
}

impl StepController {
    /// Start at step 0 with the default cooldown
    pub fn new(plan: StepPlan) -> Self {
        Self {
            plan,
            index: 0,
            cooldown_ms: DEFAULT_ADVANCE_COOLDOWN_MS,
            advancing_until: None,
        }
    }

    /// Override the advance cooldown
    pub fn with_cooldown_ms(mut self, cooldown_ms: i64) -> Self {
        self.cooldown_ms = cooldown_ms.max(0);
        self
    }

    /// Current step index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current step definition
    pub fn current(&self) -> &StepDef {
        self.plan.step(self.index)
    }

    /// The plan being walked
    pub fn plan(&self) -> &StepPlan {
        &self.plan
    }

    /// Whether the user is on the review step
    pub fn on_review(&self) -> bool {
        self.plan.is_review(self.index)
    }

    /// Whether an advance is still cooling down at `now_ms`
    pub fn is_advancing(&self, now_ms: i64) -> bool {
        self.advancing_until.map_or(false, |until| now_ms < until)
    }

    /// Try to move forward one step
    pub fn next(
        &mut self,
        values: &FieldValues,
        validator: &dyn FieldValidator,
        now_ms: i64,
    ) -> Advance {
        if self.is_advancing(now_ms) {
            return Advance::Ignored;
        }
        if self.on_review() {
            return Advance::AtEnd;
        }
        self.advancing_until = Some(now_ms.saturating_add(self.cooldown_ms));

        let fields = &self.current().fields;
        if let Err(errors) = validate_fields(validator, values, fields) {
            return Advance::Invalid(errors);
        }

        self.index = (self.index + 1).min(self.plan.last_index());
        Advance::Advanced(self.index)
    }

    /// Move back one step; never validates
    pub fn previous(&mut self) -> usize {
        self.index = self.index.saturating_sub(1);
        self.index
    }

    /// Jump straight to a step, clamped to the plan
    pub fn jump_to(&mut self, index: usize) -> usize {
        self.index = index.min(self.plan.last_index());
        self.index
    }

    /// Back to the first step with the guard released
    pub fn reset(&mut self) {
        self.index = 0;
        self.advancing_until = None;
    }
}
