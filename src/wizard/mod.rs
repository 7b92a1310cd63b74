//! Identity verification wizard
//!
//! The step controller walks the fixed step plan; the persistence
//! coordinator keeps the user's progress on disk as they go and offers to
//! resume it next time.

pub mod controller;
pub mod coordinator;
pub mod resume;
pub mod submit;
pub mod validation;

pub use controller::{Advance, StepController, DEFAULT_ADVANCE_COOLDOWN_MS};
pub use coordinator::{
    saved_label, PersistenceCoordinator, Phase, WizardConfig, DEFAULT_AUTOSAVE_DELAY_MS,
};
pub use resume::{DecodeTask, ResumePrompt};
pub use submit::VerificationSubmitter;
pub use validation::{validate_fields, FieldErrors, FieldValidator, RequiredFields};
