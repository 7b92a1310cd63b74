//! Core data models for envelope-kyc
//!
//! The persisted progress record, user identity, the wizard's step plan and
//! the verification status reported by the identity provider.

pub mod ids;
pub mod record;
pub mod status;
pub mod steps;

pub use ids::{StorageKey, UserId, ANONYMOUS_USER};
pub use record::{has_any_value, FieldValues, ProgressRecord};
pub use status::VerificationStatus;
pub use steps::{StepDef, StepPlan};
