//! envelope-kyc - Resumable identity verification wizard
//!
//! This library keeps a multi-step KYC form's progress on disk while the user
//! fills it in, so an interrupted session can be resumed. Sensitive fields are
//! encrypted per user before they are written and stale progress is discarded.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `crypto`: Per-user field codec (AES-256-GCM with an obfuscation fallback)
//! - `storage`: Key-value backends and the progress store
//! - `wizard`: Step controller and persistence coordinator
//! - `models`: Progress records, user ids, step plan, verification status
//! - `form`, `clock`, `throttle`: Collaborators the coordinator is driven by
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `cli`: Terminal front end
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use envelope_kyc::clock::SystemClock;
//! use envelope_kyc::form::MemoryForm;
//! use envelope_kyc::models::UserId;
//! use envelope_kyc::storage::MemoryStorage;
//! use envelope_kyc::wizard::{PersistenceCoordinator, WizardConfig};
//!
//! let config = WizardConfig::default();
//! let form = MemoryForm::new(config.plan.all_fields());
//! let mut wizard = PersistenceCoordinator::new(
//!     UserId::new("42"),
//!     MemoryStorage::new(),
//!     form,
//!     Arc::new(SystemClock),
//!     config,
//! );
//! wizard.mount();
//! wizard.edit("legalFirstName", "Ada");
//! wizard.tick();
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod form;
pub mod models;
pub mod storage;
pub mod throttle;
pub mod wizard;

pub use error::KycError;
