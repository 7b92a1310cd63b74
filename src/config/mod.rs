//! Configuration module for envelope-kyc
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::KycPaths;
pub use settings::Settings;
