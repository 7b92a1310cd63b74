//! Path management for envelope-kyc
//!
//! ## Path Resolution Order
//!
//! 1. `ENVELOPE_KYC_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/envelope-kyc` or `~/.config/envelope-kyc`
//! 3. Windows: `%APPDATA%\envelope-kyc`

use std::path::PathBuf;

use crate::error::KycError;

/// Environment variable that overrides the base directory
pub const DATA_DIR_ENV: &str = "ENVELOPE_KYC_DATA_DIR";

/// Manages all paths used by envelope-kyc
#[derive(Debug, Clone)]
pub struct KycPaths {
    /// Base directory for all envelope-kyc data
    base_dir: PathBuf,
}

impl KycPaths {
    /// Create a new KycPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home or app-data directory can be determined.
    pub fn new() -> Result<Self, KycError> {
        let base_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create KycPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Directory holding one saved-progress file per user
    pub fn progress_dir(&self) -> PathBuf {
        self.base_dir.join("progress")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the verification status file
    pub fn status_file(&self) -> PathBuf {
        self.base_dir.join("verification.json")
    }

    /// Ensure the base and progress directories exist
    pub fn ensure_directories(&self) -> Result<(), KycError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| KycError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.progress_dir())
            .map_err(|e| KycError::Io(format!("Failed to create progress directory: {}", e)))?;

        Ok(())
    }
}

/// Resolve the default data directory path based on platform
#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, KycError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("envelope-kyc"));
        }
    }
    let home = std::env::var("HOME")
        .map_err(|_| KycError::Config("HOME environment variable not set".into()))?;
    Ok(PathBuf::from(home).join(".config").join("envelope-kyc"))
}

/// Resolve the default data directory path based on platform
#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, KycError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| KycError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("envelope-kyc"))
}
