//! User settings for envelope-kyc
//!
//! Tunables for the verification wizard: how long saved progress is kept,
//! how quickly edits are autosaved, the advance cooldown, and which fields
//! are treated as sensitive.

use serde::{Deserialize, Serialize};

use super::paths::KycPaths;
use crate::crypto::CipherMode;
use crate::error::KycError;
use crate::models::StepPlan;
use crate::wizard::WizardConfig;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// User settings for envelope-kyc
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Days before saved progress is discarded unread
    #[serde(default = "default_staleness_days")]
    pub staleness_days: u32,

    /// Delay between the first edit of a burst and its autosave
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,

    /// Cooldown that swallows repeated "next" activations
    #[serde(default = "default_advance_cooldown_ms")]
    pub advance_cooldown_ms: u64,

    /// Skip the authenticated cipher and use the obfuscation fallback
    #[serde(default)]
    pub force_fallback_codec: bool,

    /// Fields encoded before they are written to disk
    #[serde(default = "default_sensitive_fields")]
    pub sensitive_fields: Vec<String>,
}

fn default_schema_version() -> u32 {
    1
}

fn default_staleness_days() -> u32 {
    7
}

fn default_autosave_delay_ms() -> u64 {
    200
}

fn default_advance_cooldown_ms() -> u64 {
    300
}

fn default_sensitive_fields() -> Vec<String> {
    vec!["dateOfBirth".to_string(), "ssnLast4".to_string()]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            staleness_days: default_staleness_days(),
            autosave_delay_ms: default_autosave_delay_ms(),
            advance_cooldown_ms: default_advance_cooldown_ms(),
            force_fallback_codec: false,
            sensitive_fields: default_sensitive_fields(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or use defaults if the file doesn't exist
    pub fn load_or_create(paths: &KycPaths) -> Result<Self, KycError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| KycError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                KycError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &KycPaths) -> Result<(), KycError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| KycError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| KycError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Staleness threshold in milliseconds
    pub fn staleness_ms(&self) -> i64 {
        i64::from(self.staleness_days) * DAY_MS
    }

    /// Cipher mode implied by these settings
    pub fn cipher_mode(&self) -> CipherMode {
        if self.force_fallback_codec {
            CipherMode::FallbackOnly
        } else {
            CipherMode::Authenticated
        }
    }

    /// Wizard configuration for the default KYC step plan
    pub fn wizard_config(&self) -> WizardConfig {
        WizardConfig {
            plan: StepPlan::kyc_default(),
            sensitive_fields: self.sensitive_fields.clone(),
            staleness_ms: self.staleness_ms(),
            autosave_delay_ms: i64::try_from(self.autosave_delay_ms).unwrap_or(i64::MAX),
            advance_cooldown_ms: i64::try_from(self.advance_cooldown_ms).unwrap_or(i64::MAX),
            cipher_mode: self.cipher_mode(),
        }
    }
}
