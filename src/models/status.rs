//! Verification status reported by the external identity provider

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the user's identity verification stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Nothing submitted yet
    #[default]
    NotStarted,
    /// Submitted, waiting on the provider
    Pending,
    /// Verified
    Approved,
    /// Provider rejected the submission; the user may try again
    Rejected,
}

impl VerificationStatus {
    /// Whether saved progress is no longer needed
    ///
    /// A pending or approved submission has nothing left to resume.
    pub fn ends_progress(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    /// Parse a status from its wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "not_started" | "notstarted" => Some(Self::NotStarted),
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "Not started"),
            Self::Pending => write!(f, "Pending"),
            Self::Approved => write!(f, "Approved"),
            Self::Rejected => write!(f, "Rejected"),
        }
    }
}
