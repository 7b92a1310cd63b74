//! Hand-off to the identity verification provider

use crate::error::KycResult;
use crate::models::{FieldValues, VerificationStatus};

/// Sends a completed form to whoever verifies it
///
/// Receives plaintext values; the provider decides what happens next and
/// reports it back as a status.
pub trait VerificationSubmitter {
    /// Submit the full form
    fn submit(&mut self, values: &FieldValues) -> KycResult<VerificationStatus>;
}

impl<F> VerificationSubmitter for F
where
    F: FnMut(&FieldValues) -> KycResult<VerificationStatus>,
{
    fn submit(&mut self, values: &FieldValues) -> KycResult<VerificationStatus> {
        self(values)
    }
}
