//! Per-user key derivation
//!
//! The field key is SHA-256 over a fixed purpose salt and the user id, so no
//! key material is ever stored or transmitted. Anyone who knows the user id
//! can derive the same key: this protects saved progress from casual
//! inspection of the data directory, not from code running as the user.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::models::UserId;

/// Purpose salt mixed into every derived key
pub const KEY_PURPOSE_SALT: &str = "envelope-kyc:progress-fields:v1";

/// Length of the user fingerprint embedded in obfuscated payloads
pub const FINGERPRINT_LEN: usize = 4;

/// A derived 256-bit field key, wiped on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; 32],
}

impl DerivedKey {
    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Lowercase hex form of the key, used by the obfuscation fallback
    pub fn to_hex(&self) -> Zeroizing<String> {
        let mut out = Zeroizing::new(String::with_capacity(64));
        for byte in self.key.iter() {
            out.push_str(&format!("{:02x}", byte));
        }
        out
    }

    /// Short tag identifying which user a payload was written for
    pub fn fingerprint(&self) -> [u8; FINGERPRINT_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(b"fingerprint:");
        hasher.update(self.key);
        let digest = hasher.finalize();
        let mut tag = [0u8; FINGERPRINT_LEN];
        tag.copy_from_slice(&digest[..FINGERPRINT_LEN]);
        tag
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey").finish_non_exhaustive()
    }
}

/// Derive the field key for a user
pub fn derive_key(user: &UserId) -> DerivedKey {
    let mut hasher = Sha256::new();
    hasher.update(KEY_PURPOSE_SALT.as_bytes());
    hasher.update(b":");
    hasher.update(user.as_str().as_bytes());
    DerivedKey {
        key: hasher.finalize().into(),
    }
}
