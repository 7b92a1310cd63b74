//! Sensitive field codec
//!
//! Encodes individual field values before they are written to disk. Values
//! are tagged with a literal prefix so a reader can tell the three forms
//! apart:
//!
//! - `enc1:` AES-256-GCM, base64 of `nonce || ciphertext`
//! - `xor1:` fallback obfuscation, base64 of `fingerprint || value ^ key`
//! - no prefix: legacy plaintext
//!
//! Encoding never fails (it degrades to the fallback) and decoding never
//! returns garbage (an undecodable value is dropped).

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use crate::models::{FieldValues, UserId};

use super::encryption::{decrypt, encrypt};
use super::key_derivation::{derive_key, DerivedKey, FINGERPRINT_LEN};

/// Prefix of authenticated-cipher payloads
pub const ENCRYPTED_PREFIX: &str = "enc1:";

/// Prefix of fallback-obfuscated payloads
pub const OBFUSCATED_PREFIX: &str = "xor1:";

/// Whether the authenticated cipher may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CipherMode {
    /// Use AES-256-GCM, falling back only if it fails
    #[default]
    Authenticated,
    /// The cipher is unavailable; only the obfuscation fallback works
    FallbackOnly,
}

/// The form a stored value is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedForm {
    Encrypted,
    Obfuscated,
    Plain,
}

impl EncodedForm {
    /// Classify a stored value by its prefix
    pub fn of(value: &str) -> Self {
        if value.starts_with(ENCRYPTED_PREFIX) {
            Self::Encrypted
        } else if value.starts_with(OBFUSCATED_PREFIX) {
            Self::Obfuscated
        } else {
            Self::Plain
        }
    }
}

/// Reversible per-field transform applied to sensitive values
///
/// Implementations must not panic and must report undecodable values as
/// `None`. Decoding may run on a worker thread, hence `Send + Sync`.
pub trait FieldCodec: Send + Sync {
    /// Encode a value for storage
    fn encode(&self, value: &str, user: &UserId) -> String;

    /// Decode a stored value, or `None` if it cannot be trusted
    fn decode(&self, value: &str, user: &UserId) -> Option<String>;
}

/// The codec used for saved verification progress
#[derive(Debug, Clone, Copy, Default)]
pub struct SensitiveFieldCodec {
    mode: CipherMode,
}

impl SensitiveFieldCodec {
    /// Create a codec that prefers the authenticated cipher
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec for an environment without the cipher
    pub fn fallback_only() -> Self {
        Self {
            mode: CipherMode::FallbackOnly,
        }
    }

    /// Create a codec with an explicit mode
    pub fn with_mode(mode: CipherMode) -> Self {
        Self { mode }
    }

    /// The mode this codec runs in
    pub fn mode(&self) -> CipherMode {
        self.mode
    }

    fn seal(&self, value: &str, key: &DerivedKey) -> Option<String> {
        if self.mode == CipherMode::FallbackOnly {
            return None;
        }
        match encrypt(value.as_bytes(), key) {
            Ok(payload) => Some(format!("{}{}", ENCRYPTED_PREFIX, STANDARD.encode(payload))),
            Err(e) => {
                debug!(error = %e, "cipher unavailable, using obfuscation fallback");
                None
            }
        }
    }

    fn open(&self, payload: &str, key: &DerivedKey) -> Option<String> {
        if self.mode == CipherMode::FallbackOnly {
            debug!("encrypted field found but cipher is unavailable, dropping it");
            return None;
        }
        let bytes = STANDARD.decode(payload).ok()?;
        match decrypt(&bytes, key) {
            Ok(plain) => String::from_utf8(plain).ok(),
            Err(e) => {
                debug!(error = %e, "dropping undecryptable field");
                None
            }
        }
    }
}

impl FieldCodec for SensitiveFieldCodec {
    fn encode(&self, value: &str, user: &UserId) -> String {
        if value.is_empty() {
            return String::new();
        }
        let key = derive_key(user);
        self.seal(value, &key)
            .unwrap_or_else(|| obfuscate(value, &key))
    }

    fn decode(&self, value: &str, user: &UserId) -> Option<String> {
        match EncodedForm::of(value) {
            EncodedForm::Encrypted => {
                let key = derive_key(user);
                self.open(&value[ENCRYPTED_PREFIX.len()..], &key)
            }
            EncodedForm::Obfuscated => {
                let key = derive_key(user);
                deobfuscate(&value[OBFUSCATED_PREFIX.len()..], &key)
            }
            EncodedForm::Plain => Some(value.to_string()),
        }
    }
}

fn obfuscate(value: &str, key: &DerivedKey) -> String {
    let key_hex = key.to_hex();
    let mut bytes = Vec::with_capacity(FINGERPRINT_LEN + value.len());
    bytes.extend_from_slice(&key.fingerprint());
    bytes.extend(
        value
            .bytes()
            .zip(key_hex.bytes().cycle())
            .map(|(b, k)| b ^ k),
    );
    format!("{}{}", OBFUSCATED_PREFIX, STANDARD.encode(bytes))
}

fn deobfuscate(payload: &str, key: &DerivedKey) -> Option<String> {
    let bytes = STANDARD.decode(payload).ok()?;
    if bytes.len() < FINGERPRINT_LEN || bytes[..FINGERPRINT_LEN] != key.fingerprint() {
        debug!("obfuscated field written for another user, dropping it");
        return None;
    }
    let key_hex = key.to_hex();
    let plain: Vec<u8> = bytes[FINGERPRINT_LEN..]
        .iter()
        .zip(key_hex.bytes().cycle())
        .map(|(b, k)| b ^ k)
        .collect();
    String::from_utf8(plain).ok()
}

/// Encode the sensitive entries of a field map, copying the rest unchanged
pub fn encode_fields(
    codec: &dyn FieldCodec,
    values: &FieldValues,
    sensitive: &[String],
    user: &UserId,
) -> FieldValues {
    values
        .iter()
        .map(|(field, value)| {
            let stored = if sensitive.contains(field) {
                codec.encode(value, user)
            } else {
                value.clone()
            };
            (field.clone(), stored)
        })
        .collect()
}

/// Decode the sensitive entries of a stored field map
///
/// Entries that fail to decode are left out of the result entirely.
pub fn decode_fields(
    codec: &dyn FieldCodec,
    stored: &FieldValues,
    sensitive: &[String],
    user: &UserId,
) -> FieldValues {
    stored
        .iter()
        .filter_map(|(field, value)| {
            if sensitive.contains(field) {
                codec.decode(value, user).map(|plain| (field.clone(), plain))
            } else {
                Some((field.clone(), value.clone()))
            }
        })
        .collect()
}
