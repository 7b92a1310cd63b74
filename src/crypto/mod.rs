//! Cryptographic functions for envelope-kyc
//!
//! Provides AES-256-GCM field encryption keyed by a SHA-256 per-user
//! derivation, plus the obfuscation fallback used when the cipher is not
//! available.

pub mod codec;
pub mod encryption;
pub mod key_derivation;

pub use codec::{
    decode_fields, encode_fields, CipherMode, EncodedForm, FieldCodec, SensitiveFieldCodec,
    ENCRYPTED_PREFIX, OBFUSCATED_PREFIX,
};
pub use encryption::{decrypt, encrypt};
pub use key_derivation::{derive_key, DerivedKey};
