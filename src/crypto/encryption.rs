//! AES-256-GCM encryption/decryption
//!
//! Payloads are `nonce || ciphertext+tag` in one buffer. Each encryption
//! generates a fresh random nonce.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};

use crate::error::{KycError, KycResult};

use super::DerivedKey;

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Encrypt plaintext, returning the nonce followed by the ciphertext
pub fn encrypt(plaintext: &[u8], key: &DerivedKey) -> KycResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| KycError::Encryption(format!("Failed to create cipher: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| KycError::Encryption(format!("Encryption failed: {}", e)))?;

    let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    payload.extend_from_slice(&nonce_bytes);
    payload.extend_from_slice(&ciphertext);
    Ok(payload)
}

/// Decrypt a `nonce || ciphertext` payload
pub fn decrypt(payload: &[u8], key: &DerivedKey) -> KycResult<Vec<u8>> {
    if payload.len() <= NONCE_SIZE {
        return Err(KycError::Encryption(format!(
            "Payload too short: {} bytes",
            payload.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| KycError::Encryption(format!("Failed to create cipher: {}", e)))?;

    let (nonce_bytes, ciphertext) = payload.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher.decrypt(nonce, ciphertext).map_err(|_| {
        KycError::Encryption("Decryption failed: invalid key or corrupted data".to_string())
    })
}
