//! Token hashing and symmetric encryption helpers shared by the API and
//! database layers (checksum encryption, API-key lookup hashes).

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption key must be 32 bytes (64 hex chars)")]
    InvalidKeyLength,
    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("ciphertext too short")]
    CiphertextTooShort,
    #[error("cipher operation failed")]
    CipherFailure,
    #[error("decrypted payload was not valid UTF-8")]
    InvalidUtf8,
}

/// Fast, non-secret lookup hash used to find a row before the slow
/// constant-time Argon2 comparison (mirrors the API-key `lookup_hash` column).
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Encrypts a checksum (or other small secret) at rest with AES-256-GCM.
/// `key_hex` is 64 hex chars (32 bytes), sourced from a per-deployment secret.
pub fn encrypt(plaintext: &str, key_hex: &str) -> Result<String, CryptoError> {
    let key_bytes = hex::decode(key_hex.trim())?;
    if key_bytes.len() != 32 {
        return Err(CryptoError::InvalidKeyLength);
    }

    let cipher =
        Aes256Gcm::new_from_slice(&key_bytes).map_err(|_| CryptoError::CipherFailure)?;

    let mut nonce_bytes = [0u8; 12];
    rand::Rng::fill(&mut rand::thread_rng(), &mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::CipherFailure)?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend_from_slice(&ciphertext);
    Ok(hex::encode(combined))
}

pub fn decrypt(hex_ciphertext: &str, key_hex: &str) -> Result<String, CryptoError> {
    let key_bytes = hex::decode(key_hex.trim())?;
    if key_bytes.len() != 32 {
        return Err(CryptoError::InvalidKeyLength);
    }

    let combined = hex::decode(hex_ciphertext.trim())?;
    if combined.len() < 12 {
        return Err(CryptoError::CiphertextTooShort);
    }
    let (nonce_bytes, ciphertext) = combined.split_at(12);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher =
        Aes256Gcm::new_from_slice(&key_bytes).map_err(|_| CryptoError::CipherFailure)?;
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::CipherFailure)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_token_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn encrypt_decrypt_round_trips() {
        let key = "00".repeat(32);
        let enc = encrypt("md5:deadbeef", &key).unwrap();
        let dec = decrypt(&enc, &key).unwrap();
        assert_eq!(dec, "md5:deadbeef");
    }

    #[test]
    fn rejects_short_key() {
        assert!(matches!(
            encrypt("x", "00"),
            Err(CryptoError::InvalidKeyLength)
        ));
    }
}
