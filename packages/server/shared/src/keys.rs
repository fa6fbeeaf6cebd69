//! Opaque API key generation and verification.
//!
//! Format: `{prefix}{entropy(32)}{checksum(8 hex)}`. The checksum lets the
//! middleware reject obviously-malformed keys without touching the
//! database; the Argon2 hash is the real proof of possession.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use crc32fast::Hasher;
use rand::Rng;

pub const KEY_PREFIX_LIVE: &str = "sub_live_";
pub const KEY_PREFIX_TEST: &str = "sub_test_";

/// Generates a new API key. Returns `(plaintext, argon2_hash)`; only the
/// hash is ever persisted, the plaintext is shown to the caller once.
pub fn generate_api_key(is_live: bool) -> (String, String) {
    let prefix = if is_live { KEY_PREFIX_LIVE } else { KEY_PREFIX_TEST };

    let entropy: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();

    let checksum = compute_checksum(&entropy);
    let full_key = format!("{prefix}{entropy}{checksum}");

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(full_key.as_bytes(), &salt)
        .expect("argon2 hashing of a fixed-length key cannot fail")
        .to_string();

    (full_key, password_hash)
}

/// Cheap structural check before a database round-trip. Does not prove
/// the key is valid, only that it is shaped like one of ours.
pub fn validate_key_format(key: &str) -> bool {
    let content = if let Some(rest) = key.strip_prefix(KEY_PREFIX_LIVE) {
        rest
    } else if let Some(rest) = key.strip_prefix(KEY_PREFIX_TEST) {
        rest
    } else {
        return false;
    };

    if content.len() != 40 {
        return false;
    }
    let (entropy, checksum) = content.split_at(32);
    checksum == compute_checksum(entropy)
}

fn compute_checksum(data: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(data.as_bytes());
    format!("{:08x}", hasher.finalize())
}

/// Constant-time verification of a presented key against its stored Argon2 hash.
pub fn verify_key_hash(raw_key: &str, stored_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(stored_hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(raw_key.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_validates_and_verifies() {
        let (plaintext, hash) = generate_api_key(true);
        assert!(validate_key_format(&plaintext));
        assert!(verify_key_hash(&plaintext, &hash));
        assert!(!verify_key_hash("sub_live_garbage", &hash));
    }

    #[test]
    fn wrong_prefix_is_rejected() {
        assert!(!validate_key_format("nope_live_xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx"));
    }
}
