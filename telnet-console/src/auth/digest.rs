//! Salted password digests
//!
//! One scheme and one salt for the whole process: `base64(sha256(password || salt))`.
//! Credentials only ever hold digests; verification compares digests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Process-wide password digest scheme
#[derive(Debug, Clone)]
pub struct PasswordDigest {
    salt: String,
}

impl PasswordDigest {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    /// Digest of salted input
    pub fn digest(&self, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        hasher.update(self.salt.as_bytes());
        STANDARD.encode(hasher.finalize())
    }

    /// Compare the digest of `password` with a stored digest
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        constant_time_eq(self.digest(password).as_bytes(), stored.as_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
