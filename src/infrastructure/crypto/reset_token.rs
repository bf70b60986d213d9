//! Password reset tokens
//!
//! The raw token goes to the user by email; only its SHA-256 digest is
//! stored.

use rand::Rng;
use sha2::{Digest, Sha256};

/// A freshly generated token and the digest to persist.
pub struct GeneratedResetToken {
    pub token: String,
    pub token_hash: String,
}

pub fn generate_reset_token() -> GeneratedResetToken {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    let token = hex::encode(bytes);
    let token_hash = hash_reset_token(&token);
    GeneratedResetToken { token, token_hash }
}

pub fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique_and_hashed() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a.token, b.token);
        assert_eq!(a.token.len(), 64);
        assert_eq!(a.token_hash, hash_reset_token(&a.token));
        assert_ne!(a.token, a.token_hash);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(hash_reset_token(" abc\n"), hash_reset_token("abc"));
    }
}
