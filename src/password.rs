//! Password hashing and verification.
//!
//! Bcrypt with a fixed cost factor. Hashing failures are fatal (not
//! user-correctable); a verification mismatch is an ordinary boolean that
//! callers translate into an authentication failure.

use thiserror::Error;

/// Fixed bcrypt work factor.
pub const BCRYPT_COST: u32 = 10;

/// Errors that can occur while hashing a password.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Hash a plaintext password with a per-hash random salt.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(plaintext, BCRYPT_COST)?)
}

/// Verify a plaintext password against a stored hash.
///
/// A malformed stored hash counts as a mismatch rather than an error so the
/// caller's failure path stays uniform.
pub fn verify_password(plaintext: &str, hashed: &str) -> bool {
    match bcrypt::verify(plaintext, hashed) {
        Ok(matches) => matches,
        Err(err) => {
            tracing::warn!("Password verification against malformed hash: {}", err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("supersecret").unwrap();

        assert_ne!(hash, "supersecret");
        assert!(verify_password("supersecret", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("supersecret").unwrap();
        let second = hash_password("supersecret").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn hash_embeds_fixed_cost() {
        let hash = hash_password("supersecret").unwrap();
        assert!(hash.contains("$10$"));
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        assert!(!verify_password("supersecret", "not-a-bcrypt-hash"));
    }
}
