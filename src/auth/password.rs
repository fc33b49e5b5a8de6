use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(password_hash::Error),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(password_hash::Error),
}

/// Argon2id hashing with a fresh random salt per call.
///
/// Output is a PHC string carrying algorithm, parameters and salt, so it can be
/// stored as-is and verified later without any side storage.
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash_password(&self, plain: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                PasswordError::Hashing(e)
            })?
            .to_string();
        Ok(hash)
    }

    /// Returns `Ok(false)` on mismatch; errors only when `hash` cannot be parsed.
    /// The digest comparison inside argon2 is constant time.
    pub fn verify_password(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            PasswordError::MalformedHash(e)
        })?;
        match self.argon2.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "argon2 verify_password error");
                Err(PasswordError::MalformedHash(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hasher = PasswordHasher::new();
        let password = "Secur3P@ssw0rd!";
        let hash = hasher.hash_password(password).expect("hashing should succeed");
        assert!(hasher.verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hasher = PasswordHasher::new();
        let hash = hasher
            .hash_password("correct-horse-battery-staple")
            .expect("hashing should succeed");
        assert!(!hasher
            .verify_password("wrong-password", &hash)
            .expect("verify should not error"));
    }

    #[test]
    fn same_password_hashes_differently_each_time() {
        let hasher = PasswordHasher::new();
        let first = hasher.hash_password("secret1").unwrap();
        let second = hasher.hash_password("secret1").unwrap();
        assert_ne!(first, second);
        assert!(hasher.verify_password("secret1", &first).unwrap());
        assert!(hasher.verify_password("secret1", &second).unwrap());
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash_password("plaintext-marker").unwrap();
        assert!(!hash.contains("plaintext-marker"));
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let hasher = PasswordHasher::new();
        let err = hasher.verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, PasswordError::MalformedHash(_)));
    }
}
