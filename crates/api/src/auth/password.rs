//! Password hashing with Argon2id
//!
//! Hashes are PHC strings carrying their own salt and cost parameters, so a
//! hash produced under one configuration still verifies after the cost
//! settings change.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Argon2 memory cost used when nothing is configured (OWASP minimum for Argon2id)
pub const DEFAULT_MEMORY_KIB: u32 = 19_456;
/// Argon2 iteration count used when nothing is configured
pub const DEFAULT_ITERATIONS: u32 = 2;
/// Argon2 lane count used when nothing is configured
pub const DEFAULT_PARALLELISM: u32 = 1;

/// Error type for password hashing operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PasswordError {
    /// Cost parameters rejected by Argon2
    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),
    /// Hashing failed
    #[error("Hash failed: {0}")]
    HashFailed(String),
}

/// Salted one-way hashing and verification of user passwords
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    /// Build a hasher with explicit Argon2id cost parameters
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password with a freshly generated salt
    ///
    /// Two calls with the same input return different strings; compare with
    /// [`PasswordService::verify`], never by string equality.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashFailed(e.to_string()))
    }

    /// Verify a password against a stored PHC hash
    ///
    /// Returns `false` for a mismatch and for a hash that cannot be parsed.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

impl std::fmt::Debug for PasswordService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_service() -> PasswordService {
        PasswordService::new(1024, 1, 1).expect("valid test params")
    }

    #[test]
    fn test_hash_then_verify() {
        let service = cheap_service();
        let hash = service.hash("pw123").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify("pw123", &hash));
        assert!(!service.verify("pw124", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let service = cheap_service();
        let first = service.hash("same password").unwrap();
        let second = service.hash("same password").unwrap();

        assert_ne!(first, second, "Each hash should carry its own salt");
        assert!(service.verify("same password", &first));
        assert!(service.verify("same password", &second));
    }

    #[test]
    fn test_hash_never_contains_plaintext() {
        let service = cheap_service();
        let hash = service.hash("hunter2-plaintext").unwrap();
        assert!(!hash.contains("hunter2-plaintext"));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        let service = cheap_service();
        assert!(!service.verify("pw123", "not-a-phc-string"));
        assert!(!service.verify("pw123", ""));
    }

    #[test]
    fn test_verify_uses_embedded_params() {
        // Hash under cheap params, verify with a differently configured service
        let hash = cheap_service().hash("portable").unwrap();
        let other = PasswordService::new(2048, 2, 1).unwrap();
        assert!(other.verify("portable", &hash));
    }

    #[test]
    fn test_empty_password_round_trip() {
        let service = cheap_service();
        let hash = service.hash("").unwrap();
        assert!(service.verify("", &hash));
        assert!(!service.verify(" ", &hash));
    }

    #[test]
    fn test_invalid_params_rejected() {
        // Argon2 requires at least 8 KiB per lane and one iteration
        assert!(matches!(
            PasswordService::new(1, 1, 1),
            Err(PasswordError::InvalidParams(_))
        ));
        assert!(matches!(
            PasswordService::new(1024, 0, 1),
            Err(PasswordError::InvalidParams(_))
        ));
    }
}
