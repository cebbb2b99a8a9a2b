//! Argon2id password hashing
//!
//! Stored hashes are PHC strings that embed their own salt and cost
//! parameters, so lowering the cost (as the test suites do) never breaks
//! verification of hashes made at the production cost.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Argon2 cost parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordConfig {
    /// KiB of memory per hash
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 64 * 1024,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl PasswordConfig {
    /// Cheap parameters for test suites
    pub fn fast() -> Self {
        Self {
            memory_cost: 8 * 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, Some(32))
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash `password` under a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    PasswordConfig::default().hash(password)
}

pub fn hash_password_with_config(
    password: &str,
    config: &PasswordConfig,
) -> Result<String, PasswordError> {
    config.hash(password)
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_matches_only_the_original_password() {
        let hash = PasswordConfig::fast().hash("secret123").unwrap();

        assert!(verify_password("secret123", &hash).unwrap());
        assert!(!verify_password("secret124", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_salt_differs_per_hash() {
        let config = PasswordConfig::fast();
        assert_ne!(config.hash("admin123").unwrap(), config.hash("admin123").unwrap());
    }

    #[test]
    fn test_unparseable_hash_is_an_error() {
        assert!(matches!(
            verify_password("password", "plaintext-password"),
            Err(PasswordError::InvalidHashFormat)
        ));
    }

    #[test]
    fn test_cheap_hash_verifies_without_its_config() {
        let hash = PasswordConfig::fast().hash("pw").unwrap();

        assert!(hash.starts_with("$argon2id$v=19$m=8192,t=1,p=1$"));
        assert!(verify_password("pw", &hash).unwrap());
    }

    #[test]
    fn test_zero_cost_rejected() {
        let config = PasswordConfig {
            time_cost: 0,
            ..PasswordConfig::fast()
        };
        assert!(matches!(
            config.hash("pw"),
            Err(PasswordError::HashingFailed(_))
        ));
    }
}
