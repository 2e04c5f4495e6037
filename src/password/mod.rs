//! Password hashing built on Argon2id.
//!
//! Hashes are salted PHC strings, so hashing the same password twice yields
//! different stored values while both verify. The comparison itself is
//! delegated to the argon2 primitive.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Minimum accepted password length for registration and reset.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Default Argon2id time cost (iterations). Tunable via configuration.
pub const DEFAULT_HASH_COST: u32 = 2;

const MEMORY_COST_KIB: u32 = 19 * 1024;
const PARALLELISM: u32 = 1;

pub struct PasswordManager {
    argon2: Argon2<'static>,
}

impl PasswordManager {
    /// Build a hasher with the given time cost; higher cost means slower
    /// hashing and slower brute force.
    ///
    /// # Errors
    /// Returns an error if the parameters are rejected by argon2.
    pub fn new(time_cost: u32) -> Result<Self> {
        let params = Params::new(MEMORY_COST_KIB, time_cost.max(1), PARALLELISM, None)
            .map_err(|err| anyhow!("invalid argon2 parameters: {err}"))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password into a PHC string with a fresh random salt.
    ///
    /// # Errors
    /// Returns an error if hashing fails; the plaintext is never logged.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|err| anyhow!("failed to hash password: {err}"))?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored PHC string.
    ///
    /// Returns `false` for mismatches and for malformed stored hashes alike.
    #[must_use]
    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        PasswordHash::new(stored).is_ok_and(|parsed| {
            self.argon2
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok()
        })
    }
}

impl Default for PasswordManager {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_COST).expect("default argon2 parameters are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn hash_never_equals_plaintext() -> Result<()> {
        let manager = PasswordManager::new(1)?;
        let hash = manager.hash("secret1")?;
        assert_ne!(hash, "secret1");
        Ok(())
    }

    #[test]
    fn rehashing_differs_but_both_verify() -> Result<()> {
        let manager = PasswordManager::new(1)?;
        let first = manager.hash("secret1")?;
        let second = manager.hash("secret1")?;
        assert_ne!(first, second);
        assert!(manager.verify("secret1", &first));
        assert!(manager.verify("secret1", &second));
        Ok(())
    }

    #[test]
    fn wrong_password_fails_verification() -> Result<()> {
        let manager = PasswordManager::new(1)?;
        let hash = manager.hash("secret1")?;
        assert!(!manager.verify("secret2", &hash));
        Ok(())
    }

    #[test]
    fn malformed_stored_hash_fails_closed() -> Result<()> {
        let manager = PasswordManager::new(1)?;
        assert!(!manager.verify("secret1", "not-a-phc-string"));
        Ok(())
    }

    #[test]
    fn zero_cost_is_clamped() {
        assert!(PasswordManager::new(0).is_ok());
    }
}
