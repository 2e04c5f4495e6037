//! One-time numeric codes for email verification and password recovery.
//!
//! Codes are uniform random digits. Unlike password hashing, the stored hash
//! is deterministic (`SHA-256`) so a submitted code can be checked with a
//! direct equality comparison against the stored value.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, Rng};
use sha2::{Digest, Sha256};

/// Default number of digits in a generated code.
pub const DEFAULT_OTP_DIGITS: usize = 6;

/// Default code lifetime in minutes.
pub const DEFAULT_OTP_TTL_MINUTES: i64 = 10;

#[derive(Clone, Copy, Debug)]
pub struct OtpService {
    digits: usize,
    ttl_minutes: i64,
}

impl OtpService {
    #[must_use]
    pub fn new(digits: usize, ttl_minutes: i64) -> Self {
        Self {
            digits: digits.max(1),
            ttl_minutes: ttl_minutes.max(1),
        }
    }

    #[must_use]
    pub fn digits(&self) -> usize {
        self.digits
    }

    #[must_use]
    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    /// Generate a fresh code of the configured length.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut rng = OsRng;
        (0..self.digits)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }

    /// Deterministic one-way hash of a code; only the hash is ever stored.
    #[must_use]
    pub fn hash(&self, code: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(code.as_bytes());
        hasher.finalize().to_vec()
    }

    /// Compare a submitted code against a stored hash.
    #[must_use]
    pub fn matches(&self, code: &str, stored_hash: &[u8]) -> bool {
        self.hash(code) == stored_hash
    }

    /// Expiry timestamp for a code generated now.
    #[must_use]
    pub fn expiry(&self) -> DateTime<Utc> {
        Utc::now() + Duration::minutes(self.ttl_minutes)
    }

    /// A submitted code must match the configured shape before any lookup.
    #[must_use]
    pub fn well_formed(&self, code: &str) -> bool {
        code.len() == self.digits && code.bytes().all(|byte| byte.is_ascii_digit())
    }
}

impl Default for OtpService {
    fn default() -> Self {
        Self::new(DEFAULT_OTP_DIGITS, DEFAULT_OTP_TTL_MINUTES)
    }
}

/// Whether an expiry timestamp is already in the past.
#[must_use]
pub fn is_expired(expires_at: DateTime<Utc>) -> bool {
    expires_at < Utc::now()
}
