//! Identity records and the injectable store behind the auth flows.
//!
//! The orchestrating handlers only ever see the [`IdentityStore`] trait;
//! [`memory::MemoryStore`] backs development and the test-suite while
//! [`postgres::PgStore`] is the durable implementation. Every mutation is a
//! single atomic record update — verification and reset state are never
//! half-written.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

/// Marketplace roles. Set at registration and immutable afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Partner,
    Admin,
}

impl Role {
    /// Case-insensitive parse of the wire representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "USER" => Some(Self::User),
            "PARTNER" => Some(Self::Partner),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Partner => "PARTNER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable user record. Email doubles as the username and is stored
/// normalized; only password and code hashes are persisted, never plaintext.
#[derive(Clone, Debug)]
pub struct IdentityRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub dob: NaiveDate,
    pub password_hash: String,
    pub role: Role,
    pub email_verified: bool,
    /// Pending email-verification code; set and cleared together with
    /// `otp_expires_at`.
    pub otp_hash: Option<Vec<u8>>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    /// Password-recovery code, in its own namespace: a reset code can never
    /// satisfy an email-verification check or vice versa.
    pub reset_otp_hash: Option<Vec<u8>>,
    pub reset_otp_expires_at: Option<DateTime<Utc>>,
    /// Set once the reset code has been verified; consumed by the password
    /// update.
    pub reset_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a record. Verification state starts empty.
#[derive(Clone, Debug)]
pub struct NewIdentity {
    pub name: String,
    pub email: String,
    pub dob: NaiveDate,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("identity not found")]
    NotFound,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Create a record with `email_verified = false` and no pending codes.
    async fn create(&self, identity: NewIdentity) -> Result<IdentityRecord, StoreError>;

    /// Look up a record by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError>;

    /// Replace the pending verification code and its expiry in one write.
    async fn set_verification_code(
        &self,
        id: Uuid,
        otp_hash: Vec<u8>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Mark the email verified and clear both verification fields in one
    /// write, enforcing single use of the code.
    async fn mark_email_verified(&self, id: Uuid) -> Result<(), StoreError>;

    /// Replace the pending reset code and its expiry in one write. Also
    /// clears any previous `reset_verified` marker.
    async fn set_reset_code(
        &self,
        id: Uuid,
        otp_hash: Vec<u8>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Flag the pending reset code as verified, keeping the hash for the
    /// final password update to consume.
    async fn mark_reset_verified(&self, id: Uuid) -> Result<(), StoreError>;

    /// Store the new password hash and clear all reset state in one write.
    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), StoreError>;

    /// Liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Short backend label surfaced by the health endpoint.
    fn kind(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse(" Partner "), Some(Role::Partner));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn role_round_trips_through_wire_format() {
        for role in [Role::User, Role::Partner, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn role_serializes_uppercase() {
        let json = serde_json::to_string(&Role::Partner).expect("serialize role");
        assert_eq!(json, "\"PARTNER\"");
    }
}
