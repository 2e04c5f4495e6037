//! Session token issue/verify and the cookie-borne claims.
//!
//! Claims are signed with a session-only secret, distinct from the captcha
//! secret so a leaked key compromises one credential type, not both. No
//! server-side session record exists: logout clears the cookie and the token
//! stays cryptographically valid until its natural expiry.

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{IdentityRecord, Role};

/// Cookie carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "access_token";

/// Default session lifetime in minutes.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 45;

/// Identity claims carried by the session token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity record id.
    pub sub: String,
    pub role: Role,
    /// The email, which doubles as the username.
    pub username: String,
    /// Display name for greeting purposes.
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// All verification failures collapse into one kind; callers must not be
/// able to distinguish missing, malformed, expired, and forged tokens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid or expired session token")]
    Invalid,
}

pub struct SessionSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_minutes: i64,
}

impl SessionSigner {
    #[must_use]
    pub fn new(secret: &SecretString, ttl_minutes: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
            ttl_minutes,
        }
    }

    #[must_use]
    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    /// Mint a session token for a freshly authenticated identity.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn issue(&self, identity: &IdentityRecord) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: identity.id.to_string(),
            role: identity.role,
            username: identity.email.clone(),
            name: identity.name.clone(),
            iat: now,
            exp: now + self.ttl_minutes * 60,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .context("failed to sign session token")
    }

    /// Verify a presented token and return its claims.
    ///
    /// # Errors
    /// [`SessionError::Invalid`] for every failure cause.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| SessionError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn identity() -> IdentityRecord {
        IdentityRecord {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            dob: NaiveDate::from_ymd_opt(1990, 1, 1).expect("valid date"),
            password_hash: "$argon2id$stub".to_string(),
            role: Role::User,
            email_verified: true,
            otp_hash: None,
            otp_expires_at: None,
            reset_otp_hash: None,
            reset_otp_expires_at: None,
            reset_verified: false,
            created_at: Utc::now(),
        }
    }

    fn signer() -> SessionSigner {
        SessionSigner::new(&SecretString::from("session-test-secret"), 45)
    }

    #[test]
    fn issued_token_round_trips() -> Result<()> {
        let signer = signer();
        let identity = identity();
        let token = signer.issue(&identity)?;

        let claims = signer.verify(&token).expect("token verifies");
        assert_eq!(claims.sub, identity.id.to_string());
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.username, "alice@example.com");
        assert_eq!(claims.name, "Alice");
        assert_eq!(claims.exp - claims.iat, 45 * 60);
        Ok(())
    }

    #[test]
    fn expired_token_is_rejected() -> Result<()> {
        let expired = SessionSigner::new(&SecretString::from("session-test-secret"), -1);
        let token = expired.issue(&identity())?;
        assert_eq!(signer().verify(&token), Err(SessionError::Invalid));
        Ok(())
    }

    #[test]
    fn foreign_secret_is_rejected() -> Result<()> {
        let other = SessionSigner::new(&SecretString::from("other-secret"), 45);
        let token = other.issue(&identity())?;
        assert_eq!(signer().verify(&token), Err(SessionError::Invalid));
        Ok(())
    }

    #[test]
    fn tampered_token_is_rejected() -> Result<()> {
        let signer = signer();
        let mut token = signer.issue(&identity())?;
        token.push('x');
        assert_eq!(signer.verify(&token), Err(SessionError::Invalid));
        Ok(())
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert_eq!(signer().verify("not-a-token"), Err(SessionError::Invalid));
    }
}
