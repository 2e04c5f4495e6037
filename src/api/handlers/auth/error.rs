//! Closed error set for the auth flows, mapped once to HTTP responses.
//!
//! Every component reports one of these kinds directly; nothing downstream
//! inspects ad hoc error attributes. Internal failures are logged with full
//! detail server-side and reach the caller as a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed input rejected before any flow logic runs.
    #[error("{0}")]
    Validation(String),
    #[error("Email already registered")]
    DuplicateIdentity,
    /// Used uniformly for unknown email and wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Verify email first")]
    EmailNotVerified,
    #[error("Invalid or expired captcha")]
    CaptchaFailed,
    /// No identity or no pending code for this flow.
    #[error("Invalid request")]
    OtpInvalid,
    #[error("OTP expired")]
    OtpExpired,
    #[error("Incorrect OTP")]
    OtpMismatch,
    /// Reset attempted without a verified, unexpired reset code.
    #[error("Invalid or expired reset request")]
    InvalidTicket,
    /// Used uniformly for missing, malformed, expired, and forged sessions.
    #[error("Unauthenticated")]
    Unauthenticated,
    #[error("Forbidden: insufficient role")]
    Forbidden,
    /// Only for the resend/forgot flows, where enumeration risk is lower
    /// than in login.
    #[error("User not found")]
    NotFound,
    #[error("Internal Server Error")]
    Internal(anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InvalidCredentials
            | Self::CaptchaFailed
            | Self::OtpInvalid
            | Self::OtpExpired
            | Self::OtpMismatch
            | Self::InvalidTicket => StatusCode::BAD_REQUEST,
            Self::DuplicateIdentity => StatusCode::CONFLICT,
            Self::EmailNotVerified | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::DuplicateIdentity,
            StoreError::NotFound => Self::NotFound,
            StoreError::Backend(inner) => Self::Internal(inner),
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("internal error: {err:#}");
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_the_taxonomy() {
        assert_eq!(
            AuthError::Validation("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::DuplicateIdentity.status(), StatusCode::CONFLICT);
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::EmailNotVerified.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::CaptchaFailed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AuthError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_never_leak_detail() {
        let err = AuthError::Internal(anyhow::anyhow!("connection refused to 10.0.0.1"));
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[test]
    fn store_errors_translate_to_flow_kinds() {
        assert!(matches!(
            AuthError::from(StoreError::DuplicateEmail),
            AuthError::DuplicateIdentity
        ));
        assert!(matches!(
            AuthError::from(StoreError::NotFound),
            AuthError::NotFound
        ));
    }
}
