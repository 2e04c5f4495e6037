//! Password recovery: forgot / verify-reset-code / reset.
//!
//! Reset codes live in their own record fields, so a verification code can
//! never satisfy a reset check or vice versa. Verifying the reset code flags
//! the record; the final transition consumes both the flag and the code in
//! one write.

use axum::{extract::Extension, Json};
use std::sync::Arc;

use super::error::{AuthError, ErrorResponse};
use super::state::AuthState;
use super::types::{
    ForgotPasswordRequest, MessageResponse, ResetPasswordRequest, VerifyResetOtpRequest,
};
use super::utils::normalize_email;
use crate::email;
use crate::otp;
use crate::password::MIN_PASSWORD_LENGTH;
use crate::store::IdentityRecord;

/// Generate a reset code for a known identity and dispatch it.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset OTP dispatched", body = MessageResponse),
        (status = 404, description = "Unknown identity", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<Json<MessageResponse>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    let record = auth_state
        .store()
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::NotFound)?;

    let code = auth_state.otp().generate();
    auth_state
        .store()
        .set_reset_code(
            record.id,
            auth_state.otp().hash(&code),
            auth_state.otp().expiry(),
        )
        .await?;
    auth_state.mailer().send(&email::reset_email(
        &record.email,
        &code,
        auth_state.otp().ttl_minutes(),
    ))?;

    Ok(Json(MessageResponse {
        message: "Password reset OTP sent to email.".to_string(),
    }))
}

/// Check a reset code and flag the record for the final password update.
#[utoipa::path(
    post,
    path = "/api/auth/verify-forgot-password-otp",
    request_body = VerifyResetOtpRequest,
    responses(
        (status = 200, description = "Reset OTP verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired code", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verify_forgot_password_otp(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyResetOtpRequest>>,
) -> Result<Json<MessageResponse>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    let record = auth_state
        .store()
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::OtpInvalid)?;
    check_reset_code(&auth_state, &record, request.otp.trim())?;

    auth_state.store().mark_reset_verified(record.id).await?;

    Ok(Json(MessageResponse {
        message: "OTP verified. You can reset your password now.".to_string(),
    }))
}

/// Consume the verified reset code and store the new password hash.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid reset state or validation error", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<Json<MessageResponse>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };
    if request.password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let email = normalize_email(&request.email);
    let record = auth_state
        .store()
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::InvalidTicket)?;

    // The verified marker alone is not enough; the code must still match and
    // be unexpired. All failures here look the same to the caller.
    if !record.reset_verified {
        return Err(AuthError::InvalidTicket);
    }
    match check_reset_code(&auth_state, &record, request.otp.trim()) {
        Ok(()) => {}
        Err(_) => return Err(AuthError::InvalidTicket),
    }

    let password_hash = auth_state.passwords().hash(&request.password)?;
    // One write: new hash in, all reset state gone. A replayed request fails
    // the checks above because the code fields are now empty.
    auth_state
        .store()
        .update_password(record.id, password_hash)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password reset. You can login now.".to_string(),
    }))
}

fn check_reset_code(
    auth_state: &AuthState,
    record: &IdentityRecord,
    code: &str,
) -> Result<(), AuthError> {
    let (Some(stored_hash), Some(expires_at)) =
        (record.reset_otp_hash.as_deref(), record.reset_otp_expires_at)
    else {
        return Err(AuthError::OtpInvalid);
    };
    if otp::is_expired(expires_at) {
        return Err(AuthError::OtpExpired);
    }
    if !auth_state.otp().matches(code, stored_hash) {
        return Err(AuthError::OtpMismatch);
    }
    Ok(())
}
