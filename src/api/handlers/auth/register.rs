//! Registration and email-verification endpoints.

use axum::{extract::Extension, http::StatusCode, Json};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use super::error::{AuthError, ErrorResponse};
use super::state::AuthState;
use super::types::{MessageResponse, RegisterRequest, ResendOtpRequest, VerifyOtpRequest};
use super::utils::{normalize_email, valid_email};
use crate::email;
use crate::otp;
use crate::password::MIN_PASSWORD_LENGTH;
use crate::store::{NewIdentity, Role};

/// Structurally validated registration payload.
struct Registration {
    name: String,
    email: String,
    dob: NaiveDate,
    role: Role,
}

fn validate_registration(request: &RegisterRequest) -> Result<Registration, AuthError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AuthError::Validation("Name is required".to_string()));
    }

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }

    let dob = NaiveDate::parse_from_str(request.dob.trim(), "%Y-%m-%d")
        .map_err(|_| AuthError::Validation("Invalid date of birth".to_string()))?;
    if dob >= Utc::now().date_naive() {
        return Err(AuthError::Validation(
            "Date of birth must be in the past".to_string(),
        ));
    }

    if request.password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    // Admin accounts are provisioned out of band, never via registration.
    let role = match Role::parse(&request.role) {
        Some(role @ (Role::User | Role::Partner)) => role,
        _ => return Err(AuthError::Validation("Invalid role".to_string())),
    };

    Ok(Registration {
        name: name.to_string(),
        email,
        dob,
        role,
    })
}

/// Create an unverified identity and send the verification code.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered, OTP dispatched", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<MessageResponse>), AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };
    let registration = validate_registration(&request)?;

    let password_hash = auth_state.passwords().hash(&request.password)?;
    let record = auth_state
        .store()
        .create(NewIdentity {
            name: registration.name,
            email: registration.email,
            dob: registration.dob,
            password_hash,
            role: registration.role,
        })
        .await?;

    let code = auth_state.otp().generate();
    auth_state
        .store()
        .set_verification_code(
            record.id,
            auth_state.otp().hash(&code),
            auth_state.otp().expiry(),
        )
        .await?;

    // Dispatch is on the request path; a failed send fails the registration
    // response, though the record itself has been created.
    auth_state.mailer().send(&email::verification_email(
        &record.email,
        &code,
        auth_state.otp().ttl_minutes(),
    ))?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Registered. OTP sent to email.".to_string(),
        }),
    ))
}

/// Consume a verification code and activate the identity.
#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired code", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Result<Json<MessageResponse>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };
    if !auth_state.otp().well_formed(request.otp.trim()) {
        return Err(AuthError::Validation(format!(
            "OTP must be {} digits",
            auth_state.otp().digits()
        )));
    }

    let email = normalize_email(&request.email);
    let record = auth_state.store().find_by_email(&email).await?;
    // Unknown identity and no-pending-code answer the same way.
    let Some(record) = record else {
        return Err(AuthError::OtpInvalid);
    };
    let (Some(stored_hash), Some(expires_at)) = (record.otp_hash, record.otp_expires_at) else {
        return Err(AuthError::OtpInvalid);
    };

    if otp::is_expired(expires_at) {
        return Err(AuthError::OtpExpired);
    }
    if !auth_state.otp().matches(request.otp.trim(), &stored_hash) {
        return Err(AuthError::OtpMismatch);
    }

    // One write: verified flag set, both code fields cleared. The code is
    // single-use from here on.
    auth_state.store().mark_email_verified(record.id).await?;

    Ok(Json(MessageResponse {
        message: "Email verified. You can login now.".to_string(),
    }))
}

/// Regenerate and redispatch the verification code.
#[utoipa::path(
    post,
    path = "/api/auth/resend-otp",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "OTP resent", body = MessageResponse),
        (status = 404, description = "Unknown identity", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn resend_otp(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResendOtpRequest>>,
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
        .set_verification_code(
            record.id,
            auth_state.otp().hash(&code),
            auth_state.otp().expiry(),
        )
        .await?;
    auth_state
        .mailer()
        .send(&email::resend_email(&record.email, &code))?;

    Ok(Json(MessageResponse {
        message: "OTP resent.".to_string(),
    }))
}
