//! Login and logout endpoints, including the session cookie policy.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    Json,
};
use std::sync::Arc;

use super::error::{AuthError, ErrorResponse};
use super::state::{AuthConfig, AuthState};
use super::types::{LoginRequest, LoginResponse, MessageResponse};
use super::utils::normalize_email;
use crate::session::SESSION_COOKIE_NAME;

/// Verify captcha and credentials, then mint the session cookie.
///
/// Unknown email and wrong password are deliberately indistinguishable to
/// the caller.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = LoginResponse),
        (status = 400, description = "Invalid credentials or captcha", body = ErrorResponse),
        (status = 401, description = "Email not verified", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<(HeaderMap, Json<LoginResponse>), AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    // Captcha gate runs before any identity lookup.
    auth_state
        .captcha()
        .check(&request.captcha_token, request.captcha_answer)
        .map_err(|_| AuthError::CaptchaFailed)?;

    let email = normalize_email(&request.email);
    let record = auth_state
        .store()
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !record.email_verified {
        return Err(AuthError::EmailNotVerified);
    }

    if !auth_state
        .passwords()
        .verify(&request.password, &record.password_hash)
    {
        return Err(AuthError::InvalidCredentials);
    }

    let token = auth_state.sessions().issue(&record)?;
    let cookie = session_cookie(auth_state.config(), &token)
        .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);

    Ok((
        headers,
        Json(LoginResponse {
            message: "Logged in".to_string(),
            role: record.role.as_str().to_string(),
            username: record.email,
        }),
    ))
}

/// Clear the session cookie. Idempotent; the token itself stays valid until
/// its natural expiry because no server-side session record exists.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    auth_state: Extension<Arc<AuthState>>,
) -> Result<(HeaderMap, Json<MessageResponse>), AuthError> {
    let mut headers = HeaderMap::new();
    let cookie = clear_session_cookie(auth_state.config())
        .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
    headers.insert(SET_COOKIE, cookie);
    Ok((
        headers,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}

/// Build the `HttpOnly` session cookie for a freshly issued token.
fn session_cookie(config: &AuthConfig, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = config.session_ttl_minutes() * 60;
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}
