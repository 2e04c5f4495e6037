//! Captcha challenge endpoint.

use axum::{extract::Extension, Json};
use std::sync::Arc;

use super::error::{AuthError, ErrorResponse};
use super::state::AuthState;
use super::types::CaptchaResponse;

/// Issue a fresh arithmetic challenge. The server keeps no state; the answer
/// travels inside the signed token.
#[utoipa::path(
    get,
    path = "/api/auth/captcha",
    responses(
        (status = 200, description = "Challenge issued", body = CaptchaResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn get_captcha(
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<CaptchaResponse>, AuthError> {
    let challenge = auth_state
        .captcha()
        .issue()
        .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
    Ok(Json(CaptchaResponse {
        prompt: challenge.prompt,
        token: challenge.token,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::tests::support::test_state;
    use super::get_captcha;
    use anyhow::Result;
    use axum::extract::Extension;

    #[tokio::test]
    async fn captcha_returns_prompt_and_token() -> Result<()> {
        let (auth_state, _mailbox) = test_state()?;
        let response = get_captcha(Extension(auth_state)).await.expect("challenge");
        assert!(response.prompt.starts_with("What is "));
        assert!(!response.token.is_empty());
        Ok(())
    }
}
