//! Session and role guards for protected routes.
//!
//! Flow overview: read the session token from the cookie (preferred) or the
//! `Authorization` bearer header (fallback for non-browser clients), verify
//! it, and hand the decoded claims to the handler. Every verification
//! failure collapses to the same `Unauthenticated` response.

use axum::http::{header::AUTHORIZATION, header::COOKIE, HeaderMap};

use super::error::AuthError;
use super::state::AuthState;
use crate::session::{SessionClaims, SESSION_COOKIE_NAME};
use crate::store::Role;

/// Resolve the request into verified session claims, or 401.
pub(crate) fn require_session(
    headers: &HeaderMap,
    auth_state: &AuthState,
) -> Result<SessionClaims, AuthError> {
    let token = extract_session_token(headers).ok_or(AuthError::Unauthenticated)?;
    auth_state
        .sessions()
        .verify(&token)
        .map_err(|_| AuthError::Unauthenticated)
}

/// Check the claims' role against a route's allow-list.
///
/// `None` claims (role guard reached without a session guard) is an
/// authentication failure, not a crash and not a 403.
pub(crate) fn require_role(
    claims: Option<&SessionClaims>,
    allowed: &[Role],
) -> Result<(), AuthError> {
    let claims = claims.ok_or(AuthError::Unauthenticated)?;
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_cookie_token(headers) {
        return Some(token);
    }
    extract_bearer_token(headers)
}

fn extract_cookie_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn claims(role: Role) -> SessionClaims {
        SessionClaims {
            sub: "id".to_string(),
            role,
            username: "a@b.com".to_string(),
            name: "Alice".to_string(),
            iat: 0,
            exp: i64::MAX,
        }
    }

    #[test]
    fn cookie_token_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; access_token=from-cookie"),
        );
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(
            extract_session_token(&headers),
            Some("from-cookie".to_string())
        );
    }

    #[test]
    fn bearer_token_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer the-token"));
        assert_eq!(
            extract_session_token(&headers),
            Some("the-token".to_string())
        );
    }

    #[test]
    fn empty_bearer_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn role_in_allow_list_passes() {
        let claims = claims(Role::User);
        assert!(require_role(Some(&claims), &[Role::User, Role::Partner]).is_ok());
    }

    #[test]
    fn role_outside_allow_list_is_forbidden() {
        let claims = claims(Role::User);
        let denied = require_role(Some(&claims), &[Role::Partner]);
        assert!(matches!(denied, Err(AuthError::Forbidden)));
    }

    #[test]
    fn missing_claims_is_unauthenticated_not_forbidden() {
        let denied = require_role(None, &[Role::User]);
        assert!(matches!(denied, Err(AuthError::Unauthenticated)));
    }
}
