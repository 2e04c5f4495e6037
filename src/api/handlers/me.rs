//! Authenticated account endpoint.

use axum::{extract::Extension, http::HeaderMap, Json};
use std::sync::Arc;

use super::auth::{
    principal::require_session, types::MeResponse, AuthError, AuthState, ErrorResponse,
};

/// Return the claims of the current session so the frontend can render the
/// signed-in account.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current session claims", body = MeResponse),
        (status = 401, description = "Unauthenticated", body = ErrorResponse)
    ),
    tag = "account"
)]
pub async fn me(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<MeResponse>, AuthError> {
    let claims = require_session(&headers, &auth_state)?;
    Ok(Json(MeResponse {
        username: claims.username,
        role: claims.role.as_str().to_string(),
        name: claims.name,
    }))
}
