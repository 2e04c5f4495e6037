//! Role-gated dashboard endpoints.
//!
//! The marketplace CRUD surface (products, carts, orders) lives elsewhere;
//! these two routes are the role-guarded entry points for the shopper and
//! partner frontends.

use axum::{extract::Extension, http::HeaderMap, Json};
use std::sync::Arc;

use super::auth::{
    principal::{require_role, require_session},
    types::MessageResponse,
    AuthError, AuthState, ErrorResponse,
};
use crate::store::Role;

/// Shopper landing data; requires the `USER` role.
#[utoipa::path(
    get,
    path = "/api/user/dashboard",
    responses(
        (status = 200, description = "Shopper dashboard", body = MessageResponse),
        (status = 401, description = "Unauthenticated", body = ErrorResponse),
        (status = 403, description = "Insufficient role", body = ErrorResponse)
    ),
    tag = "account"
)]
pub async fn user_dashboard(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<MessageResponse>, AuthError> {
    let claims = require_session(&headers, &auth_state)?;
    require_role(Some(&claims), &[Role::User])?;
    Ok(Json(MessageResponse {
        message: format!("Welcome back, {}", claims.name),
    }))
}

/// Partner landing data; requires the `PARTNER` role.
#[utoipa::path(
    get,
    path = "/api/partner/dashboard",
    responses(
        (status = 200, description = "Partner dashboard", body = MessageResponse),
        (status = 401, description = "Unauthenticated", body = ErrorResponse),
        (status = 403, description = "Insufficient role", body = ErrorResponse)
    ),
    tag = "account"
)]
pub async fn partner_dashboard(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<MessageResponse>, AuthError> {
    let claims = require_session(&headers, &auth_state)?;
    require_role(Some(&claims), &[Role::Partner])?;
    Ok(Json(MessageResponse {
        message: format!("Partner dashboard ready, {}", claims.name),
    }))
}
