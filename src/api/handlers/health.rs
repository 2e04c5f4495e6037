//! Health endpoint reporting build info and store reachability.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::auth::AuthState;
use crate::GIT_COMMIT_HASH;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    /// Store backend label plus its probe result, e.g. `postgres: ok`.
    store: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Identity store is reachable", body = Health),
        (status = 503, description = "Identity store is unreachable", body = Health)
    ),
    tag = "health"
)]
pub async fn health(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let kind = auth_state.store().kind();
    let probe = match auth_state.store().ping().await {
        Ok(()) => Ok(()),
        Err(err) => {
            error!("health probe failed for {kind} store: {err}");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    let status = match probe {
        Ok(()) => "ok",
        Err(_) => "error",
    };
    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: format!("{kind}: {status}"),
    };

    match probe {
        Ok(()) => (StatusCode::OK, Json(health)).into_response(),
        Err(code) => (code, Json(health)).into_response(),
    }
}
