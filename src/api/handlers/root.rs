//! Root handler.

use axum::response::IntoResponse;

/// Service banner for `/`; the API itself lives under `/api`.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
