//! Router assembly and server bootstrap.

use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Span};
use ulid::Ulid;
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::email::{EmailSender, LogEmailSender};
use crate::store::{memory::MemoryStore, postgres::PgStore, IdentityStore};

pub mod handlers;
mod openapi;

pub use handlers::auth::{AuthConfig, AuthState};

use handlers::auth::rate_limit::{self, RouteQuota};
use handlers::{auth, dashboard, health, me, root};

/// Start the server.
///
/// With a DSN the durable Postgres store is used; without one the service
/// runs on the in-memory store, which suits local development only.
///
/// # Errors
/// Returns an error if the store, router, or listener cannot be set up.
pub async fn new(port: u16, dsn: Option<String>, auth_config: AuthConfig) -> Result<()> {
    let store: Arc<dyn IdentityStore> = match dsn {
        Some(dsn) => {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect(&dsn)
                .await
                .context("Failed to connect to database")?;
            let store = PgStore::new(pool);
            store
                .ensure_schema()
                .await
                .context("Failed to prepare identity schema")?;
            Arc::new(store)
        }
        None => {
            warn!("no DSN configured; identity records live in memory and vanish on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let mailer: Arc<dyn EmailSender> = Arc::new(LogEmailSender);
    let auth_state = Arc::new(AuthState::new(auth_config, store, mailer)?);

    let app = router(auth_state)?;
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

/// Build the full application router around a prepared [`AuthState`].
///
/// # Errors
/// Returns an error if the configured frontend URL cannot be turned into a
/// CORS origin.
pub fn router(auth_state: Arc<AuthState>) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin(
            auth_state.config().frontend_base_url(),
        )?))
        .allow_credentials(true);

    // Quotas mirror the per-route budgets of the auth surface; each key is
    // client ip + matched route, so budgets are independent per endpoint.
    let limiter = auth_state.limiter().clone();
    let quota = |limit: u32| RouteQuota::new(limiter.clone(), limit);

    let auth_routes = Router::new()
        .route(
            "/captcha",
            get(auth::captcha::get_captcha)
                .route_layer(from_fn_with_state(quota(30), rate_limit::enforce)),
        )
        .route(
            "/register",
            post(auth::register::register)
                .route_layer(from_fn_with_state(quota(5), rate_limit::enforce)),
        )
        .route(
            "/verify-otp",
            post(auth::register::verify_otp)
                .route_layer(from_fn_with_state(quota(10), rate_limit::enforce)),
        )
        .route(
            "/resend-otp",
            post(auth::register::resend_otp)
                .route_layer(from_fn_with_state(quota(3), rate_limit::enforce)),
        )
        .route(
            "/login",
            post(auth::login::login)
                .route_layer(from_fn_with_state(quota(10), rate_limit::enforce)),
        )
        .route("/logout", post(auth::login::logout))
        .route(
            "/forgot-password",
            post(auth::recovery::forgot_password)
                .route_layer(from_fn_with_state(quota(3), rate_limit::enforce)),
        )
        .route(
            "/verify-forgot-password-otp",
            post(auth::recovery::verify_forgot_password_otp)
                .route_layer(from_fn_with_state(quota(10), rate_limit::enforce)),
        )
        .route(
            "/reset-password",
            post(auth::recovery::reset_password)
                .route_layer(from_fn_with_state(quota(3), rate_limit::enforce)),
        );

    let app = Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health))
        .nest("/api/auth", auth_routes)
        .route("/api/me", get(me::me))
        .route("/api/user/dashboard", get(dashboard::user_dashboard))
        .route("/api/partner/dashboard", get(dashboard::partner_dashboard))
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth_state)),
        );

    Ok(app)
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
