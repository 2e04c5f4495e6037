//! `OpenAPI` document for the served routes.

use utoipa::OpenApi;

use super::handlers::{auth, dashboard, health, me};

/// Add new endpoints here so they are documented alongside the router wiring
/// in `api::router`. `/` and the swagger mount itself are intentionally not
/// documented.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::captcha::get_captcha,
        auth::register::register,
        auth::register::verify_otp,
        auth::register::resend_otp,
        auth::login::login,
        auth::login::logout,
        auth::recovery::forgot_password,
        auth::recovery::verify_forgot_password_otp,
        auth::recovery::reset_password,
        me::me,
        dashboard::user_dashboard,
        dashboard::partner_dashboard,
    ),
    components(schemas(
        auth::types::RegisterRequest,
        auth::types::VerifyOtpRequest,
        auth::types::ResendOtpRequest,
        auth::types::LoginRequest,
        auth::types::ForgotPasswordRequest,
        auth::types::VerifyResetOtpRequest,
        auth::types::ResetPasswordRequest,
        auth::types::MessageResponse,
        auth::types::CaptchaResponse,
        auth::types::LoginResponse,
        auth::types::MeResponse,
        auth::ErrorResponse,
        auth::rate_limit::RateLimitedResponse,
        health::Health,
    )),
    tags(
        (name = "auth", description = "Registration, login, and password recovery"),
        (name = "account", description = "Authenticated account surface"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
