//! Auth handlers and supporting modules.
//!
//! Every mutating route here sits behind a per-route fixed-window rate limit
//! (see [`rate_limit`]); the flow handlers then drive the captcha, OTP,
//! password, session, and store services. Protected routes elsewhere in the
//! API use the guards in [`principal`].

pub(crate) mod captcha;
pub mod error;
pub(crate) mod login;
pub(crate) mod principal;
pub mod rate_limit;
pub(crate) mod recovery;
pub(crate) mod register;
mod state;
pub(crate) mod types;
mod utils;

pub use error::{AuthError, ErrorResponse};
pub use state::{AuthConfig, AuthState};
