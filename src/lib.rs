//! # Agora (Marketplace Auth & Session Core)
//!
//! `agora` is the authentication and session-lifecycle core of a marketplace
//! connecting shoppers with merchant partners. It owns the flows with real
//! state-machine and trust semantics; catalog, cart, and order CRUD live in
//! sibling services behind the session and role guards exposed here.
//!
//! ## Flows
//!
//! - **Registration:** validated payload creates an unverified identity and
//!   dispatches a numeric one-time code by email. Verifying the code is
//!   single-use and atomic; resending regenerates it.
//! - **Login:** a stateless arithmetic captcha gates the credential check.
//!   Unknown email and wrong password are indistinguishable to the caller.
//!   Success mints a short-lived signed session token delivered in an
//!   `HttpOnly`, `SameSite=Lax` cookie (bearer header accepted as fallback).
//! - **Recovery:** a reset code in its own namespace gates an OTP-verified
//!   password update; a reset code can never satisfy an email-verification
//!   check or vice versa.
//!
//! ## Guards
//!
//! Every mutating auth route sits behind a per-route, per-client fixed-window
//! rate limit. Protected routes verify the session token and compare the
//! role claim against a per-route allow-list.
//!
//! ## Known limitation
//!
//! Logout clears the cookie client-side only; an already-issued token stays
//! cryptographically valid until its natural expiry because no server-side
//! revocation state exists.

pub mod api;
pub mod captcha;
pub mod cli;
pub mod email;
pub mod otp;
pub mod password;
pub mod rate_limit;
pub mod session;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
