//! API handlers.
//!
//! `auth` holds the flow orchestration and guards; the remaining modules are
//! the thin authenticated surface the frontends talk to.

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod me;
pub mod root;
