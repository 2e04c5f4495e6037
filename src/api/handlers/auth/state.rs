//! Auth configuration and the shared state behind the handlers.

use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;

use crate::captcha::CaptchaService;
use crate::email::EmailSender;
use crate::otp::{OtpService, DEFAULT_OTP_DIGITS, DEFAULT_OTP_TTL_MINUTES};
use crate::password::{PasswordManager, DEFAULT_HASH_COST};
use crate::rate_limit::FixedWindowLimiter;
use crate::session::{SessionSigner, DEFAULT_SESSION_TTL_MINUTES};
use crate::store::IdentityStore;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    session_secret: SecretString,
    captcha_secret: SecretString,
    session_ttl_minutes: i64,
    otp_digits: usize,
    otp_ttl_minutes: i64,
    hash_cost: u32,
}

impl AuthConfig {
    /// The two signing secrets are deliberately separate arguments so a
    /// single leaked key never covers both token types.
    #[must_use]
    pub fn new(
        frontend_base_url: String,
        session_secret: SecretString,
        captcha_secret: SecretString,
    ) -> Self {
        Self {
            frontend_base_url,
            session_secret,
            captcha_secret,
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            otp_digits: DEFAULT_OTP_DIGITS,
            otp_ttl_minutes: DEFAULT_OTP_TTL_MINUTES,
            hash_cost: DEFAULT_HASH_COST,
        }
    }

    #[must_use]
    pub fn with_session_ttl_minutes(mut self, minutes: i64) -> Self {
        self.session_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_otp_digits(mut self, digits: usize) -> Self {
        self.otp_digits = digits;
        self
    }

    #[must_use]
    pub fn with_otp_ttl_minutes(mut self, minutes: i64) -> Self {
        self.otp_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(super) fn session_secret(&self) -> &SecretString {
        &self.session_secret
    }

    pub(super) fn captcha_secret(&self) -> &SecretString {
        &self.captcha_secret
    }

    pub(crate) fn session_ttl_minutes(&self) -> i64 {
        self.session_ttl_minutes
    }

    pub(super) fn otp_digits(&self) -> usize {
        self.otp_digits
    }

    pub(super) fn otp_ttl_minutes(&self) -> i64 {
        self.otp_ttl_minutes
    }

    pub(super) fn hash_cost(&self) -> u32 {
        self.hash_cost
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AuthConfig,
    store: Arc<dyn IdentityStore>,
    mailer: Arc<dyn EmailSender>,
    passwords: PasswordManager,
    otp: OtpService,
    captcha: CaptchaService,
    sessions: SessionSigner,
    limiter: Arc<FixedWindowLimiter>,
}

impl AuthState {
    /// Wire up the services from configuration plus the injected
    /// collaborators.
    ///
    /// # Errors
    /// Returns an error if the password hasher rejects the configured cost.
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn IdentityStore>,
        mailer: Arc<dyn EmailSender>,
    ) -> Result<Self> {
        let passwords = PasswordManager::new(config.hash_cost())?;
        let otp = OtpService::new(config.otp_digits(), config.otp_ttl_minutes());
        let captcha = CaptchaService::new(config.captcha_secret());
        let sessions = SessionSigner::new(config.session_secret(), config.session_ttl_minutes());
        Ok(Self {
            config,
            store,
            mailer,
            passwords,
            otp,
            captcha,
            sessions,
            limiter: Arc::new(FixedWindowLimiter::new()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn IdentityStore {
        self.store.as_ref()
    }

    pub(super) fn mailer(&self) -> &dyn EmailSender {
        self.mailer.as_ref()
    }

    pub(super) fn passwords(&self) -> &PasswordManager {
        &self.passwords
    }

    pub(super) fn otp(&self) -> &OtpService {
        &self.otp
    }

    pub(super) fn captcha(&self) -> &CaptchaService {
        &self.captcha
    }

    pub(crate) fn sessions(&self) -> &SessionSigner {
        &self.sessions
    }

    #[must_use]
    pub fn limiter(&self) -> &Arc<FixedWindowLimiter> {
        &self.limiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::LogEmailSender;
    use crate::store::memory::MemoryStore;
    use anyhow::Result;

    fn config() -> AuthConfig {
        AuthConfig::new(
            "https://agora.dev".to_string(),
            SecretString::from("session-secret"),
            SecretString::from("captcha-secret"),
        )
    }

    #[test]
    fn config_defaults_and_overrides() {
        let config = config();
        assert_eq!(config.session_ttl_minutes(), DEFAULT_SESSION_TTL_MINUTES);
        assert_eq!(config.otp_digits(), DEFAULT_OTP_DIGITS);
        assert_eq!(config.otp_ttl_minutes(), DEFAULT_OTP_TTL_MINUTES);
        assert_eq!(config.hash_cost(), DEFAULT_HASH_COST);

        let config = config
            .with_session_ttl_minutes(30)
            .with_otp_digits(8)
            .with_otp_ttl_minutes(5)
            .with_hash_cost(3);
        assert_eq!(config.session_ttl_minutes(), 30);
        assert_eq!(config.otp_digits(), 8);
        assert_eq!(config.otp_ttl_minutes(), 5);
        assert_eq!(config.hash_cost(), 3);
    }

    #[test]
    fn cookie_secure_follows_frontend_scheme() {
        assert!(config().session_cookie_secure());
        let local = AuthConfig::new(
            "http://localhost:3000".to_string(),
            SecretString::from("a"),
            SecretString::from("b"),
        );
        assert!(!local.session_cookie_secure());
    }

    #[test]
    fn auth_state_constructs_with_memory_store() -> Result<()> {
        let state = AuthState::new(
            config(),
            Arc::new(MemoryStore::new()),
            Arc::new(LogEmailSender),
        )?;
        assert_eq!(state.store().kind(), "memory");
        Ok(())
    }
}
