//! Email delivery abstraction used by the auth flows.
//!
//! Transport is an external collaborator: flows hand a message to an
//! [`EmailSender`] and the implementation decides how to deliver (SMTP, API,
//! etc.). The default sender for local dev logs the payload and returns
//! `Ok(())`. Dispatch happens on the request path; a production-hardened
//! variant could queue and retry in the background instead.

use anyhow::Result;
use tracing::info;

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub body_html: String,
}

/// Email delivery abstraction.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error to fail the surrounding flow.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            body = %message.body_html,
            "email send stub"
        );
        Ok(())
    }
}

/// Message for the registration verification code.
#[must_use]
pub fn verification_email(to_email: &str, code: &str, ttl_minutes: i64) -> EmailMessage {
    EmailMessage {
        to_email: to_email.to_string(),
        subject: "Verify your Agora account".to_string(),
        body_html: format!(
            "<p>Your OTP is <b>{code}</b>. It expires in {ttl_minutes} minutes.</p>"
        ),
    }
}

/// Message for a re-sent verification code.
#[must_use]
pub fn resend_email(to_email: &str, code: &str) -> EmailMessage {
    EmailMessage {
        to_email: to_email.to_string(),
        subject: "Your OTP code".to_string(),
        body_html: format!("<p>Your OTP is <b>{code}</b>.</p>"),
    }
}

/// Message for the password-recovery code.
#[must_use]
pub fn reset_email(to_email: &str, code: &str, ttl_minutes: i64) -> EmailMessage {
    EmailMessage {
        to_email: to_email.to_string(),
        subject: "Reset your Agora password".to_string(),
        body_html: format!(
            "<p>Your password reset OTP is <b>{code}</b>. It expires in {ttl_minutes} minutes.</p>"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sender_accepts_messages() {
        let sender = LogEmailSender;
        let message = verification_email("a@b.com", "123456", 10);
        assert!(sender.send(&message).is_ok());
    }

    #[test]
    fn templates_carry_the_code() {
        assert!(verification_email("a@b.com", "123456", 10)
            .body_html
            .contains("123456"));
        assert!(resend_email("a@b.com", "654321").body_html.contains("654321"));
        assert!(reset_email("a@b.com", "111222", 10)
            .body_html
            .contains("111222"));
    }

    #[test]
    fn templates_address_the_recipient() {
        assert_eq!(verification_email("a@b.com", "1", 10).to_email, "a@b.com");
    }
}
