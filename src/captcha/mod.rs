//! Stateless arithmetic captcha encoded in a signed, expiring token.
//!
//! The server keeps no challenge state: the answer travels inside a token
//! signed with a captcha-only secret, distinct from the session secret.
//! A validly-signed, unexpired token is proof the challenge was issued here.
//! Tokens are replayable until they expire; binding them to a single use
//! would reintroduce the shared state this design avoids.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Challenge lifetime in seconds: 10 minutes.
pub const CAPTCHA_TTL_SECONDS: i64 = 10 * 60;

const OPERAND_MIN: i64 = 1;
const OPERAND_MAX: i64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptchaError {
    /// Malformed, unsigned, or expired token. Collapsed on purpose so the
    /// caller cannot distinguish forgery from expiry.
    #[error("invalid or expired captcha token")]
    Invalid,
    #[error("captcha answer mismatch")]
    Mismatch,
}

/// A freshly issued challenge: human-readable prompt plus its signed token.
#[derive(Clone, Debug)]
pub struct Challenge {
    pub prompt: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CaptchaClaims {
    ans: i64,
    iat: i64,
    exp: i64,
}

pub struct CaptchaService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl CaptchaService {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
        }
    }

    /// Issue a new challenge with two small random operands.
    ///
    /// # Errors
    /// Returns [`CaptchaError::Invalid`] only if signing fails, which would
    /// indicate a broken secret rather than caller input.
    pub fn issue(&self) -> Result<Challenge, CaptchaError> {
        let mut rng = rand::thread_rng();
        let a = rng.gen_range(OPERAND_MIN..=OPERAND_MAX);
        let b = rng.gen_range(OPERAND_MIN..=OPERAND_MAX);
        let token = self.sign(a + b)?;
        Ok(Challenge {
            prompt: format!("What is {a} + {b}?"),
            token,
        })
    }

    /// Check a submitted answer against a previously issued token.
    ///
    /// Fails closed: any token the verifier does not accept is `Invalid`.
    ///
    /// # Errors
    /// [`CaptchaError::Invalid`] for bad tokens, [`CaptchaError::Mismatch`]
    /// for a wrong answer on a valid token.
    pub fn check(&self, token: &str, answer: i64) -> Result<(), CaptchaError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<CaptchaClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| CaptchaError::Invalid)?;
        if data.claims.ans == answer {
            Ok(())
        } else {
            Err(CaptchaError::Mismatch)
        }
    }

    fn sign(&self, answer: i64) -> Result<String, CaptchaError> {
        let now = Utc::now().timestamp();
        let claims = CaptchaClaims {
            ans: answer,
            iat: now,
            exp: now + CAPTCHA_TTL_SECONDS,
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(|_| CaptchaError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn service() -> CaptchaService {
        CaptchaService::new(&SecretString::from("captcha-test-secret"))
    }

    /// Parse the operands back out of the prompt.
    fn solve(prompt: &str) -> i64 {
        let pattern = Regex::new(r"What is (\d+) \+ (\d+)\?").expect("valid pattern");
        let captures = pattern.captures(prompt).expect("prompt shape");
        let a: i64 = captures[1].parse().expect("operand a");
        let b: i64 = captures[2].parse().expect("operand b");
        a + b
    }

    #[test]
    fn token_answer_matches_prompt_sum() {
        let service = service();
        let challenge = service.issue().expect("issue challenge");
        let answer = solve(&challenge.prompt);
        assert_eq!(service.check(&challenge.token, answer), Ok(()));
    }

    #[test]
    fn wrong_answer_is_rejected() {
        let service = service();
        let challenge = service.issue().expect("issue challenge");
        let answer = solve(&challenge.prompt);
        assert_eq!(
            service.check(&challenge.token, answer + 1),
            Err(CaptchaError::Mismatch)
        );
    }

    #[test]
    fn garbage_token_fails_closed() {
        let service = service();
        assert_eq!(
            service.check("not-a-token", 7),
            Err(CaptchaError::Invalid)
        );
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let issuing = CaptchaService::new(&SecretString::from("other-secret"));
        let challenge = issuing.issue().expect("issue challenge");
        let answer = solve(&challenge.prompt);
        assert_eq!(
            service().check(&challenge.token, answer),
            Err(CaptchaError::Invalid)
        );
    }

    #[test]
    fn expired_token_fails_even_with_correct_answer() {
        let service = service();
        // Sign claims that expired a minute ago with the same key.
        let now = Utc::now().timestamp();
        let claims = CaptchaClaims {
            ans: 7,
            iat: now - 120,
            exp: now - 60,
        };
        let token = encode(&Header::default(), &claims, &service.encoding_key)
            .expect("sign expired token");
        assert_eq!(service.check(&token, 7), Err(CaptchaError::Invalid));
    }
}
