//! Per-route fixed-window rate limiting.
//!
//! Each mutating auth route gets its own quota, keyed by client IP and
//! matched route path, so one client exhausting `/api/auth/login` leaves its
//! `/api/auth/register` budget untouched. Limit, remaining, and reset
//! metadata are surfaced on every response; rejected requests additionally
//! carry a retry hint. Budgets are process-local and reset on restart.

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::utils::extract_client_ip;
use crate::rate_limit::{FixedWindowLimiter, RateLimitDecision};

const HEADER_LIMIT: &str = "x-ratelimit-limit";
const HEADER_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_RESET: &str = "x-ratelimit-reset";
const HEADER_RETRY_AFTER: &str = "retry-after";

const DEFAULT_WINDOW_SECONDS: i64 = 60;

/// Body returned with a 429.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedResponse {
    pub error: String,
    pub retry_after_seconds: i64,
}

/// Route-scoped quota handed to the middleware as state.
#[derive(Clone)]
pub struct RouteQuota {
    limiter: Arc<FixedWindowLimiter>,
    limit: u32,
    window_seconds: i64,
}

impl RouteQuota {
    #[must_use]
    pub fn new(limiter: Arc<FixedWindowLimiter>, limit: u32) -> Self {
        Self {
            limiter,
            limit,
            window_seconds: DEFAULT_WINDOW_SECONDS,
        }
    }

    #[must_use]
    pub fn with_window_seconds(mut self, seconds: i64) -> Self {
        self.window_seconds = seconds.max(1);
        self
    }
}

/// Middleware enforcing a [`RouteQuota`]; mount with
/// `axum::middleware::from_fn_with_state`.
pub async fn enforce(State(quota): State<RouteQuota>, request: Request, next: Next) -> Response {
    let client = extract_client_ip(request.headers()).unwrap_or_else(|| "unknown".to_string());
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |path| {
            path.as_str().to_string()
        });
    let key = format!("{client}:{route}");

    let decision = quota
        .limiter
        .check(&key, quota.limit, Duration::seconds(quota.window_seconds))
        .await;

    if decision.allowed {
        let mut response = next.run(request).await;
        apply_headers(response.headers_mut(), &decision);
        response
    } else {
        let body = RateLimitedResponse {
            error: "Too many requests".to_string(),
            retry_after_seconds: decision.reset_after_seconds,
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        apply_headers(response.headers_mut(), &decision);
        response
    }
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    insert_number(headers, HEADER_LIMIT, i64::from(decision.limit));
    insert_number(headers, HEADER_REMAINING, i64::from(decision.remaining));
    insert_number(headers, HEADER_RESET, decision.reset_after_seconds);
    let retry_after = if decision.allowed {
        0
    } else {
        decision.reset_after_seconds
    };
    insert_number(headers, HEADER_RETRY_AFTER, retry_after);
}

fn insert_number(headers: &mut HeaderMap, name: &'static str, value: i64) {
    if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_reflect_the_decision() {
        let mut headers = HeaderMap::new();
        let decision = RateLimitDecision {
            allowed: true,
            limit: 10,
            remaining: 7,
            reset_after_seconds: 42,
        };
        apply_headers(&mut headers, &decision);
        assert_eq!(headers.get(HEADER_LIMIT).unwrap(), "10");
        assert_eq!(headers.get(HEADER_REMAINING).unwrap(), "7");
        assert_eq!(headers.get(HEADER_RESET).unwrap(), "42");
        assert_eq!(headers.get(HEADER_RETRY_AFTER).unwrap(), "0");
    }

    #[test]
    fn rejection_sets_a_real_retry_hint() {
        let mut headers = HeaderMap::new();
        let decision = RateLimitDecision {
            allowed: false,
            limit: 10,
            remaining: 0,
            reset_after_seconds: 17,
        };
        apply_headers(&mut headers, &decision);
        assert_eq!(headers.get(HEADER_RETRY_AFTER).unwrap(), "17");
    }

    #[test]
    fn rate_limited_body_uses_camel_case() {
        let body = RateLimitedResponse {
            error: "Too many requests".to_string(),
            retry_after_seconds: 9,
        };
        let json = serde_json::to_value(&body).expect("serialize body");
        assert_eq!(json["retryAfterSeconds"], 9);
    }
}
