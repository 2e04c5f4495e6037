//! Fixed-window request throttling keyed by client and route.
//!
//! Buckets reset at fixed boundaries rather than sliding. The table sweeps
//! expired entries on every check so it stays bounded without a background
//! task, and the clock is an explicit parameter on [`FixedWindowLimiter::check_at`]
//! so the windowing logic is testable without waiting out real time.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Outcome of one limiter check, with everything a caller needs to surface
/// the standard response metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the current window resets, rounded up.
    pub reset_after_seconds: i64,
}

struct Bucket {
    count: u32,
    reset_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct FixedWindowLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl FixedWindowLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a request against `key` and decide whether it is allowed.
    pub async fn check(&self, key: &str, limit: u32, window: Duration) -> RateLimitDecision {
        self.check_at(key, limit, window, Utc::now()).await
    }

    /// Clock-injected variant of [`check`](Self::check).
    pub async fn check_at(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let mut buckets = self.buckets.lock().await;
        // Expired buckets are dead weight for every key, not just this one.
        buckets.retain(|_, bucket| bucket.reset_at > now);

        let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            count: 0,
            reset_at: now + window,
        });
        bucket.count += 1;

        let reset_after_ms = (bucket.reset_at - now).num_milliseconds().max(0);
        RateLimitDecision {
            allowed: bucket.count <= limit,
            limit,
            remaining: limit.saturating_sub(bucket.count),
            reset_after_seconds: (reset_after_ms + 999) / 1000,
        }
    }

    /// Number of live buckets; used to observe sweeping.
    pub async fn bucket_count(&self) -> usize {
        self.buckets.lock().await.len()
    }
}
