//! Fixed-window rate limiter.
//!
//! Each client gets a counter that resets when its window ends. Up to twice
//! the budget can land in a short span straddling a window boundary, which is
//! fine for shielding the upstream source from overload.

use std::collections::HashMap;
use std::sync::Mutex;

use axum::http::{HeaderMap, HeaderValue};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::current_timestamp_ms;
use crate::lock::acquire;
use crate::ratelimit::RateLimitPolicy;

// == Rate Window ==
/// Request counter for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateWindow {
    /// Requests observed in the current window
    pub count: u32,
    /// When the window resets (Unix milliseconds)
    pub reset_at_ms: u64,
}

impl RateWindow {
    fn open(now_ms: u64, window_secs: u64) -> Self {
        Self {
            count: 0,
            reset_at_ms: now_ms.saturating_add(window_secs.saturating_mul(1000)),
        }
    }
}

// == Rate Decision ==
/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix milliseconds at which the window resets
    pub reset_at_ms: u64,
    retry_after_secs: u64,
}

impl RateDecision {
    fn from_count(count: u32, limit: u32, reset_at_ms: u64, now_ms: u64) -> Self {
        let allowed = count <= limit;
        let wait_ms = reset_at_ms.saturating_sub(now_ms);
        Self {
            allowed,
            limit,
            remaining: limit.saturating_sub(count),
            reset_at_ms,
            retry_after_secs: wait_ms.div_ceil(1000).max(1),
        }
    }

    /// The decision handed out when the limiter itself is broken.
    fn fail_open(limit: u32, window_secs: u64, now_ms: u64) -> Self {
        let window = RateWindow::open(now_ms, window_secs);
        Self::from_count(0, limit, window.reset_at_ms, now_ms)
    }

    /// Whole seconds until the window resets, at least 1.
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after_secs
    }

    /// Reset time as an RFC 3339 string.
    pub fn reset_at_rfc3339(&self) -> String {
        Utc.timestamp_millis_opt(self.reset_at_ms as i64)
            .single()
            .map(|at| at.to_rfc3339())
            .unwrap_or_default()
    }

    /// Writes `X-RateLimit-*` headers, plus `Retry-After` when rejected.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert("x-ratelimit-limit", HeaderValue::from(self.limit));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(self.remaining));
        if let Ok(reset) = HeaderValue::from_str(&self.reset_at_rfc3339()) {
            headers.insert("x-ratelimit-reset", reset);
        }
        if !self.allowed {
            headers.insert("retry-after", HeaderValue::from(self.retry_after_secs));
        }
    }
}

// == Rate Limiter ==
/// Per-client fixed-window counters behind their own lock.
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    /// Seconds a finished window is kept before [`RateLimiter::sweep`] drops it
    grace_secs: u64,
}

impl RateLimiter {
    pub fn new(grace_secs: u64) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            grace_secs,
        }
    }

    /// Counts one request from `client_key` against `max_requests` per
    /// `window_secs`.
    ///
    /// An internal fault allows the request rather than rejecting it.
    pub fn check(&self, client_key: &str, max_requests: u32, window_secs: u64) -> RateDecision {
        self.check_at(client_key, max_requests, window_secs, current_timestamp_ms())
    }

    /// [`RateLimiter::check`] for a policy.
    pub fn check_policy(&self, client_key: &str, policy: RateLimitPolicy) -> RateDecision {
        self.check(client_key, policy.max_requests, policy.window_secs)
    }

    pub fn check_at(
        &self,
        client_key: &str,
        max_requests: u32,
        window_secs: u64,
        now_ms: u64,
    ) -> RateDecision {
        let Some(mut windows) = acquire(&self.windows, "rate limiter") else {
            warn!(client = %client_key, "rate limiter unavailable, allowing request");
            return RateDecision::fail_open(max_requests, window_secs, now_ms);
        };

        let window = windows
            .entry(client_key.to_string())
            .or_insert_with(|| RateWindow::open(now_ms, window_secs));
        if now_ms >= window.reset_at_ms {
            *window = RateWindow::open(now_ms, window_secs);
        }
        window.count = window.count.saturating_add(1);
        let (count, reset_at_ms) = (window.count, window.reset_at_ms);
        drop(windows);

        let decision = RateDecision::from_count(count, max_requests, reset_at_ms, now_ms);
        if !decision.allowed {
            debug!(
                client = %client_key,
                count,
                limit = max_requests,
                retry_after = decision.retry_after_secs(),
                "rate limit exceeded"
            );
        }
        decision
    }

    // == Sweep ==
    /// Drops windows that ended more than the grace period ago.
    pub fn sweep(&self) -> usize {
        self.sweep_at(current_timestamp_ms())
    }

    pub fn sweep_at(&self, now_ms: u64) -> usize {
        let grace_ms = self.grace_secs.saturating_mul(1000);
        let Some(mut windows) = acquire(&self.windows, "rate limiter") else {
            return 0;
        };
        let before = windows.len();
        windows.retain(|_, window| now_ms <= window.reset_at_ms.saturating_add(grace_ms));
        before - windows.len()
    }

    /// Forgets the window of a single client.
    pub fn reset(&self, client_key: &str) {
        if let Some(mut windows) = acquire(&self.windows, "rate limiter") {
            windows.remove(client_key);
        }
    }

    /// Forgets every window.
    pub fn clear(&self) {
        if let Some(mut windows) = acquire(&self.windows, "rate limiter") {
            windows.clear();
        }
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        acquire(&self.windows, "rate limiter")
            .map(|windows| windows.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const NOW: u64 = 1_700_000_000_000;

    #[test]
    fn test_window_allows_budget_then_rejects() {
        let limiter = RateLimiter::default();

        let remaining: Vec<u32> = (0..3)
            .map(|_| {
                let decision = limiter.check_at("ip:1.2.3.4", 3, 10, NOW);
                assert!(decision.allowed);
                decision.remaining
            })
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);

        let rejected = limiter.check_at("ip:1.2.3.4", 3, 10, NOW + 500);
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
        assert_eq!(rejected.reset_at_ms, NOW + 10_000);
    }

    #[test]
    fn test_window_resets_after_reset_at() {
        let limiter = RateLimiter::default();
        for _ in 0..4 {
            limiter.check_at("client", 3, 10, NOW);
        }

        let decision = limiter.check_at("client", 3, 10, NOW + 10_000);

        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
        assert_eq!(decision.reset_at_ms, NOW + 20_000);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::default();
        limiter.check_at("a", 1, 10, NOW);

        assert!(!limiter.check_at("a", 1, 10, NOW).allowed);
        assert!(limiter.check_at("b", 1, 10, NOW).allowed);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let limiter = RateLimiter::default();
        limiter.check_at("c", 1, 10, NOW);

        let decision = limiter.check_at("c", 1, 10, NOW + 8_500);
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after_secs(), 2);
    }

    #[test]
    fn test_sweep_respects_grace_period() {
        let limiter = RateLimiter::new(60);
        limiter.check_at("old", 5, 10, NOW);
        limiter.check_at("fresh", 5, 10, NOW + 50_000);

        // "old" ended at NOW+10s, so NOW+70s is exactly the end of its grace
        assert_eq!(limiter.sweep_at(NOW + 70_000), 0);
        assert_eq!(limiter.sweep_at(NOW + 70_001), 1);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_reset_and_clear() {
        let limiter = RateLimiter::default();
        limiter.check_at("a", 1, 10, NOW);
        limiter.check_at("b", 1, 10, NOW);

        limiter.reset("a");
        assert!(limiter.check_at("a", 1, 10, NOW).allowed);

        limiter.clear();
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_fails_open_when_poisoned() {
        let limiter = Arc::new(RateLimiter::default());

        let poisoner = Arc::clone(&limiter);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.windows.lock().unwrap();
            panic!("fault while holding the rate limiter lock");
        })
        .join();
        assert!(result.is_err());

        for _ in 0..5 {
            let decision = limiter.check_at("client", 1, 10, NOW);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, 1);
        }
    }

    #[test]
    fn test_headers_on_rejection() {
        let limiter = RateLimiter::default();
        limiter.check_at("h", 1, 30, NOW);
        let decision = limiter.check_at("h", 1, 30, NOW);

        let mut headers = HeaderMap::new();
        decision.apply_headers(&mut headers);

        assert_eq!(headers["x-ratelimit-limit"], "1");
        assert_eq!(headers["x-ratelimit-remaining"], "0");
        assert_eq!(headers["retry-after"], "30");
        assert!(headers.contains_key("x-ratelimit-reset"));
    }

    #[test]
    fn test_no_retry_after_when_allowed() {
        let limiter = RateLimiter::default();
        let decision = limiter.check_at("h", 5, 30, NOW);

        let mut headers = HeaderMap::new();
        decision.apply_headers(&mut headers);

        assert_eq!(headers["x-ratelimit-remaining"], "4");
        assert!(!headers.contains_key("retry-after"));
    }
}
