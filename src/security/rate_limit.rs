//! Fixed-window rate limiting keyed by client and request path.
//!
//! Every request is counted under `client:path`. Requests whose `Origin`
//! contains one of the configured privileged origins get the larger limit.
//! The expire/reset/increment step for a key runs under that key's map entry
//! guard, so concurrent requests near a window boundary can neither lose an
//! increment nor reset a window twice.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::security::client::{client_identifier, rate_key};
use crate::security::clock::{Clock, SystemClock};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Body of every 429 produced by the limiter.
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admit {
        limit: u32,
        remaining: u32,
        /// Epoch milliseconds at which the current window ends.
        reset_at: u64,
    },
    Reject {
        limit: u32,
        /// Epoch milliseconds after which the key is admitted again.
        retry_after: u64,
    },
}

impl Decision {
    pub fn is_admit(&self) -> bool {
        matches!(self, Decision::Admit { .. })
    }
}

/// Who a request is counted as, and which limit applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestClass {
    pub key: String,
    pub privileged: bool,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    count: u64,
    window_start: u64,
}

struct Inner {
    enabled: bool,
    default_limit: u32,
    privileged_limit: u32,
    window_ms: u64,
    privileged_origins: Vec<String>,
    counters: DashMap<String, CounterEntry>,
    clock: Arc<dyn Clock>,
}

/// Shared fixed-window limiter state. Cloning yields another handle to the
/// same counters.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                enabled: config.enabled,
                default_limit: config.default_limit,
                privileged_limit: config.privileged_limit,
                window_ms: config.window_ms,
                privileged_origins: config.privileged_origins.clone(),
                counters: DashMap::new(),
                clock,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    pub fn window_ms(&self) -> u64 {
        self.inner.window_ms
    }

    pub fn now_millis(&self) -> u64 {
        self.inner.clock.now_millis()
    }

    /// Whether an `Origin` header value qualifies for the privileged limit.
    pub fn is_privileged(&self, origin: Option<&str>) -> bool {
        match origin {
            Some(origin) if !origin.is_empty() => self
                .inner
                .privileged_origins
                .iter()
                .any(|p| origin.contains(p.as_str())),
            _ => false,
        }
    }

    /// Derive the counter key and applicable limit for a request.
    pub fn classify<B>(&self, request: &Request<B>) -> RequestClass {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        let client = client_identifier(request.headers(), peer);
        let key = rate_key(&client, request.uri().path());

        let origin = request
            .headers()
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok());
        let privileged = self.is_privileged(origin);
        let limit = if privileged {
            self.inner.privileged_limit
        } else {
            self.inner.default_limit
        };

        RequestClass {
            key,
            privileged,
            limit,
        }
    }

    /// Count a request and decide whether it is admitted.
    pub fn admit<B>(&self, request: &Request<B>) -> Decision {
        let class = self.classify(request);
        self.check(&class.key, class.limit)
    }

    /// Count one request against `key` and compare it with `limit`.
    pub fn check(&self, key: &str, limit: u32) -> Decision {
        let now = self.inner.clock.now_millis();
        let window = self.inner.window_ms;

        let (count, window_start) = {
            let mut entry = self
                .inner
                .counters
                .entry(key.to_owned())
                .or_insert(CounterEntry {
                    count: 0,
                    window_start: now,
                });

            // A clock reading behind window_start saturates to 0 and never resets.
            if now.saturating_sub(entry.window_start) > window {
                entry.count = 0;
                entry.window_start = now;
            }
            entry.count = entry.count.saturating_add(1);
            (entry.count, entry.window_start)
        };

        let reset_at = window_start.saturating_add(window);
        if count > u64::from(limit) {
            Decision::Reject {
                limit,
                retry_after: reset_at,
            }
        } else {
            Decision::Admit {
                limit,
                remaining: limit - count as u32,
                reset_at,
            }
        }
    }

    /// Requests counted for `key` in its current window, if it is tracked.
    pub fn count(&self, key: &str) -> Option<u64> {
        self.inner.counters.get(key).map(|entry| entry.count)
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.inner.counters.len()
    }

    /// Drop every counter whose window has expired. Returns how many were removed.
    ///
    /// An evicted key behaves exactly like one reset on its next request.
    pub fn evict_expired(&self) -> usize {
        let now = self.inner.clock.now_millis();
        let window = self.inner.window_ms;
        let before = self.inner.counters.len();
        self.inner
            .counters
            .retain(|_, entry| now.saturating_sub(entry.window_start) <= window);
        before.saturating_sub(self.inner.counters.len())
    }
}

/// Middleware applying the limiter ahead of the downstream pipeline.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.is_enabled() {
        return next.run(request).await;
    }

    let class = limiter.classify(&request);
    match limiter.check(&class.key, class.limit) {
        Decision::Admit {
            limit,
            remaining,
            reset_at,
        } => {
            tracing::trace!(key = %class.key, limit, remaining, "Request admitted");
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset_at));
            response
        }
        Decision::Reject { limit, retry_after } => {
            tracing::warn!(
                key = %class.key,
                privileged = class.privileged,
                limit,
                retry_after,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited(class.privileged);
            rejection(limit, retry_after, limiter.now_millis())
        }
    }
}

fn rejection(limit: u32, retry_after: u64, now: u64) -> Response {
    let wait_secs = retry_after.saturating_sub(now).div_ceil(1000);
    (
        StatusCode::TOO_MANY_REQUESTS,
        [
            (X_RATELIMIT_LIMIT, HeaderValue::from(limit)),
            (X_RATELIMIT_REMAINING, HeaderValue::from(0u32)),
            (X_RATELIMIT_RESET, HeaderValue::from(retry_after)),
            (header::RETRY_AFTER, HeaderValue::from(wait_secs)),
        ],
        RATE_LIMIT_MESSAGE,
    )
        .into_response()
}
