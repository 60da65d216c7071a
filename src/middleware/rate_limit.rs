use axum::{
    extract::{connect_info::ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::{hash_map::Entry, HashMap},
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;

use super::ip::extract_ip_from_headers;
use crate::error::AppError;
use crate::state::AppState;

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";

/// Time source for window calculations.
///
/// Injected into the limiter so window-boundary behaviour can be tested
/// deterministically with a controllable clock.
pub trait Clock: Send + Sync + 'static {
    /// Current time as integer UNIX seconds.
    fn now_secs(&self) -> u64;
}

/// System clock reading wall-clock time at seconds resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
    }
}

/// Identity a quota is tracked against: one bucket per client address and
/// route path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateKey {
    client: String,
    route: String,
}

impl RateKey {
    pub fn new(client: &str, route: &str) -> Self {
        Self { client: client.to_owned(), route: route.to_owned() }
    }
}

/// Per-key counter state. `count` is the number of admitted requests since
/// `window_start`; an entry whose window has lapsed is reset whole, never
/// incrementally aged.
#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    window_start: u64,
    count: u32,
}

/// Outcome of a single rate check, plus quota telemetry for the
/// `X-RateLimit-*` response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_in: u64,
}

/// Internal bookkeeping fault. Surfaced as HTTP 500 at the middleware
/// boundary; never downgraded to a silent allow or deny.
#[derive(Debug, Error)]
pub enum LimiterError {
    #[error("rate limiter counter table lock poisoned")]
    TablePoisoned,
}

/// A thread-safe fixed-window rate limiter.
///
/// Counts requests per (client, route) key in non-overlapping windows of
/// `time_window` seconds. The counter table is shared process-wide and kept
/// in memory only; expired entries are swept opportunistically on each
/// check.
#[derive(Clone)]
pub struct RateLimiter {
    counters: Arc<Mutex<HashMap<RateKey, CounterEntry>>>,
    clock: Arc<dyn Clock>,
    requests_limit: u32,
    time_window: u64,
}

impl RateLimiter {
    /// Creates a limiter allowing `requests_limit` requests per key within
    /// each `time_window`-second window, using the system clock.
    pub fn new(requests_limit: u32, time_window: u64) -> Self {
        Self::with_clock(requests_limit, time_window, SystemClock)
    }

    /// Same as [`RateLimiter::new`] but with an explicit time source.
    pub fn with_clock(requests_limit: u32, time_window: u64, clock: impl Clock) -> Self {
        Self {
            counters: Arc::new(Mutex::new(HashMap::new())),
            clock: Arc::new(clock),
            requests_limit,
            time_window,
        }
    }

    /// Checks a request for `client` on `route` against the quota.
    ///
    /// The read-check-increment on an entry is atomic with respect to other
    /// calls for the same key: two concurrent requests can never both take
    /// the last slot of a window. The lock is never held across an await
    /// point.
    ///
    /// Expired entries are removed in the same critical section, bounded by
    /// table size. The entry just created or refreshed is itself live and
    /// therefore never swept.
    pub fn admit(&self, client: &str, route: &str) -> Result<Decision, LimiterError> {
        let now = self.clock.now_secs();
        let key = RateKey::new(client, route);
        let limit = self.requests_limit;

        let mut counters = self.counters.lock().map_err(|_| LimiterError::TablePoisoned)?;

        let fresh = CounterEntry { window_start: now, count: 1 };
        let decision = match counters.entry(key) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let elapsed = now.saturating_sub(entry.window_start);
                if elapsed > self.time_window {
                    // Expired: reset whole, never incrementally aged
                    *entry = fresh;
                    Decision {
                        allowed: true,
                        limit,
                        remaining: limit.saturating_sub(1),
                        reset_in: self.time_window,
                    }
                } else if entry.count >= limit {
                    // Deny without counting
                    Decision { allowed: false, limit, remaining: 0, reset_in: self.time_window - elapsed }
                } else {
                    entry.count += 1;
                    Decision {
                        allowed: true,
                        limit,
                        remaining: limit - entry.count,
                        reset_in: self.time_window - elapsed,
                    }
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Decision {
                    allowed: true,
                    limit,
                    remaining: limit.saturating_sub(1),
                    reset_in: self.time_window,
                }
            }
        };

        // Opportunistic sweep of expired entries, still under the lock
        let window = self.time_window;
        counters.retain(|_, entry| now.saturating_sub(entry.window_start) <= window);

        Ok(decision)
    }

    /// Number of live counter buckets. Exposed for tests.
    pub fn tracked_keys(&self) -> usize {
        self.counters.lock().map(|c| c.len()).unwrap_or(0)
    }
}

fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &Decision) {
    headers.insert(HEADER_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(HEADER_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(HEADER_RESET, HeaderValue::from(decision.reset_in));
}

/// Axum middleware gating every request through the shared [`RateLimiter`].
///
/// Denied requests are answered with 429 and the quota headers without
/// invoking the downstream handler. Admitted requests run downstream and the
/// headers are attached to whatever response comes back; downstream failures
/// pass through untouched.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let remote_ip = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
    let client = extract_ip_from_headers(req.headers(), remote_ip);
    let route = req.uri().path().to_owned();

    let decision = match state.rate_limiter.admit(&client.to_string(), &route) {
        Ok(decision) => decision,
        Err(e) => {
            tracing::error!("rate limiter bookkeeping fault: {}", e);
            return AppError::Internal(e.into()).into_response();
        }
    };

    if !decision.allowed {
        let mut response =
            AppError::RateLimited { retry_after_seconds: decision.reset_in }.into_response();
        apply_rate_limit_headers(response.headers_mut(), &decision);
        return response;
    }

    let mut response = next.run(req).await;
    apply_rate_limit_headers(response.headers_mut(), &decision);
    response
}
