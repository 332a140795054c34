//! Rate limiting implementation.
//!
//! Requests are counted per `(client address, limit class)` in a sliding
//! window. An endpoint names the classes that apply to it; a request is
//! admitted only if every applicable class has headroom, and only admitted
//! requests are counted.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

/// Independent limiter classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitClass {
    /// Every API endpoint.
    General,
    /// Create and delete operations.
    Write,
    /// The bulk user-population operation.
    Populate,
}

impl LimitClass {
    fn rejection_message(self) -> &'static str {
        match self {
            Self::General => "Too many requests from this IP, please try again later.",
            Self::Write => "Too many write operations from this IP, please try again later.",
            Self::Populate => "Too many populate requests from this IP, please try again later.",
        }
    }
}

impl fmt::Display for LimitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::General => "general",
            Self::Write => "write",
            Self::Populate => "populate",
        };
        f.write_str(name)
    }
}

/// Classes checked for read endpoints.
pub const READ_CLASSES: &[LimitClass] = &[LimitClass::General];
/// Classes checked for create/delete endpoints.
pub const WRITE_CLASSES: &[LimitClass] = &[LimitClass::General, LimitClass::Write];
/// Classes checked for bulk-populate.
pub const POPULATE_CLASSES: &[LimitClass] = &[LimitClass::General, LimitClass::Populate];

/// Window and ceiling for one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassLimit {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Time window duration.
    pub window: Duration,
}

impl ClassLimit {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }
}

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    pub enabled: bool,
    pub general: ClassLimit,
    pub write: ClassLimit,
    pub populate: ClassLimit,
    /// Maximum number of tracked keys (memory limit).
    pub max_tracked_keys: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            general: ClassLimit::new(100, 15 * 60),
            write: ClassLimit::new(50, 15 * 60),
            populate: ClassLimit::new(10, 60 * 60),
            max_tracked_keys: 10000,
        }
    }
}

impl RateLimitConfig {
    /// Create a disabled rate limiter config.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Limit for a class.
    pub fn limit(&self, class: LimitClass) -> ClassLimit {
        match class {
            LimitClass::General => self.general,
            LimitClass::Write => self.write,
            LimitClass::Populate => self.populate,
        }
    }

    fn longest_window(&self) -> Duration {
        self.general
            .window
            .max(self.write.window)
            .max(self.populate.window)
    }
}

/// Time source for the limiter.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        self.base + offset
    }
}

/// Request log for one key.
#[derive(Debug, Clone, Default)]
struct RequestRecord {
    /// Timestamps of admitted requests in the current window, oldest first.
    timestamps: VecDeque<Instant>,
}

impl RequestRecord {
    /// Drop expired timestamps and return the current count.
    fn clean_and_count(&mut self, now: Instant, window: Duration) -> u32 {
        if let Some(cutoff) = now.checked_sub(window) {
            while self.timestamps.front().is_some_and(|&t| t <= cutoff) {
                self.timestamps.pop_front();
            }
        }
        self.timestamps.len() as u32
    }

    /// Time until the oldest timestamp leaves the window.
    fn retry_after(&self, now: Instant, window: Duration) -> Duration {
        self.timestamps
            .front()
            .map(|&t| window.saturating_sub(now.saturating_duration_since(t)))
            .unwrap_or(window)
    }
}

/// Outcome of an admitted request, reported for the tightest class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub limit: u32,
    pub remaining: u32,
}

/// Outcome of a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    /// First class found without headroom.
    pub class: LimitClass,
    pub limit: u32,
    pub retry_after: Duration,
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        AppError::RateLimitExceeded {
            message: rejection.class.rejection_message(),
            retry_after: rejection.retry_after,
        }
    }
}

type RecordMap = HashMap<(IpAddr, LimitClass), RequestRecord>;

/// Thread-safe multi-class rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    records: Mutex<RecordMap>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    last_cleanup: Mutex<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter on the system clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a rate limiter driven by the given clock.
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            records: Mutex::new(HashMap::new()),
            config,
            clock,
            last_cleanup: Mutex::new(now),
        }
    }

    /// Create a disabled rate limiter.
    pub fn disabled() -> Self {
        Self::new(RateLimitConfig::disabled())
    }

    /// Check if rate limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn lock_records(&self) -> MutexGuard<'_, RecordMap> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check and count a request from `ip` against every class in `classes`.
    ///
    /// The check and the increments happen under one lock, so concurrent
    /// bursts cannot undercount, and a rejected request increments nothing.
    pub fn check(&self, ip: IpAddr, classes: &[LimitClass]) -> Result<Admission, Rejection> {
        let tightest = classes
            .iter()
            .map(|&c| self.config.limit(c).max_requests)
            .min()
            .unwrap_or(0);

        if !self.config.enabled {
            return Ok(Admission {
                limit: tightest,
                remaining: tightest,
            });
        }

        let now = self.clock.now();
        self.maybe_cleanup(now);

        let mut records = self.lock_records();

        let incoming = classes
            .iter()
            .filter(|&&class| !records.contains_key(&(ip, class)))
            .count();
        if records.len() + incoming > self.config.max_tracked_keys {
            self.make_room(&mut records, now, ip, incoming);
        }

        let mut admission: Option<Admission> = None;

        for &class in classes {
            let limit = self.config.limit(class);
            let record = records.entry((ip, class)).or_default();
            let count = record.clean_and_count(now, limit.window);

            if count >= limit.max_requests {
                return Err(Rejection {
                    class,
                    limit: limit.max_requests,
                    retry_after: record.retry_after(now, limit.window),
                });
            }

            let remaining = limit.max_requests - count - 1;
            if admission.map_or(true, |a| remaining < a.remaining) {
                admission = Some(Admission {
                    limit: limit.max_requests,
                    remaining,
                });
            }
        }

        for &class in classes {
            records
                .entry((ip, class))
                .or_default()
                .timestamps
                .push_back(now);
        }

        Ok(admission.unwrap_or(Admission {
            limit: 0,
            remaining: 0,
        }))
    }

    /// Prune idle keys once per longest window.
    fn maybe_cleanup(&self, now: Instant) {
        let interval = self.config.longest_window();
        let mut last = self
            .last_cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if now.saturating_duration_since(*last) <= interval {
            return;
        }
        *last = now;
        drop(last);

        let mut records = self.lock_records();
        let before = records.len();

        self.drop_idle(&mut records, now);
        let cap = self.config.max_tracked_keys;
        if records.len() > cap {
            let mut entries: Vec<_> = records
                .iter()
                .map(|(key, r)| (*key, r.timestamps.back().copied()))
                .collect();
            entries.sort_by_key(|(_, t)| *t);

            let to_remove = records.len() - cap;
            for (key, _) in entries.into_iter().take(to_remove) {
                records.remove(&key);
            }
        }

        tracing::debug!(before, after = records.len(), "rate limiter cleanup");
    }

    /// Remove keys with no request left in their window.
    fn drop_idle(&self, records: &mut RecordMap, now: Instant) {
        records.retain(|(_, class), record| {
            record.clean_and_count(now, self.config.limit(*class).window) > 0
        });
    }

    /// Free space for `incoming` new keys of `ip`.
    ///
    /// Idle keys go first, then the least recently active keys of other
    /// addresses.
    fn make_room(&self, records: &mut RecordMap, now: Instant, ip: IpAddr, incoming: usize) {
        self.drop_idle(records, now);

        let cap = self.config.max_tracked_keys.saturating_sub(incoming);
        let mut evicted = 0usize;
        while records.len() > cap {
            let victim = records
                .iter()
                .filter(|((key_ip, _), _)| *key_ip != ip)
                .min_by_key(|(_, r)| r.timestamps.back().copied())
                .map(|(key, _)| *key);

            match victim {
                Some(key) => {
                    records.remove(&key);
                    evicted += 1;
                }
                None => break,
            }
        }

        if evicted > 0 {
            tracing::debug!(evicted, tracked = records.len(), "rate limiter key cap reached");
        }
    }

    /// Get current stats.
    pub fn stats(&self) -> RateLimitStats {
        RateLimitStats {
            tracked_keys: self.lock_records().len(),
            enabled: self.config.enabled,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Rate limit statistics.
#[derive(Debug, Clone)]
pub struct RateLimitStats {
    pub tracked_keys: usize,
    pub enabled: bool,
}

/// Limiter plus the classes one route is checked against.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    limiter: Arc<RateLimiter>,
    classes: &'static [LimitClass],
}

impl RateLimitPolicy {
    pub fn new(limiter: Arc<RateLimiter>, classes: &'static [LimitClass]) -> Self {
        Self { limiter, classes }
    }
}

/// Rate limit middleware for axum.
///
/// Runs before the handler's extractors, so over-limit requests never reach
/// body parsing or validation.
pub async fn rate_limit_middleware(
    State(policy): State<RateLimitPolicy>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    match policy.limiter.check(addr.ip(), policy.classes) {
        Ok(admission) => {
            let mut response = next.run(request).await;

            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(admission.limit));
            headers.insert(
                "X-RateLimit-Remaining",
                HeaderValue::from(admission.remaining),
            );

            response
        }
        Err(rejection) => {
            tracing::warn!(
                client = %addr.ip(),
                class = %rejection.class,
                path = %request.uri().path(),
                "rate limit exceeded"
            );

            let mut response = AppError::from(rejection).into_response();
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(rejection.limit));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(0u32));

            response
        }
    }
}
