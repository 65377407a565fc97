//! Pacing and retry policies for model calls.
//!
//! The pipeline is strictly sequential, so pacing is a single governor
//! instance the chunk loop waits on before every model invocation: the first
//! call passes immediately, later calls are spaced at the configured period.
//! On a 429 the governor is swapped for a slower one; the base rate is
//! restored after a quiet cooldown.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Retry budget for one model call: `max_retries` further attempts after the
/// first, each preceded by a fixed `delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_secs(1),
        }
    }
}

/// How long the slowed-down rate persists after the last 429.
const SLOWDOWN_COOLDOWN: Duration = Duration::from_secs(60);

/// Maximum slowdown multiplier applied to the base period.
const MAX_SLOWDOWN: u32 = 16;

/// Fixed-period pacer for sequential model calls, with adaptive slowdown.
pub struct ModelPacer {
    limiter: ArcSwap<DirectLimiter>,
    base_period: Duration,
    slowdown: AtomicU32,
    last_429: Mutex<Option<Instant>>,
}

impl ModelPacer {
    /// Create a pacer spacing calls `period` apart. A zero period disables
    /// spacing (every acquire passes immediately).
    pub fn new(period: Duration) -> Self {
        Self {
            limiter: ArcSwap::from_pointee(Self::build_limiter(period)),
            base_period: period,
            slowdown: AtomicU32::new(1),
            last_429: Mutex::new(None),
        }
    }

    fn build_limiter(period: Duration) -> DirectLimiter {
        // Quota rejects a zero period; fall back to an effectively
        // unthrottled limiter.
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::with_period(Duration::from_nanos(1)).unwrap());
        RateLimiter::direct(quota)
    }

    /// Wait until the next call is allowed.
    pub async fn acquire(&self) {
        self.maybe_restore();
        let limiter = self.limiter.load();
        limiter.until_ready().await;
    }

    /// Record a 429: double the period (capped) and remember when.
    pub fn on_rate_limited(&self) {
        if let Ok(mut last) = self.last_429.lock() {
            *last = Some(Instant::now());
        }
        let _ = self
            .slowdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| {
                Some((f * 2).min(MAX_SLOWDOWN))
            });
        let factor = self.slowdown.load(Ordering::SeqCst);
        if let Some(scaled) = self.base_period.checked_mul(factor) {
            tracing::warn!(factor, period_ms = scaled.as_millis() as u64, "model rate limited, slowing down");
            self.limiter.store(Self::build_limiter(scaled).into());
        }
    }

    /// Restore the base rate once the cooldown has elapsed without a 429.
    fn maybe_restore(&self) {
        if self.slowdown.load(Ordering::SeqCst) == 1 {
            return;
        }
        let quiet = self
            .last_429
            .lock()
            .ok()
            .and_then(|last| *last)
            .is_none_or(|at| at.elapsed() >= SLOWDOWN_COOLDOWN);
        if quiet {
            self.slowdown.store(1, Ordering::SeqCst);
            self.limiter
                .store(Self::build_limiter(self.base_period).into());
            tracing::debug!("model pacing restored to base rate");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_acquire_is_immediate() {
        let pacer = ModelPacer::new(Duration::from_secs(60));
        let start = Instant::now();
        pacer.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn zero_period_never_blocks() {
        let pacer = ModelPacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            pacer.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn consecutive_acquires_are_spaced() {
        let pacer = ModelPacer::new(Duration::from_millis(50));
        let start = Instant::now();
        pacer.acquire().await;
        pacer.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn slowdown_doubles_and_caps() {
        let pacer = ModelPacer::new(Duration::from_millis(10));
        for _ in 0..10 {
            pacer.on_rate_limited();
        }
        assert_eq!(pacer.slowdown.load(Ordering::SeqCst), MAX_SLOWDOWN);
    }
}
