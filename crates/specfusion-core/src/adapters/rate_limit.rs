//! Rate limiting and backoff helpers shared by adapters (§4.5 "Politeness").
//!
//! Two shapes show up across the platforms this service talks to: a fixed
//! base delay with random jitter (most adapters), and an adaptive stepper
//! that backs off further each time it sees a throttling response in a row
//! (Wecom, which rate-limits aggressively under sustained load).

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use rand::Rng;

/// Sleep for `base` plus a uniformly random jitter in `[0, base/2)`.
pub async fn jittered_delay(base: Duration) {
    let jitter_ms = rand::thread_rng().gen_range(0..=(base.as_millis() as u64 / 2).max(1));
    tokio::time::sleep(base + Duration::from_millis(jitter_ms)).await;
}

/// An adaptive delay stepper: each consecutive throttle response doubles the
/// delay (capped), and each clean response halves it back down (floored).
pub struct AdaptiveLimiter {
    base_ms: u64,
    max_ms: u64,
    current_ms: AtomicU32,
}

impl AdaptiveLimiter {
    /// Build a stepper starting at `base` and capped at `max`.
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base_ms: base.as_millis() as u64,
            max_ms: max.as_millis() as u64,
            current_ms: AtomicU32::new(base.as_millis() as u32),
        }
    }

    /// Sleep for the current delay, jittered by up to 20%.
    pub async fn wait(&self) {
        let current = u64::from(self.current_ms.load(Ordering::Relaxed));
        let jitter_ms = rand::thread_rng().gen_range(0..=(current / 5).max(1));
        tokio::time::sleep(Duration::from_millis(current + jitter_ms)).await;
    }

    /// Record a throttling response: double the delay, capped at `max`.
    pub fn record_throttled(&self) {
        let current = u64::from(self.current_ms.load(Ordering::Relaxed));
        let next = (current * 2).min(self.max_ms);
        self.current_ms.store(next as u32, Ordering::Relaxed);
    }

    /// Record a clean response: halve the delay back toward `base`.
    pub fn record_success(&self) {
        let current = u64::from(self.current_ms.load(Ordering::Relaxed));
        let next = (current / 2).max(self.base_ms);
        self.current_ms.store(next as u32, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_limiter_doubles_then_halves() {
        let limiter = AdaptiveLimiter::new(Duration::from_millis(100), Duration::from_millis(1600));
        assert_eq!(limiter.current_ms.load(Ordering::Relaxed), 100);
        limiter.record_throttled();
        assert_eq!(limiter.current_ms.load(Ordering::Relaxed), 200);
        limiter.record_throttled();
        limiter.record_throttled();
        limiter.record_throttled();
        // 100 -> 200 -> 400 -> 800 -> 1600 (capped)
        assert_eq!(limiter.current_ms.load(Ordering::Relaxed), 1600);
        limiter.record_throttled();
        assert_eq!(limiter.current_ms.load(Ordering::Relaxed), 1600, "must not exceed max");
        limiter.record_success();
        assert_eq!(limiter.current_ms.load(Ordering::Relaxed), 800);
    }
}
