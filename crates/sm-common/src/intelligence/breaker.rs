use std::time::{Duration, Instant};

use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before the next attempt is allowed.
    pub reset_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_window: Duration::from_secs(60),
        }
    }
}

/// Consecutive-failure circuit breaker guarding the intelligence service.
///
/// Owned by a single client instance and mutated behind its lock; state is
/// process-lifetime only. Closed → (failures ≥ threshold) → Open →
/// (reset window elapsed) → Closed again for a probe attempt, which either
/// resets the counter on success or walks back toward Open.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    failure_count: u32,
    open: bool,
    last_failure: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            failure_count: 0,
            open: false,
            last_failure: None,
        }
    }

    /// Whether a call may proceed. While open, denies until the reset window
    /// has elapsed since the last failure, then closes for a fresh attempt.
    pub fn try_acquire(&mut self) -> bool {
        if !self.open {
            return true;
        }

        let elapsed = self
            .last_failure
            .map(|at| at.elapsed() >= self.config.reset_window)
            .unwrap_or(true);

        if elapsed {
            info!("circuit breaker reset window elapsed; attempting reconnection");
            self.open = false;
            self.failure_count = 0;
            true
        } else {
            false
        }
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.last_failure = Some(Instant::now());

        if self.failure_count >= self.config.failure_threshold && !self.open {
            self.open = true;
            error!(
                failures = self.failure_count,
                "circuit breaker opened for intelligence service"
            );
        }
    }

    pub fn record_success(&mut self) {
        if self.failure_count > 0 {
            info!("intelligence service recovered; resetting failure count");
        }
        self.failure_count = 0;
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, window_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            reset_window: Duration::from_millis(window_ms),
        })
    }

    #[test]
    fn opens_after_threshold_failures() {
        let mut breaker = breaker(3, 60_000);

        breaker.record_failure();
        breaker.record_failure();
        assert!(!breaker.is_open());
        assert!(breaker.try_acquire());

        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn success_resets_the_counter() {
        let mut breaker = breaker(3, 60_000);

        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert_eq!(breaker.failure_count(), 0);

        breaker.record_failure();
        breaker.record_failure();
        assert!(!breaker.is_open());
    }

    #[test]
    fn closes_again_after_the_reset_window() {
        let mut breaker = breaker(1, 10);

        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(!breaker.try_acquire());

        std::thread::sleep(Duration::from_millis(20));
        assert!(breaker.try_acquire());
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }
}
