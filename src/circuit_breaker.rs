//! # Circuit Breaker Module
//!
//! This module implements the circuit breaker pattern for upstream calls
//! (OCR, LLM and Reddit). It prevents cascading failures by failing fast when
//! an upstream has failed repeatedly, until a cooldown has elapsed.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::ocr_config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker guarding one upstream service
///
/// # State Machine
///
/// - **Closed**: Normal operation, requests pass through
/// - **Open**: Failure threshold reached, requests fail fast
/// - **Half-Open**: Cooldown elapsed, the next request is let through
///
/// # Configuration
///
/// Uses `RecoveryConfig` for:
/// - `circuit_breaker_threshold`: Failures before opening (default: 5)
/// - `circuit_breaker_reset_secs`: Cooldown before a trial request (default: 60s)
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    state: Mutex<BreakerState>,
    config: RecoveryConfig,
}

impl CircuitBreaker {
    /// Create a closed circuit breaker for the named upstream
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scan_it_know_it::circuit_breaker::CircuitBreaker;
    /// use scan_it_know_it::ocr_config::RecoveryConfig;
    ///
    /// let breaker = CircuitBreaker::new("ocr", RecoveryConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(name: impl Into<String>, config: RecoveryConfig) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(BreakerState::default()),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    // A poisoned lock only means another request panicked mid-update; the counters stay usable
    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check if the breaker is open (blocking requests)
    ///
    /// Returns `true` while the failure count is at or above the threshold and
    /// the cooldown has not elapsed. Once it has, the breaker closes again and
    /// the next request is allowed through.
    pub fn is_open(&self) -> bool {
        let mut state = self.lock();

        if state.failure_count < self.config.circuit_breaker_threshold {
            return false;
        }

        match state.last_failure_time {
            Some(last) if last.elapsed() < Duration::from_secs(self.config.circuit_breaker_reset_secs) => true,
            _ => {
                info!(upstream = %self.name, "Circuit breaker cooldown elapsed, closing");
                *state = BreakerState::default();
                false
            }
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());

        if state.failure_count == self.config.circuit_breaker_threshold {
            warn!(
                upstream = %self.name,
                failures = state.failure_count,
                "Circuit breaker opened"
            );
        }
    }

    /// Record a successful call, closing the breaker
    pub fn record_success(&self) {
        *self.lock() = BreakerState::default();
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }
}
