//! # Retry Module
//!
//! Runs an upstream call behind a circuit breaker, a per-attempt timeout and
//! exponential backoff with jitter. Used for OCR, LLM and Reddit calls alike.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::ocr_config::RecoveryConfig;
use crate::ocr_errors::OcrError;

/// Run `call` with the breaker's recovery settings
///
/// 1. Fail fast with [`OcrError::CircuitOpen`] when the breaker is open
/// 2. Run up to `max_retries + 1` attempts, each bounded by `operation_timeout_secs`
/// 3. Wait `calculate_retry_delay(attempt)` between attempts
/// 4. Record success on the breaker, or one failure once every attempt failed
///
/// Validation errors are returned immediately; retrying cannot fix the input.
pub async fn with_resilience<T, F, Fut>(breaker: &CircuitBreaker, mut call: F) -> Result<T, OcrError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OcrError>>,
{
    let upstream = breaker.name().to_string();

    if breaker.is_open() {
        warn!(upstream = %upstream, "Circuit breaker is open, rejecting request");
        return Err(OcrError::CircuitOpen(format!(
            "{upstream} is temporarily unavailable due to repeated failures"
        )));
    }

    let recovery = breaker.config().clone();
    let timeout = Duration::from_secs(recovery.operation_timeout_secs);
    let max_attempts = recovery.max_retries + 1; // +1 for initial attempt
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(OcrError::Timeout(format!(
                "{upstream} call timed out after {} seconds",
                recovery.operation_timeout_secs
            ))),
        };

        match result {
            Ok(value) => {
                breaker.record_success();
                info!(
                    upstream = %upstream,
                    attempt,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Upstream call succeeded"
                );
                return Ok(value);
            }
            Err(err) if err.is_client_error() => return Err(err),
            Err(err) => {
                if attempt >= max_attempts {
                    breaker.record_failure();
                    warn!(
                        upstream = %upstream,
                        attempts = attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Upstream call failed permanently: {err}"
                    );
                    return Err(err);
                }

                let delay_ms = calculate_retry_delay(attempt, &recovery);
                warn!(upstream = %upstream, "Attempt {attempt} failed: {err}. Retrying in {delay_ms}ms");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// Calculate retry delay with exponential backoff
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay)
/// final_delay = delay + random(0, delay/4)
/// ```
///
/// ```rust
/// use scan_it_know_it::ocr_config::RecoveryConfig;
/// use scan_it_know_it::retry::calculate_retry_delay;
///
/// let config = RecoveryConfig::default();
/// let first = calculate_retry_delay(1, &config);
/// assert!((1000..1250).contains(&first));
/// ```
pub fn calculate_retry_delay(attempt: u32, config: &RecoveryConfig) -> u64 {
    let exponent = attempt.saturating_sub(1).min(20);
    let delay = config
        .base_retry_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(config.max_retry_delay_ms);

    let jitter_range = delay / 4;
    let jitter = if jitter_range > 0 {
        rand::random::<u64>() % jitter_range
    } else {
        0
    };
    delay + jitter
}
