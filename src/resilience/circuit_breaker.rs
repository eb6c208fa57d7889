//! # Circuit Breaker Implementation
//!
//! Fault isolation for the external ML service following the classic three-state
//! pattern: Closed (normal operation), Open (failing fast), and Half-Open
//! (testing recovery).
//!
//! The permit check is named [`CircuitBreaker::calls_allowed`]: `true` means the
//! request may proceed. Checking permits while Open may itself transition the
//! breaker to Half-Open once the open timeout has elapsed; that upgrade happens
//! atomically with respect to other readers so exactly one caller performs the
//! transition.

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed,
    /// Failure mode - all calls fail fast without executing
    Open,
    /// Testing recovery - calls allowed while successes accumulate
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Configuration parameters for a circuit breaker
///
/// These are fixed constants in the current design, not environment-tunable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in Closed that trip the circuit
    pub failure_threshold: u32,
    /// Consecutive successes in Half-Open that close the circuit
    pub success_threshold: u32,
    /// Cooldown after the last failure before permitting a probe call
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            open_timeout: Duration::from_secs(30),
        }
    }
}

/// Metrics snapshot for observability endpoints
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub total_failures: u64,
    pub total_successes: u64,
    pub times_opened: u64,
    pub seconds_since_last_failure: Option<f64>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    // Counters are meaningful only relative to the current state and are
    // reset on every transition
    failure_count: u32,
    success_count: u32,
    last_failure_at: Option<Instant>,
    total_failures: u64,
    total_successes: u64,
    times_opened: u64,
}

/// Three-state failure detector wrapping calls to one downstream dependency
///
/// All methods are safe for concurrent use; state is guarded by a single
/// read/write lock with bounded critical sections.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: RwLock<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: String, config: CircuitBreakerConfig) -> Self {
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            success_threshold = config.success_threshold,
            timeout_seconds = config.open_timeout.as_secs(),
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            config,
            inner: RwLock::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_at: None,
                total_failures: 0,
                total_successes: 0,
                times_opened: 0,
            }),
        }
    }

    /// Get current circuit state without side effects
    pub fn state(&self) -> CircuitState {
        self.inner.read().state
    }

    /// Check whether a call may proceed
    ///
    /// Closed and Half-Open always permit. Open permits only once the open
    /// timeout has elapsed since the last failure, in which case this check
    /// also transitions the breaker to Half-Open. The upgradable read lock
    /// guarantees a single caller wins that transition.
    pub fn calls_allowed(&self) -> bool {
        let inner = self.inner.upgradable_read();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = match inner.last_failure_at {
                    Some(at) => at.elapsed() > self.config.open_timeout,
                    // Open without a failure timestamp should not happen;
                    // permit the probe rather than wedging the circuit
                    None => true,
                };
                if !cooled_down {
                    return false;
                }

                let mut inner = RwLockUpgradableReadGuard::upgrade(inner);
                inner.state = CircuitState::HalfOpen;
                inner.failure_count = 0;
                inner.success_count = 0;
                info!(
                    component = %self.name,
                    success_threshold = self.config.success_threshold,
                    "🟡 Circuit breaker half-open (testing recovery)"
                );
                true
            }
        }
    }

    /// Record a successful call outcome
    pub fn record_success(&self) {
        let mut inner = self.inner.write();
        inner.total_successes += 1;

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
                inner.success_count = 0;
            }
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    info!(
                        component = %self.name,
                        total_successes = inner.total_successes,
                        "🟢 Circuit breaker closed (recovered)"
                    );
                }
            }
            CircuitState::Open => {
                // A success can land here when the call started before the
                // circuit tripped; it carries no state information
                debug!(component = %self.name, "Success recorded while circuit is open");
            }
        }
    }

    /// Record a failed call outcome
    pub fn record_failure(&self) {
        let mut inner = self.inner.write();
        inner.total_failures += 1;
        inner.last_failure_at = Some(Instant::now());

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    Self::trip_open(&self.name, &self.config, &mut inner);
                }
            }
            CircuitState::HalfOpen => {
                // Any failure during recovery testing re-opens immediately
                Self::trip_open(&self.name, &self.config, &mut inner);
            }
            CircuitState::Open => {
                debug!(component = %self.name, "Failure recorded while circuit is open");
            }
        }
    }

    fn trip_open(name: &str, config: &CircuitBreakerConfig, inner: &mut BreakerInner) {
        let tripped_after = inner.failure_count;
        inner.state = CircuitState::Open;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.times_opened += 1;
        error!(
            component = %name,
            consecutive_failures = tripped_after,
            failure_threshold = config.failure_threshold,
            timeout_seconds = config.open_timeout.as_secs(),
            "🔴 Circuit breaker opened (failing fast)"
        );
    }

    /// Force the circuit back to Closed with zeroed counters
    pub fn reset(&self) {
        warn!(component = %self.name, "Circuit breaker reset to closed");
        let mut inner = self.inner.write();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.last_failure_at = None;
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.read();
        CircuitBreakerMetrics {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            total_failures: inner.total_failures,
            total_successes: inner.total_successes,
            times_opened: inner.times_opened,
            seconds_since_last_failure: inner.last_failure_at.map(|at| at.elapsed().as_secs_f64()),
        }
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn quick_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 5,
            success_threshold: 3,
            open_timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_starts_closed_and_permits_calls() {
        let breaker = CircuitBreaker::new("test".to_string(), CircuitBreakerConfig::default());
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.calls_allowed());
    }

    #[test]
    fn test_opens_on_fifth_failure_not_fourth() {
        let breaker = CircuitBreaker::new("test".to_string(), quick_config());

        for _ in 0..4 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Closed);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.calls_allowed());
    }

    #[test]
    fn test_success_resets_closed_failure_streak() {
        let breaker = CircuitBreaker::new("test".to_string(), quick_config());

        for _ in 0..4 {
            breaker.record_failure();
        }
        breaker.record_success();
        for _ in 0..4 {
            breaker.record_failure();
        }
        // Streak was broken, so 4 more failures must not trip the circuit
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_after_timeout_then_recovery() {
        let breaker = CircuitBreaker::new("test".to_string(), quick_config());

        for _ in 0..5 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.calls_allowed());

        std::thread::sleep(Duration::from_millis(60));

        // The permit check itself performs the Open -> HalfOpen transition
        assert!(breaker.calls_allowed());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);

        let metrics = breaker.metrics();
        assert_eq!(metrics.failure_count, 0);
        assert_eq!(metrics.success_count, 0);
    }

    #[test]
    fn test_half_open_failure_reopens_immediately() {
        let breaker = CircuitBreaker::new("test".to_string(), quick_config());

        for _ in 0..5 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.calls_allowed());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.calls_allowed());
    }

    #[test]
    fn test_reset_forces_closed() {
        let breaker = CircuitBreaker::new("test".to_string(), quick_config());

        for _ in 0..5 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.calls_allowed());
    }

    #[test]
    fn test_metrics_snapshot() {
        let breaker = CircuitBreaker::new("test".to_string(), quick_config());

        breaker.record_success();
        breaker.record_failure();

        let metrics = breaker.metrics();
        assert_eq!(metrics.state, CircuitState::Closed);
        assert_eq!(metrics.total_successes, 1);
        assert_eq!(metrics.total_failures, 1);
        assert!(metrics.seconds_since_last_failure.is_some());
    }

    #[test]
    fn test_single_caller_wins_half_open_transition() {
        let breaker = Arc::new(CircuitBreaker::new("test".to_string(), quick_config()));

        for _ in 0..5 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(60));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let breaker = Arc::clone(&breaker);
            handles.push(std::thread::spawn(move || breaker.calls_allowed()));
        }
        for handle in handles {
            // Post-cooldown, every concurrent permit check must be allowed
            assert!(handle.join().unwrap());
        }
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }
}
