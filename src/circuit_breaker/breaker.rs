use super::types::{CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
use crate::error::{CircuitBreakerError, ConfigError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Consecutive successes required in half-open state to close the circuit.
const HALF_OPEN_SUCCESS_THRESHOLD: u32 = 3;

/// Circuit breaker guarding a single remote dependency.
///
/// Wraps an arbitrary asynchronous unit of work, short-circuiting calls once
/// the failure rate crosses the configured threshold and probing recovery
/// after a cool-down. The breaker never swallows upstream errors; it only
/// changes internal state and may reject *future* calls.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Dependency identifier, used in log events
    name: String,
    /// Configuration
    config: CircuitBreakerConfig,
    /// Mutable state, shared across concurrent executes
    state: Arc<RwLock<State>>,
}

#[derive(Debug)]
struct State {
    /// Current circuit state
    circuit_state: CircuitState,
    /// Failures recorded since the last full reset
    failure_count: u32,
    /// Successes recorded since the last full reset
    success_count: u32,
    /// Time of the most recent failure
    last_failure_time: Option<Instant>,
    /// Time before which calls are rejected while open
    next_attempt_time: Option<Instant>,
}

impl State {
    fn fresh() -> Self {
        Self {
            circuit_state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
            next_attempt_time: None,
        }
    }

    fn error_rate(&self) -> f64 {
        let total = self.failure_count + self.success_count;
        if total == 0 {
            0.0
        } else {
            f64::from(self.failure_count) / f64::from(total) * 100.0
        }
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker, validating the configuration.
    pub fn new(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(name.into(), config))
    }

    pub(super) fn from_parts(name: String, config: CircuitBreakerConfig) -> Self {
        info!(
            name = %name,
            timeout_ms = config.timeout_ms,
            error_threshold_percentage = config.error_threshold_percentage,
            reset_timeout_ms = config.reset_timeout_ms,
            "Creating circuit breaker"
        );

        Self {
            name,
            config,
            state: Arc::new(RwLock::new(State::fresh())),
        }
    }

    /// Dependency name this breaker guards.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration this breaker was constructed with.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Execute a unit of work through the breaker.
    ///
    /// While the circuit is open the work is never invoked and the call fails
    /// immediately with [`CircuitBreakerError::Open`] carrying the remaining
    /// cool-down. Otherwise the work races the configured per-call timeout;
    /// if the timer wins, the work future is dropped and the call fails with
    /// [`CircuitBreakerError::Timeout`]. Upstream errors pass through as
    /// [`CircuitBreakerError::Inner`]. Every failure, timeouts included,
    /// counts identically toward the threshold and half-open logic.
    pub async fn execute<F, Fut, T, E>(&self, unit_of_work: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.before_call().await?;

        let timeout = self.config.timeout();
        match tokio::time::timeout(timeout, unit_of_work()).await {
            Ok(Ok(value)) => {
                self.on_success().await;
                Ok(value)
            }
            Ok(Err(err)) => {
                debug!(name = %self.name, error = %err, "Protected call failed");
                self.on_failure().await;
                Err(CircuitBreakerError::Inner(err))
            }
            Err(_) => {
                warn!(
                    name = %self.name,
                    timeout_ms = self.config.timeout_ms,
                    "Protected call timed out"
                );
                self.on_failure().await;
                Err(CircuitBreakerError::Timeout { elapsed: timeout })
            }
        }
    }

    /// Force the breaker back to closed, zeroing all counters and timestamps.
    ///
    /// Bypasses the normal probe cycle; intended for operational recovery
    /// after the dependency has been confirmed healthy. Idempotent.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        info!(name = %self.name, from = %state.circuit_state, "Circuit breaker manually reset");
        *state = State::fresh();
    }

    /// Current circuit state.
    pub async fn state(&self) -> CircuitState {
        self.state.read().await.circuit_state
    }

    /// Read-only snapshot for monitoring. Never mutates state.
    pub async fn stats(&self) -> CircuitBreakerStats {
        let state = self.state.read().await;
        CircuitBreakerStats {
            state: state.circuit_state,
            failure_count: state.failure_count,
            success_count: state.success_count,
            last_failure_time: state.last_failure_time,
            next_attempt_time: state.next_attempt_time,
            error_rate: state.error_rate(),
        }
    }

    /// Admission check before invoking the unit of work. Performs the lazy
    /// open-to-half-open transition once the cool-down has elapsed.
    async fn before_call<E>(&self) -> Result<(), CircuitBreakerError<E>> {
        let mut state = self.state.write().await;

        if state.circuit_state != CircuitState::Open {
            return Ok(());
        }

        let now = Instant::now();
        if let Some(next_attempt) = state.next_attempt_time {
            if now < next_attempt {
                let retry_after = next_attempt.duration_since(now);
                debug!(
                    name = %self.name,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Circuit open, rejecting call"
                );
                return Err(CircuitBreakerError::Open {
                    name: self.name.clone(),
                    retry_after,
                });
            }
        }

        self.transition_to_half_open(&mut state);
        Ok(())
    }

    async fn on_success(&self) {
        let mut state = self.state.write().await;

        match state.circuit_state {
            CircuitState::Closed => {
                state.success_count += 1;
                // Decay rather than reset, so isolated failures don't
                // accumulate indefinitely under healthy operation
                state.failure_count = state.failure_count.saturating_sub(1);
                debug!(
                    name = %self.name,
                    failure_count = state.failure_count,
                    success_count = state.success_count,
                    "Call succeeded"
                );
            }
            CircuitState::HalfOpen => {
                state.success_count += 1;
                debug!(
                    name = %self.name,
                    success_count = state.success_count,
                    threshold = HALF_OPEN_SUCCESS_THRESHOLD,
                    "Probe call succeeded"
                );
                if state.success_count >= HALF_OPEN_SUCCESS_THRESHOLD {
                    self.transition_to_closed(&mut state);
                }
            }
            CircuitState::Open => {
                warn!(name = %self.name, "Recording success in open state");
            }
        }
    }

    async fn on_failure(&self) {
        let mut state = self.state.write().await;
        state.last_failure_time = Some(Instant::now());

        match state.circuit_state {
            CircuitState::Closed => {
                state.failure_count += 1;
                let total = state.failure_count + state.success_count;
                debug!(
                    name = %self.name,
                    failure_count = state.failure_count,
                    error_rate = state.error_rate(),
                    "Call failed in closed state"
                );
                if total >= self.config.min_request_volume
                    && state.error_rate() >= self.config.error_threshold_percentage
                {
                    self.transition_to_open(&mut state);
                }
            }
            CircuitState::HalfOpen => {
                state.failure_count += 1;
                state.success_count = 0;
                warn!(name = %self.name, "Probe call failed, reopening circuit");
                self.transition_to_open(&mut state);
            }
            CircuitState::Open => {
                debug!(name = %self.name, "Recording failure in open state");
            }
        }
    }

    fn transition_to_open(&self, state: &mut State) {
        let next_attempt = Instant::now() + self.config.reset_timeout();
        info!(
            name = %self.name,
            failure_count = state.failure_count,
            error_rate = state.error_rate(),
            reset_timeout_ms = self.config.reset_timeout_ms,
            "Circuit breaker opening"
        );

        state.circuit_state = CircuitState::Open;
        state.next_attempt_time = Some(next_attempt);
    }

    fn transition_to_half_open(&self, state: &mut State) {
        info!(name = %self.name, "Circuit breaker transitioning to half-open");

        state.circuit_state = CircuitState::HalfOpen;
        state.failure_count = 0;
        state.success_count = 0;
        state.next_attempt_time = None;
    }

    fn transition_to_closed(&self, state: &mut State) {
        info!(
            name = %self.name,
            success_count = state.success_count,
            "Circuit breaker closing"
        );

        state.circuit_state = CircuitState::Closed;
        state.failure_count = 0;
        state.success_count = 0;
        state.next_attempt_time = None;
    }
}
