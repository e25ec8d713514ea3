use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Circuit is closed, calls flow normally
    Closed,
    /// Circuit is open, calls are rejected
    Open,
    /// Circuit is half-open, probing recovery
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "Closed"),
            CircuitState::Open => write!(f, "Open"),
            CircuitState::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Timeout for a single protected call in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Failure-rate percentage that trips the circuit from closed to open
    #[serde(default = "default_error_threshold_percentage")]
    pub error_threshold_percentage: f64,

    /// Cool-down in milliseconds before a probe call is allowed after opening
    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,

    /// Reserved for a sliding-window error rate. The current implementation
    /// evaluates the rate over all counts since the last full reset.
    #[serde(default = "default_monitoring_period_ms")]
    pub monitoring_period_ms: u64,

    /// Minimum number of recorded calls before the error rate is evaluated,
    /// so a single first failure does not read as a 100% rate
    #[serde(default = "default_min_request_volume")]
    pub min_request_volume: u32,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_error_threshold_percentage() -> f64 {
    50.0
}

fn default_reset_timeout_ms() -> u64 {
    30000
}

fn default_monitoring_period_ms() -> u64 {
    60000
}

fn default_min_request_volume() -> u32 {
    2
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            error_threshold_percentage: default_error_threshold_percentage(),
            reset_timeout_ms: default_reset_timeout_ms(),
            monitoring_period_ms: default_monitoring_period_ms(),
            min_request_volume: default_min_request_volume(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn monitoring_period(&self) -> Duration {
        Duration::from_millis(self.monitoring_period_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.error_threshold_percentage <= 0.0 || self.error_threshold_percentage > 100.0 {
            return Err(ConfigError::ThresholdOutOfRange(
                self.error_threshold_percentage,
            ));
        }
        if self.reset_timeout_ms == 0 {
            return Err(ConfigError::ZeroResetTimeout);
        }
        Ok(())
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff duration in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Whether to randomize backoff delays to avoid thundering herds
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    10000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Read-only snapshot of a circuit breaker's state, for monitoring
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerStats {
    /// Current circuit state
    pub state: CircuitState,
    /// Failures recorded since the last full reset
    pub failure_count: u32,
    /// Successes recorded since the last full reset
    pub success_count: u32,
    /// Time of the most recent failure, informational
    pub last_failure_time: Option<Instant>,
    /// Time before which calls are rejected while open
    pub next_attempt_time: Option<Instant>,
    /// Failure rate in percent over the recorded calls, 0 when none
    pub error_rate: f64,
}
