use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("timeout_ms must be greater than 0")]
    ZeroTimeout,

    #[error("error_threshold_percentage must be in (0, 100], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("reset_timeout_ms must be greater than 0")]
    ZeroResetTimeout,
}

/// Errors surfaced by a circuit breaker around a protected call.
///
/// The two breaker-native kinds (`Open`, `Timeout`) are distinguishable from
/// whatever the protected call itself failed with (`Inner`), so a composing
/// retry layer can tell "dependency is down, don't retry yet" apart from
/// "transient error, retry now". Upstream errors are carried unmodified.
#[derive(Error, Debug)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the protected call was never invoked.
    #[error("circuit '{name}' is open, retry after {retry_after:?}")]
    Open {
        /// Name of the breaker that rejected the call
        name: String,
        /// Remaining cool-down before the next probe is allowed
        retry_after: Duration,
    },

    /// The breaker's timer won the race against the protected call.
    #[error("call timed out after {elapsed:?}")]
    Timeout {
        /// The configured per-call timeout that elapsed
        elapsed: Duration,
    },

    /// The protected call failed with its own error, passed through unmodified.
    #[error("{0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Whether this is an open-circuit rejection.
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerError::Open { .. })
    }

    /// Whether the breaker's per-call timeout fired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CircuitBreakerError::Timeout { .. })
    }

    /// Remaining cool-down for an open-circuit rejection, `None` otherwise.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CircuitBreakerError::Open { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// Extract the upstream error, if this wraps one.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_error_display() {
        let err: CircuitBreakerError<String> = CircuitBreakerError::Open {
            name: "embeddings".to_string(),
            retry_after: Duration::from_secs(30),
        };
        assert_eq!(
            err.to_string(),
            "circuit 'embeddings' is open, retry after 30s"
        );
        assert!(err.is_open());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_timeout_error_display() {
        let err: CircuitBreakerError<String> = CircuitBreakerError::Timeout {
            elapsed: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "call timed out after 5s");
        assert!(err.is_timeout());
        assert!(!err.is_open());
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_inner_error_passthrough() {
        let err = CircuitBreakerError::Inner("connection refused".to_string());
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(err.into_inner(), Some("connection refused".to_string()));
    }

    #[test]
    fn test_breaker_native_errors_have_no_inner() {
        let err: CircuitBreakerError<String> = CircuitBreakerError::Timeout {
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(err.into_inner(), None);
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::ThresholdOutOfRange(120.0).to_string(),
            "error_threshold_percentage must be in (0, 100], got 120"
        );
        assert_eq!(
            ConfigError::ZeroTimeout.to_string(),
            "timeout_ms must be greater than 0"
        );
    }
}
