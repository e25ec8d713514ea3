//! Circuit breaker and retry primitives for protecting calls to remote
//! dependencies.
//!
//! A [`CircuitBreaker`] guards a single remote dependency: it tracks the
//! failure rate of the calls it executes, short-circuits once the rate
//! crosses a threshold, and probes recovery after a cool-down. A
//! [`RetryPolicy`] wraps calls in bounded re-attempts with exponential
//! backoff; the two compose by plain function wrapping. A
//! [`CircuitBreakerRegistry`] hands out breakers keyed by dependency name.
//!
//! ```
//! use breakwater::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let breaker = CircuitBreaker::new("billing-api", CircuitBreakerConfig::default())?;
//!
//! let value = breaker
//!     .execute(|| async { Ok::<_, std::io::Error>(42) })
//!     .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```
//!
//! State transitions, successes, failures, and rejections are emitted as
//! structured [`tracing`] events; installing a subscriber is the host
//! application's job.

pub mod circuit_breaker;
pub mod error;

pub use circuit_breaker::{
    transient_only, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry,
    CircuitBreakerStats, CircuitState, RetryConfig, RetryPolicy,
};
pub use error::{CircuitBreakerError, ConfigError};
