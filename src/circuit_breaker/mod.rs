pub mod breaker;
pub mod registry;
pub mod retry;
pub mod types;

pub use breaker::CircuitBreaker;
pub use registry::CircuitBreakerRegistry;
pub use retry::{transient_only, RetryPolicy};
pub use types::{CircuitBreakerConfig, CircuitBreakerStats, CircuitState, RetryConfig};
