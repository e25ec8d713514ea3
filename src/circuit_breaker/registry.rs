use super::breaker::CircuitBreaker;
use super::types::{CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
use crate::error::ConfigError;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of circuit breakers keyed by dependency name.
///
/// Owned by the application's dependency-injection root and constructed once
/// at startup, in place of hidden module-level singletons. Breakers are
/// created lazily on first use and live for the registry's lifetime.
#[derive(Debug, Clone)]
pub struct CircuitBreakerRegistry {
    /// Breakers per dependency
    breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,
    /// Configuration applied to every breaker created by this registry
    config: CircuitBreakerConfig,
}

impl CircuitBreakerRegistry {
    /// Create a registry. The configuration is validated once here, so
    /// [`CircuitBreakerRegistry::breaker`] itself is infallible.
    pub fn new(config: CircuitBreakerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            breakers: Arc::new(DashMap::new()),
            config,
        })
    }

    /// Get or create the breaker for a dependency.
    pub fn breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(name, "Creating circuit breaker for new dependency");
                Arc::new(CircuitBreaker::from_parts(
                    name.to_string(),
                    self.config.clone(),
                ))
            })
            .clone()
    }

    /// Look up an existing breaker without creating one. The guard is not
    /// held across awaits.
    fn lookup(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| entry.value().clone())
    }

    /// State of a dependency's breaker, if one exists.
    pub async fn state(&self, name: &str) -> Option<CircuitState> {
        match self.lookup(name) {
            Some(breaker) => Some(breaker.state().await),
            None => None,
        }
    }

    /// Monitoring snapshot for a dependency, if a breaker exists.
    pub async fn stats(&self, name: &str) -> Option<CircuitBreakerStats> {
        match self.lookup(name) {
            Some(breaker) => Some(breaker.stats().await),
            None => None,
        }
    }

    /// Snapshots for every registered dependency.
    pub async fn all_stats(&self) -> Vec<(String, CircuitBreakerStats)> {
        let breakers: Vec<(String, Arc<CircuitBreaker>)> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut results = Vec::new();
        for (name, breaker) in breakers {
            results.push((name, breaker.stats().await));
        }
        results
    }

    /// Names of all registered dependencies.
    pub fn names(&self) -> Vec<String> {
        self.breakers.iter().map(|e| e.key().clone()).collect()
    }

    /// Manually reset a dependency's breaker. Returns whether one existed.
    pub async fn reset(&self, name: &str) -> bool {
        match self.lookup(name) {
            Some(breaker) => {
                breaker.reset().await;
                true
            }
            None => false,
        }
    }

    /// Manually reset every registered breaker.
    pub async fn reset_all(&self) {
        let breakers: Vec<Arc<CircuitBreaker>> = self
            .breakers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for breaker in breakers {
            breaker.reset().await;
        }
    }
}
