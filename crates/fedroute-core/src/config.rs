//! Client configuration: defaults, then environment, then explicit overrides.

use std::env;

use tracing::warn;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::distributor::{ExecutionMode, DEFAULT_MAX_WORKERS};
use crate::retry::RetryConfig;
use crate::routing_service::DEFAULT_ROUTING_URL;

pub const ENV_ROUTING_URL: &str = "FEDROUTE_ROUTING_URL";
pub const ENV_MAX_WORKERS: &str = "FEDROUTE_MAX_WORKERS";
pub const ENV_TIMEOUT_MS: &str = "FEDROUTE_TIMEOUT_MS";
pub const ENV_USER_AGENT: &str = "FEDROUTE_USER_AGENT";

const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Resolved settings for a [`FederatedClient`](crate::client::FederatedClient).
#[derive(Debug, Clone, PartialEq)]
pub struct FederatorConfig {
    pub routing_url: String,
    pub max_workers: usize,
    pub sequential: bool,
    /// Timeout for provider backend calls.
    pub timeout_ms: u64,
    pub user_agent: Option<String>,
    pub retry: RetryConfig,
    pub breaker: CircuitBreakerConfig,
}

impl Default for FederatorConfig {
    fn default() -> Self {
        FederatorConfigBuilder::new().build()
    }
}

impl FederatorConfig {
    pub fn builder() -> FederatorConfigBuilder {
        FederatorConfigBuilder::new()
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        if self.sequential {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Parallel {
                max_workers: self.max_workers,
            }
        }
    }
}

/// Builder for [`FederatorConfig`].
///
/// ```
/// use fedroute_core::config::FederatorConfigBuilder;
///
/// let config = FederatorConfigBuilder::new()
///     .with_env()
///     .with_max_workers(2)
///     .build();
/// assert_eq!(config.max_workers, 2);
/// ```
#[derive(Debug, Clone)]
pub struct FederatorConfigBuilder {
    routing_url: String,
    max_workers: usize,
    sequential: bool,
    timeout_ms: u64,
    user_agent: Option<String>,
    retry: RetryConfig,
    breaker: CircuitBreakerConfig,
}

impl Default for FederatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FederatorConfigBuilder {
    pub fn new() -> Self {
        Self {
            routing_url: String::from(DEFAULT_ROUTING_URL),
            max_workers: DEFAULT_MAX_WORKERS,
            sequential: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: None,
            retry: RetryConfig::default(),
            breaker: CircuitBreakerConfig::default(),
        }
    }

    /// Defaults overlaid with the `FEDROUTE_*` environment variables.
    pub fn from_env() -> Self {
        Self::new().with_env()
    }

    /// Reads `FEDROUTE_*` variables from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`; unparsable values are ignored.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_ROUTING_URL).filter(|url| !url.trim().is_empty()) {
            self.routing_url = url.trim().to_owned();
        }
        if let Some(workers) = parse_env(&lookup, ENV_MAX_WORKERS) {
            self.max_workers = workers;
        }
        if let Some(timeout_ms) = parse_env(&lookup, ENV_TIMEOUT_MS) {
            self.timeout_ms = timeout_ms;
        }
        if let Some(user_agent) = lookup(ENV_USER_AGENT).filter(|agent| !agent.trim().is_empty()) {
            self.user_agent = Some(user_agent);
        }
        self
    }

    pub fn with_routing_url(mut self, url: impl Into<String>) -> Self {
        self.routing_url = url.into();
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn build(self) -> FederatorConfig {
        FederatorConfig {
            routing_url: self.routing_url,
            max_workers: self.max_workers.max(1),
            sequential: self.sequential,
            timeout_ms: self.timeout_ms,
            user_agent: self.user_agent,
            retry: self.retry,
            breaker: self.breaker,
        }
    }
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = key, value = %raw, "ignoring unparsable environment value");
            None
        }
    }
}
