//! Provider health gate for bulk service calls.
//!
//! Circuits are keyed by canonical provider id, so `IRISDMC` and `IRIS`
//! share one. Only failures that say the provider is down trip a circuit:
//! a provider answering "no data" or rejecting a request is healthy.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::service::ServiceError;
use crate::source::ProviderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    /// One trial request is allowed through.
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive provider-down failures before the circuit opens.
    pub failure_threshold: u32,
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct ProviderCircuit {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl ProviderCircuit {
    const fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_in_flight: false,
        }
    }

    fn trip(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.trial_in_flight = false;
    }
}

/// Circuit breakers for every provider a backend talks to.
#[derive(Debug, Default)]
pub struct ProviderBreakers {
    config: CircuitBreakerConfig,
    circuits: Mutex<HashMap<ProviderId, ProviderCircuit>>,
}

impl ProviderBreakers {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    /// Lets a call to `provider` through, or explains why it is held back.
    pub fn admit(&self, provider: &ProviderId) -> Result<(), ServiceError> {
        let mut circuits = self
            .circuits
            .lock()
            .expect("provider circuits lock is not poisoned");
        let circuit = circuits
            .entry(provider.canonical())
            .or_insert_with(ProviderCircuit::closed);

        match circuit.state {
            CircuitState::Closed => Ok(()),
            CircuitState::HalfOpen if !circuit.trial_in_flight => {
                circuit.trial_in_flight = true;
                Ok(())
            }
            CircuitState::Open
                if circuit
                    .opened_at
                    .is_some_and(|opened_at| opened_at.elapsed() >= self.config.open_timeout) =>
            {
                circuit.state = CircuitState::HalfOpen;
                circuit.opened_at = None;
                circuit.trial_in_flight = true;
                Ok(())
            }
            CircuitState::HalfOpen | CircuitState::Open => Err(ServiceError::unavailable(format!(
                "circuit open for provider '{provider}'"
            ))),
        }
    }

    /// Records how a call to `provider` ended.
    pub fn record(&self, provider: &ProviderId, result: Result<(), &ServiceError>) {
        let provider_down = matches!(result, Err(error) if error.retryable());
        let mut circuits = self
            .circuits
            .lock()
            .expect("provider circuits lock is not poisoned");
        let circuit = circuits
            .entry(provider.canonical())
            .or_insert_with(ProviderCircuit::closed);

        if !provider_down {
            *circuit = ProviderCircuit::closed();
            return;
        }

        circuit.consecutive_failures = circuit.consecutive_failures.saturating_add(1);
        if circuit.state == CircuitState::HalfOpen
            || circuit.consecutive_failures >= self.config.failure_threshold
        {
            circuit.trip();
        }
    }

    pub fn state(&self, provider: &ProviderId) -> CircuitState {
        self.circuits
            .lock()
            .expect("provider circuits lock is not poisoned")
            .get(&provider.canonical())
            .map_or(CircuitState::Closed, |circuit| circuit.state)
    }

    /// Providers currently refused, sorted by id.
    pub fn open_providers(&self) -> Vec<ProviderId> {
        let circuits = self
            .circuits
            .lock()
            .expect("provider circuits lock is not poisoned");
        let mut open: Vec<ProviderId> = circuits
            .iter()
            .filter(|(_, circuit)| circuit.state != CircuitState::Closed)
            .map(|(provider, _)| provider.clone())
            .collect();
        open.sort_by(|left, right| left.as_str().cmp(right.as_str()));
        open
    }
}
