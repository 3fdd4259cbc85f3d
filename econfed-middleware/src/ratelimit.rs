//! Per-provider pacing: token bucket plus circuit breaker.
//!
//! The gate sits between the orchestrator and every adapter call. A token
//! bucket paces request rate per provider; a breaker tracks consecutive
//! throttle/server failures and, once open, short-circuits calls without
//! touching the network until the cool-off elapses, after which a single
//! half-open probe is allowed.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use econfed_types::{FedError, Provider, RateLimitConfig};

/// Breaker state for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls short-circuit until the reset deadline.
    Open,
    /// One probe call is in flight; its outcome decides the next state.
    HalfOpen,
}

struct GateState {
    tokens: f64,
    last_refill: Instant,
    consecutive_failures: u32,
    circuit: CircuitState,
    open_until: Option<Instant>,
}

impl GateState {
    fn new(cfg: &RateLimitConfig) -> Self {
        Self {
            tokens: f64::from(cfg.burst),
            last_refill: Instant::now(),
            consecutive_failures: 0,
            circuit: CircuitState::Closed,
            open_until: None,
        }
    }
}

/// The per-provider gate. All state is in-process and ephemeral.
pub struct ProviderGate {
    configs: HashMap<Provider, RateLimitConfig>,
    states: Mutex<HashMap<Provider, GateState>>,
}

impl Default for ProviderGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderGate {
    /// Gate with default pacing, and the conservative bucket for OECD.
    #[must_use]
    pub fn new() -> Self {
        let mut configs = HashMap::new();
        for provider in Provider::ALL {
            configs.insert(provider, RateLimitConfig::default());
        }
        configs.insert(Provider::Oecd, RateLimitConfig::conservative());
        Self {
            configs,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Gate with explicit per-provider configs (missing providers get the
    /// default).
    #[must_use]
    pub fn with_configs(overrides: HashMap<Provider, RateLimitConfig>) -> Self {
        let mut gate = Self::new();
        for (provider, cfg) in overrides {
            gate.configs.insert(provider, cfg);
        }
        gate
    }

    fn config(&self, provider: Provider) -> RateLimitConfig {
        self.configs
            .get(&provider)
            .copied()
            .unwrap_or_default()
    }

    /// Admit or reject a call. On rejection the error carries how long the
    /// caller should wait.
    pub fn check(&self, provider: Provider) -> Result<(), FedError> {
        let cfg = self.config(provider);
        let mut states = self.states.lock().expect("gate mutex poisoned");
        let state = states
            .entry(provider)
            .or_insert_with(|| GateState::new(&cfg));
        let now = Instant::now();

        match state.circuit {
            CircuitState::Open => {
                let until = state.open_until.unwrap_or(now);
                if now < until {
                    let reset_in_ms = until
                        .saturating_duration_since(now)
                        .as_millis()
                        .try_into()
                        .unwrap_or(u64::MAX);
                    return Err(FedError::CircuitOpen {
                        provider,
                        reset_in_ms,
                    });
                }
                // Cool-off elapsed: admit exactly one probe.
                state.circuit = CircuitState::HalfOpen;
                tracing::info!(
                    target: "econfed::gate",
                    %provider,
                    "circuit half-open, admitting probe"
                );
                return Ok(());
            }
            CircuitState::HalfOpen => {
                // A probe is already in flight.
                return Err(FedError::CircuitOpen {
                    provider,
                    reset_in_ms: cfg.breaker_cooloff.as_millis().try_into().unwrap_or(u64::MAX),
                });
            }
            CircuitState::Closed => {}
        }

        // Refill the bucket.
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens =
            (state.tokens + elapsed * cfg.refill_per_sec).min(f64::from(cfg.burst));
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - state.tokens;
            let wait = Duration::from_secs_f64(deficit / cfg.refill_per_sec.max(f64::MIN_POSITIVE));
            Err(FedError::RateLimited {
                retry_after_ms: wait.as_millis().try_into().unwrap_or(u64::MAX),
            })
        }
    }

    /// Record a successful call: failures reset, an open/half-open circuit
    /// closes.
    pub fn record_success(&self, provider: Provider) {
        let mut states = self.states.lock().expect("gate mutex poisoned");
        if let Some(state) = states.get_mut(&provider) {
            state.consecutive_failures = 0;
            if state.circuit != CircuitState::Closed {
                tracing::info!(target: "econfed::gate", %provider, "circuit closed");
            }
            state.circuit = CircuitState::Closed;
            state.open_until = None;
        }
    }

    /// Record a failed call. Only throttle-class failures (429, 5xx) count
    /// toward the breaker; reaching the threshold opens it for the
    /// cool-off. A failed half-open probe re-opens immediately.
    pub fn record_failure(&self, provider: Provider, throttle: bool) {
        let cfg = self.config(provider);
        let mut states = self.states.lock().expect("gate mutex poisoned");
        let state = states
            .entry(provider)
            .or_insert_with(|| GateState::new(&cfg));

        if state.circuit == CircuitState::HalfOpen {
            state.circuit = CircuitState::Open;
            state.open_until = Some(Instant::now() + cfg.breaker_cooloff);
            tracing::warn!(target: "econfed::gate", %provider, "probe failed, circuit re-opened");
            return;
        }

        if !throttle {
            return;
        }
        state.consecutive_failures += 1;
        if state.consecutive_failures >= cfg.breaker_threshold {
            state.circuit = CircuitState::Open;
            state.open_until = Some(Instant::now() + cfg.breaker_cooloff);
            tracing::warn!(
                target: "econfed::gate",
                %provider,
                failures = state.consecutive_failures,
                cooloff_ms = cfg.breaker_cooloff.as_millis() as u64,
                "circuit opened"
            );
        }
    }

    /// Current breaker state for a provider.
    #[must_use]
    pub fn circuit_state(&self, provider: Provider) -> CircuitState {
        let states = self.states.lock().expect("gate mutex poisoned");
        states
            .get(&provider)
            .map_or(CircuitState::Closed, |s| s.circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tight_gate(burst: u32, threshold: u32, cooloff_ms: u64) -> ProviderGate {
        let mut overrides = HashMap::new();
        overrides.insert(
            Provider::Oecd,
            RateLimitConfig {
                burst,
                refill_per_sec: 0.0,
                breaker_threshold: threshold,
                breaker_cooloff: Duration::from_millis(cooloff_ms),
            },
        );
        ProviderGate::with_configs(overrides)
    }

    #[test]
    fn bucket_exhaustion_rate_limits() {
        let gate = tight_gate(2, 100, 1000);
        assert!(gate.check(Provider::Oecd).is_ok());
        assert!(gate.check(Provider::Oecd).is_ok());
        assert!(matches!(
            gate.check(Provider::Oecd),
            Err(FedError::RateLimited { .. })
        ));
        // Other providers are unaffected.
        assert!(gate.check(Provider::Fred).is_ok());
    }

    #[test]
    fn breaker_opens_after_consecutive_throttle_failures() {
        let gate = tight_gate(100, 3, 60_000);
        for _ in 0..3 {
            gate.check(Provider::Oecd).unwrap();
            gate.record_failure(Provider::Oecd, true);
        }
        assert_eq!(gate.circuit_state(Provider::Oecd), CircuitState::Open);
        assert!(matches!(
            gate.check(Provider::Oecd),
            Err(FedError::CircuitOpen { .. })
        ));
    }

    #[test]
    fn non_throttle_failures_do_not_trip_the_breaker() {
        let gate = tight_gate(100, 2, 60_000);
        for _ in 0..5 {
            gate.check(Provider::Oecd).unwrap();
            gate.record_failure(Provider::Oecd, false);
        }
        assert_eq!(gate.circuit_state(Provider::Oecd), CircuitState::Closed);
    }

    #[test]
    fn half_open_probe_closes_on_success() {
        let gate = tight_gate(100, 1, 0);
        gate.check(Provider::Oecd).unwrap();
        gate.record_failure(Provider::Oecd, true);
        assert_eq!(gate.circuit_state(Provider::Oecd), CircuitState::Open);
        // Cool-off of zero: next check admits the probe.
        assert!(gate.check(Provider::Oecd).is_ok());
        assert_eq!(gate.circuit_state(Provider::Oecd), CircuitState::HalfOpen);
        gate.record_success(Provider::Oecd);
        assert_eq!(gate.circuit_state(Provider::Oecd), CircuitState::Closed);
    }

    #[test]
    fn failed_probe_reopens() {
        let gate = tight_gate(100, 1, 0);
        gate.check(Provider::Oecd).unwrap();
        gate.record_failure(Provider::Oecd, true);
        assert!(gate.check(Provider::Oecd).is_ok()); // probe admitted
        gate.record_failure(Provider::Oecd, true);
        assert_eq!(gate.circuit_state(Provider::Oecd), CircuitState::Open);
    }

    #[test]
    fn success_resets_the_failure_streak() {
        let gate = tight_gate(100, 3, 60_000);
        gate.check(Provider::Oecd).unwrap();
        gate.record_failure(Provider::Oecd, true);
        gate.record_failure(Provider::Oecd, true);
        gate.record_success(Provider::Oecd);
        gate.record_failure(Provider::Oecd, true);
        assert_eq!(gate.circuit_state(Provider::Oecd), CircuitState::Closed);
    }
}
