//! econfed-middleware
//!
//! Cross-cutting layers the fetch orchestrator threads provider calls
//! through: the two-tier result cache (in-process + Redis) and the
//! per-provider pacing gate (token bucket + circuit breaker).
#![warn(missing_docs)]

pub mod cache;
pub mod ratelimit;

pub use cache::{CacheKey, TieredCache};
pub use ratelimit::{CircuitState, ProviderGate};
