use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Provider;

/// Unified error type for the econfed workspace.
///
/// This wraps the full federation taxonomy: terminal no-data conditions,
/// retryable transport failures, rate limiting and circuit state, caller
/// input problems, adapter decode failures, and an aggregate for
/// multi-provider fallback attempts.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq)]
#[non_exhaustive]
pub enum FedError {
    /// The resource does not exist, is empty, or the query is invalid in a
    /// non-retryable way. Carries the user-facing message and optional
    /// structured suggestions.
    #[error("data not available from {provider}: {message}")]
    DataNotAvailable {
        /// Provider that was asked.
        provider: Provider,
        /// User-facing explanation.
        message: String,
        /// Suggestion lines for the user (alternative providers, code hints).
        suggestions: Vec<String>,
    },

    /// Network, timeout, or 5xx failure. Retryable.
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream returned 429 or the local pacing gate refused the call.
    /// Retryable with backoff.
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited {
        /// Milliseconds to wait before the next attempt, when known.
        retry_after_ms: u64,
    },

    /// The provider's circuit breaker is open; calls short-circuit until
    /// the cool-off elapses.
    #[error("circuit open for {provider}: reset in {reset_in_ms}ms")]
    CircuitOpen {
        /// Provider whose breaker tripped.
        provider: Provider,
        /// Milliseconds until a probe request will be allowed.
        reset_in_ms: u64,
    },

    /// Caller-side validation failure (unknown country, incompatible
    /// parameters). Surfaced immediately with clarification questions.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the request.
        message: String,
        /// Clarification questions for the caller.
        clarifications: Vec<String>,
    },

    /// The adapter could not decode the provider's wire format.
    #[error("{provider} decode failure: {message}")]
    Decode {
        /// Provider whose payload failed to decode.
        provider: Provider,
        /// Diagnostic message (operator-facing).
        message: String,
    },

    /// An individual provider call failed with a tagged message.
    #[error("{provider} failed: {msg}")]
    Provider {
        /// Provider that failed.
        provider: Provider,
        /// Human-readable error message.
        msg: String,
    },

    /// An individual provider call exceeded the configured timeout.
    #[error("provider timed out: {provider}")]
    ProviderTimeout {
        /// Provider that timed out.
        provider: Provider,
    },

    /// The overall request exceeded the configured deadline.
    #[error("request timed out")]
    RequestTimeout,

    /// All attempted providers failed; contains the individual failures.
    #[error("all providers failed: {0:?}")]
    AllProvidersFailed(Vec<FedError>),

    /// Unknown/opaque error caught at the orchestrator boundary.
    #[error("unknown error: {0}")]
    Other(String),
}

impl FedError {
    /// Helper: build a `DataNotAvailable` without suggestions.
    pub fn not_available(provider: Provider, message: impl Into<String>) -> Self {
        Self::DataNotAvailable {
            provider,
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// Helper: build a `DataNotAvailable` with suggestion lines.
    pub fn not_available_with(
        provider: Provider,
        message: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self::DataNotAvailable {
            provider,
            message: message.into(),
            suggestions,
        }
    }

    /// Helper: build a tagged provider error.
    pub fn provider(provider: Provider, msg: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            msg: msg.into(),
        }
    }

    /// Helper: build a decode error.
    pub fn decode(provider: Provider, message: impl Into<String>) -> Self {
        Self::Decode {
            provider,
            message: message.into(),
        }
    }

    /// Helper: build an `InvalidInput` without clarifications.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            clarifications: Vec::new(),
        }
    }

    /// Whether a retry with backoff may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RateLimited { .. })
    }

    /// Whether the error is terminal for this request shape (safe to
    /// negative-cache and to trigger the fallback chain).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::DataNotAvailable { .. } | Self::InvalidInput { .. } | Self::Decode { .. }
        )
    }

    /// Flatten nested `AllProvidersFailed` structures into a plain vector.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::AllProvidersFailed(list) => list.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_unwraps_nested_aggregates() {
        let inner = FedError::AllProvidersFailed(vec![
            FedError::Transport("reset".into()),
            FedError::not_available(Provider::Bis, "no data"),
        ]);
        let outer = FedError::AllProvidersFailed(vec![inner, FedError::RequestTimeout]);
        let flat = outer.flatten();
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn retryability_classification() {
        assert!(FedError::Transport("io".into()).is_retryable());
        assert!(FedError::RateLimited { retry_after_ms: 5000 }.is_retryable());
        assert!(!FedError::not_available(Provider::Fred, "gone").is_retryable());
        assert!(FedError::not_available(Provider::Fred, "gone").is_permanent());
        assert!(!FedError::Transport("io".into()).is_permanent());
    }
}
