//! Routing decision emitted by the provider router.

use serde::{Deserialize, Serialize};

use crate::Provider;

/// Outcome of routing a query to a primary provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// The chosen primary provider.
    pub provider: Provider,
    /// Why this provider was chosen (operator-facing).
    pub reasoning: String,
    /// True when the user named the provider in the query text. An explicit
    /// choice is never overridden by catalog availability or ranking layers.
    pub is_explicit_user_choice: bool,
    /// Informational warning when the decision looks suspicious; never a
    /// hard failure.
    pub validation_warning: Option<String>,
}

impl RoutingDecision {
    /// A non-explicit decision with the given reasoning.
    #[must_use]
    pub fn routed(provider: Provider, reasoning: impl Into<String>) -> Self {
        Self {
            provider,
            reasoning: reasoning.into(),
            is_explicit_user_choice: false,
            validation_warning: None,
        }
    }

    /// A decision locked in by an explicit user mention.
    #[must_use]
    pub fn explicit(provider: Provider, reasoning: impl Into<String>) -> Self {
        Self {
            provider,
            reasoning: reasoning.into(),
            is_explicit_user_choice: true,
            validation_warning: None,
        }
    }
}
