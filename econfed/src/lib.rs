//! econfed
//!
//! The federation orchestrator: routes a parsed query intent to a primary
//! provider, executes the fetch with caching, pacing, retries and fallback
//! chains, validates the result, and returns canonical series.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use econfed::{EconFed, ParsedIntent};
//! use econfed_providers::{FredAdapter, WorldBankAdapter};
//!
//! let fed = EconFed::builder()
//!     .with_adapter(Arc::new(FredAdapter::new(std::env::var("FRED_API_KEY").ok())))
//!     .with_adapter(Arc::new(WorldBankAdapter::new()))
//!     .build()?;
//!
//! let intent = ParsedIntent::for_indicator("GDP growth", "GDP growth for G7 countries");
//! let series = fed.execute(&intent).await?;
//! ```
#![warn(missing_docs)]

mod core;
mod fetch;
mod params;
mod relevance;
mod router;
mod suggest;
mod validator;

pub use core::{EconFed, EconFedBuilder, HybridRanker};
pub use econfed_types::{
    FedConfig, FedError, FetchRequest, Frequency, ParsedIntent, Provider, RoutingDecision, Series,
};
pub use router::ProviderRouter;
pub use validator::{DataValidator, ValidationIssue, ValidationResult, ValidationSeverity};
