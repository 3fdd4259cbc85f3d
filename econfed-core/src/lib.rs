//! econfed-core
//!
//! Core traits and utilities shared across the econfed ecosystem.
//!
//! - `adapter`: the `ProviderAdapter` trait every upstream connector implements.
//! - `http`: the process-wide pooled HTTP client and URL secret masking.
//! - `retry`: status classification and the exponential-backoff retry engine.
//! - `timeseries`: period/date normalization and numeric cleanup helpers.
#![warn(missing_docs)]

pub mod adapter;
pub mod http;
pub mod retry;
pub mod timeseries;

pub use adapter::ProviderAdapter;
pub use econfed_types::{
    FedError, FetchRequest, Frequency, Point, Provider, Series, SeriesMeta,
};
pub use http::{HttpPool, mask_secrets};
pub use retry::{classify_status, retry_with_backoff};
pub use timeseries::{dedup_keep_max_magnitude, normalize_percent, parse_period};
