//! The provider adapter contract.

use async_trait::async_trait;

use econfed_types::{FedError, FetchRequest, Frequency, Provider, Series};

/// Contract implemented by every upstream provider adapter.
///
/// Adapters are stateless aside from their identifier maps and optional
/// collaborators injected at construction; they may be called concurrently
/// for distinct parameters. An adapter owns all provider-specific concerns:
/// identifier mapping, wire decoding, best-series selection, and converting
/// upstream failures into the shared error taxonomy.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The provider tag this adapter serves.
    fn provider(&self) -> Provider;

    /// Stable name used in logs and metadata (defaults to the tag name).
    fn name(&self) -> &'static str {
        self.provider().as_str()
    }

    /// Fetch canonical series for a normalized request.
    ///
    /// Returns one series per (indicator, country) pair the request expands
    /// to. Empty upstream results, invalid identifiers, and semantic 4xx
    /// responses surface as [`FedError::DataNotAvailable`]; transient
    /// transport failures surface as [`FedError::Transport`] or
    /// [`FedError::RateLimited`] so the orchestrator's retry policy applies.
    async fn fetch(&self, req: &FetchRequest) -> Result<Vec<Series>, FedError>;

    /// Default history window, in years, applied when the caller gives no
    /// explicit range. Zero means "latest observation only".
    fn default_range_years(&self) -> u32 {
        10
    }

    /// Some provider dataflows support only a single cadence; when this
    /// returns `Some`, the orchestrator's requested frequency is ignored
    /// for the given series identifier.
    fn forced_frequency(&self, series_id: &str) -> Option<Frequency> {
        let _ = series_id;
        None
    }
}
