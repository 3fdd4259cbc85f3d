//! Orchestrator construction and shared state.

use std::collections::HashMap;
use std::sync::Arc;

use econfed_catalog::{Catalog, IndicatorIndex, IndicatorResolver};
use econfed_core::adapter::ProviderAdapter;
use econfed_middleware::{ProviderGate, TieredCache};
use econfed_types::{CacheConfig, FedConfig, FedError, Provider};

/// Optional ranking hook over routing candidates (the feature-flagged
/// LLM-assisted layer). The core never requires it, and an explicit user
/// provider choice always bypasses it.
pub trait HybridRanker: Send + Sync {
    /// Reorder or replace the routed provider; `None` keeps the
    /// deterministic decision.
    fn rank(&self, query: &str, indicators: &[String], routed: Provider) -> Option<Provider>;
}

/// Orchestrator that federates queries across registered provider adapters.
pub struct EconFed {
    pub(crate) adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) resolver: Arc<IndicatorResolver>,
    pub(crate) cache: Arc<TieredCache>,
    pub(crate) gate: Arc<ProviderGate>,
    pub(crate) ranker: Option<Arc<dyn HybridRanker>>,
    pub(crate) cfg: FedConfig,
}

/// Builder for [`EconFed`].
pub struct EconFedBuilder {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    catalog: Option<Catalog>,
    cache: Option<TieredCache>,
    cache_cfg: CacheConfig,
    gate: Option<ProviderGate>,
    ranker: Option<Arc<dyn HybridRanker>>,
    cfg: FedConfig,
}

impl Default for EconFedBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EconFedBuilder {
    /// Start an empty builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
            catalog: None,
            cache: None,
            cache_cfg: CacheConfig::default(),
            gate: None,
            ranker: None,
            cfg: FedConfig::default(),
        }
    }

    /// Register a provider adapter. Registering the same provider twice
    /// keeps the later registration.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Replace the built-in concept catalog (e.g. one loaded from a
    /// directory). Swapping catalogs at runtime means building a new
    /// orchestrator; the catalog itself is immutable.
    #[must_use]
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Override the orchestrator configuration.
    #[must_use]
    pub fn config(mut self, cfg: FedConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Cache configuration (TTLs, capacity, Redis URL). Ignored when an
    /// explicit cache is injected.
    #[must_use]
    pub fn cache_config(mut self, cfg: CacheConfig) -> Self {
        self.cache_cfg = cfg;
        self
    }

    /// Inject a pre-built cache (tests).
    #[must_use]
    pub fn cache(mut self, cache: TieredCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Inject a pre-built pacing gate (tests).
    #[must_use]
    pub fn gate(mut self, gate: ProviderGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Install the optional ranking hook.
    #[must_use]
    pub fn hybrid_ranker(mut self, ranker: Arc<dyn HybridRanker>) -> Self {
        self.ranker = Some(ranker);
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    /// `InvalidInput` when no adapters have been registered.
    pub fn build(self) -> Result<EconFed, FedError> {
        if self.adapters.is_empty() {
            return Err(FedError::invalid_input(
                "no adapters registered; add at least one via with_adapter(...)",
            ));
        }
        let mut adapters = HashMap::new();
        for adapter in self.adapters {
            adapters.insert(adapter.provider(), adapter);
        }
        let catalog = Arc::new(self.catalog.unwrap_or_else(Catalog::builtin));
        let resolver = Arc::new(IndicatorResolver::new(
            Arc::clone(&catalog),
            Arc::new(IndicatorIndex::seeded()),
        ));
        let cache = Arc::new(
            self.cache
                .unwrap_or_else(|| TieredCache::in_process(self.cache_cfg)),
        );
        let gate = Arc::new(self.gate.unwrap_or_default());
        tracing::info!(
            target: "econfed::core",
            adapters = adapters.len(),
            "orchestrator built"
        );
        Ok(EconFed {
            adapters,
            catalog,
            resolver,
            cache,
            gate,
            ranker: self.ranker,
            cfg: self.cfg,
        })
    }
}

impl EconFed {
    /// Start building an orchestrator.
    #[must_use]
    pub fn builder() -> EconFedBuilder {
        EconFedBuilder::new()
    }

    /// The registered adapter for a provider, if any.
    pub(crate) fn adapter(&self, provider: Provider) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider)
    }

    /// Whether a provider has a registered adapter.
    pub(crate) fn has_adapter(&self, provider: Provider) -> bool {
        self.adapters.contains_key(&provider)
    }
}

/// Tag an error with the provider it came from, unless it already carries
/// provider context.
pub(crate) fn tag_err(provider: Provider, e: FedError) -> FedError {
    match e {
        e @ (FedError::DataNotAvailable { .. }
        | FedError::Provider { .. }
        | FedError::Decode { .. }
        | FedError::CircuitOpen { .. }
        | FedError::ProviderTimeout { .. }
        | FedError::RequestTimeout
        | FedError::AllProvidersFailed(_)) => e,
        other => FedError::provider(provider, other.to_string()),
    }
}
