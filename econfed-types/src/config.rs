//! Configuration types shared across the orchestrator and middleware.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Provider;

/// Retry policy for upstream calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries after the initial attempt (default 3, capped at 5).
    /// A value of 3 means up to four calls in total.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub backoff_factor: f64,
    /// Upper bound of the uniform jitter added to each delay.
    pub jitter: Duration,
    /// Minimum wait after a 429 without a Retry-After header.
    pub rate_limit_floor: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            jitter: Duration::from_millis(250),
            rate_limit_floor: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Clamp attempts to the supported 1..=5 range.
    #[must_use]
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.clamp(1, 5)
    }
}

/// Per-provider pacing and circuit-breaker settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Token bucket capacity (burst size).
    pub burst: u32,
    /// Tokens refilled per second.
    pub refill_per_sec: f64,
    /// Consecutive 429/5xx failures that open the breaker.
    pub breaker_threshold: u32,
    /// How long the breaker stays open before allowing a probe.
    pub breaker_cooloff: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst: 10,
            refill_per_sec: 5.0,
            breaker_threshold: 5,
            breaker_cooloff: Duration::from_secs(30),
        }
    }
}

impl RateLimitConfig {
    /// Conservative bucket for rate-limit-sensitive upstreams (OECD).
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            burst: 2,
            refill_per_sec: 0.5,
            breaker_threshold: 3,
            breaker_cooloff: Duration::from_secs(60),
        }
    }
}

/// Cache tier configuration with provider-scoped TTLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL applied when no provider override exists.
    pub default_ttl: Duration,
    /// Per-provider TTL overrides.
    pub per_provider_ttl: BTreeMap<Provider, Duration>,
    /// In-process tier capacity (entries).
    pub max_entries: u64,
    /// Redis connection URL; `None` disables the distributed tier.
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let mut per_provider_ttl = BTreeMap::new();
        per_provider_ttl.insert(Provider::ExchangeRate, Duration::from_secs(3600));
        per_provider_ttl.insert(Provider::CoinGecko, Duration::from_secs(300));
        per_provider_ttl.insert(Provider::Comtrade, Duration::from_secs(86_400));
        per_provider_ttl.insert(Provider::Bis, Duration::from_secs(21_600));
        per_provider_ttl.insert(Provider::Eurostat, Duration::from_secs(21_600));
        per_provider_ttl.insert(Provider::Oecd, Duration::from_secs(21_600));
        Self {
            default_ttl: Duration::from_secs(900),
            per_provider_ttl,
            max_entries: 2048,
            redis_url: None,
        }
    }
}

impl CacheConfig {
    /// Effective TTL for a provider.
    #[must_use]
    pub fn ttl_for(&self, provider: Provider) -> Duration {
        self.per_provider_ttl
            .get(&provider)
            .copied()
            .unwrap_or(self.default_ttl)
    }
}

/// API keys and base-URL overrides, conventionally sourced from the
/// environment. All keys are optional; public endpoints work without them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderKeys {
    /// FRED API key.
    pub fred: Option<String>,
    /// UN Comtrade subscription key.
    pub comtrade: Option<String>,
    /// ExchangeRate-API key (free tier is current-rates only).
    pub exchangerate: Option<String>,
    /// CoinGecko key (demo or pro).
    pub coingecko: Option<String>,
    /// Whether the CoinGecko key is a pro key (different host + param name).
    pub coingecko_pro: bool,
    /// Base URL overrides, keyed by provider (tests point these at mocks).
    pub base_urls: BTreeMap<Provider, String>,
}

impl ProviderKeys {
    /// Read keys from the conventional environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let get = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            fred: get("FRED_API_KEY"),
            comtrade: get("COMTRADE_API_KEY"),
            exchangerate: get("EXCHANGERATE_API_KEY"),
            coingecko: get("COINGECKO_API_KEY"),
            coingecko_pro: get("COINGECKO_PRO").is_some(),
            base_urls: BTreeMap::new(),
        }
    }

    /// Base URL override for a provider, if configured.
    #[must_use]
    pub fn base_url(&self, provider: Provider) -> Option<&str> {
        self.base_urls.get(&provider).map(String::as_str)
    }
}

/// Global configuration for the `EconFed` orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FedConfig {
    /// Timeout for an individual provider call.
    pub provider_timeout: Duration,
    /// Optional overall deadline for one query (fan-outs included).
    pub request_timeout: Option<Duration>,
    /// Retry policy default; providers may override attempts up to 5.
    pub retry: RetryConfig,
    /// Per-provider retry attempt overrides.
    pub retry_attempts_override: BTreeMap<Provider, u32>,
    /// Maximum fallback providers tried after the primary.
    pub max_fallbacks: usize,
    /// Bound on concurrent subqueries for decomposed requests.
    pub decomposition_concurrency: usize,
    /// Enable the optional LLM-assisted ranking layer. The core must work
    /// with this off; the hook is ignored for explicit user choices.
    pub use_hybrid_router: bool,
}

impl Default for FedConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(30),
            request_timeout: None,
            retry: RetryConfig::default(),
            retry_attempts_override: BTreeMap::new(),
            max_fallbacks: 5,
            decomposition_concurrency: 4,
            use_hybrid_router: false,
        }
    }
}

impl FedConfig {
    /// Effective retry attempts for a provider.
    #[must_use]
    pub fn attempts_for(&self, provider: Provider) -> u32 {
        self.retry_attempts_override
            .get(&provider)
            .copied()
            .unwrap_or(self.retry.max_attempts)
            .clamp(1, 5)
    }
}
