//! Two-tier result cache: Redis first, in-process moka second.
//!
//! Keys are derived from the *normalized* request so that spelling variants
//! of the same query collide (`country=US` vs `country=USA`) while requests
//! that differ semantically (distinct currency pairs) never do. Values are
//! the serialized canonical series lists. Writes go to both tiers;
//! last-writer-wins per key.

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use econfed_catalog::CountryResolver;
use econfed_types::{CacheConfig, Provider, Series};

fn normalize_country(c: &str) -> String {
    CountryResolver::normalize(c)
        .map(str::to_string)
        .unwrap_or_else(|| c.trim().to_ascii_uppercase())
}

/// A provider-scoped cache key over normalized request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    provider: Provider,
    digest: String,
}

impl CacheKey {
    /// Derive the key for a normalized request.
    #[must_use]
    pub fn new(provider: Provider, req: &econfed_types::FetchRequest) -> Self {
        // A stable textual rendering of every semantic field. Countries are
        // upper-cased, normalized, and sorted so that ordering and spelling
        // variants key identically.
        let mut countries: Vec<String> =
            req.countries.iter().map(|c| normalize_country(c)).collect();
        countries.sort();
        let mut dimensions: Vec<String> = req
            .dimensions
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        dimensions.sort();
        let mut coins: Vec<String> = req.coin_ids.iter().map(|c| c.to_ascii_lowercase()).collect();
        coins.sort();

        let rendering = format!(
            "indicator={}|series={}|countries={}|start={}|end={}|freq={}|base={}|target={}|reporter={}|partner={}|commodity={}|flow={}|coins={}|vs={}|days={}|dims={}",
            req.indicator.trim().to_ascii_lowercase(),
            req.series_id.as_deref().unwrap_or("").to_ascii_uppercase(),
            countries.join(","),
            req.start_date.map(|d| d.to_string()).unwrap_or_default(),
            req.end_date.map(|d| d.to_string()).unwrap_or_default(),
            req.frequency.map(|f| f.code().to_string()).unwrap_or_default(),
            req.base_currency.as_deref().unwrap_or("").to_ascii_uppercase(),
            req.target_currency.as_deref().unwrap_or("").to_ascii_uppercase(),
            req.reporter.as_deref().unwrap_or("").to_ascii_lowercase(),
            req.partner.as_deref().unwrap_or("").to_ascii_lowercase(),
            req.commodity.as_deref().unwrap_or(""),
            req.flow.map(|f| f.code()).unwrap_or(""),
            coins.join(","),
            req.vs_currency.as_deref().unwrap_or("").to_ascii_lowercase(),
            req.days.map(|d| d.to_string()).unwrap_or_default(),
            dimensions.join(","),
        );

        let digest = hex::encode(Sha256::digest(rendering.as_bytes()));
        Self { provider, digest }
    }

    /// Namespaced Redis key: `econfed:{provider}:{sha256(params)}`.
    #[must_use]
    pub fn redis_key(&self) -> String {
        format!("econfed:{}:{}", self.provider, self.digest)
    }

    /// The provider this key is scoped to.
    #[must_use]
    pub const fn provider(&self) -> Provider {
        self.provider
    }
}

type LocalStore = moka::future::Cache<String, Arc<Vec<Series>>>;

/// The two-tier cache. The in-process tier is a set of per-provider moka
/// caches (distinct TTLs per provider); the distributed tier is Redis,
/// optional and soft-failing: a Redis error degrades to the local tier
/// with a warning, never a request failure.
pub struct TieredCache {
    cfg: CacheConfig,
    local: HashMap<Provider, LocalStore>,
    redis: Option<redis::aio::ConnectionManager>,
}

impl TieredCache {
    /// Build the cache, connecting to Redis when the config carries a URL.
    pub async fn new(cfg: CacheConfig) -> Self {
        let mut local = HashMap::new();
        for provider in Provider::ALL {
            let store = moka::future::Cache::builder()
                .max_capacity(cfg.max_entries)
                .time_to_live(cfg.ttl_for(provider))
                .build();
            local.insert(provider, store);
        }

        let redis = match cfg.redis_url.as_deref() {
            Some(url) => match Self::connect_redis(url).await {
                Ok(conn) => {
                    tracing::info!(target: "econfed::cache", "redis tier connected");
                    Some(conn)
                }
                Err(err) => {
                    tracing::warn!(
                        target: "econfed::cache",
                        %err,
                        "redis unavailable, running on the in-process tier only"
                    );
                    None
                }
            },
            None => None,
        };

        Self { cfg, local, redis }
    }

    /// In-process-only cache (no Redis), for tests and single-node runs.
    #[must_use]
    pub fn in_process(cfg: CacheConfig) -> Self {
        let mut local = HashMap::new();
        for provider in Provider::ALL {
            let store = moka::future::Cache::builder()
                .max_capacity(cfg.max_entries)
                .time_to_live(cfg.ttl_for(provider))
                .build();
            local.insert(provider, store);
        }
        Self {
            cfg,
            local,
            redis: None,
        }
    }

    async fn connect_redis(url: &str) -> Result<redis::aio::ConnectionManager, redis::RedisError> {
        let client = redis::Client::open(url)?;
        client.get_connection_manager().await
    }

    /// Look a key up: Redis first, then the in-process tier. A Redis hit is
    /// backfilled into the local tier.
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<Series>> {
        if let Some(conn) = &self.redis {
            let mut conn = conn.clone();
            let redis_key = key.redis_key();
            match redis::cmd("GET")
                .arg(&redis_key)
                .query_async::<_, Option<String>>(&mut conn)
                .await
            {
                Ok(Some(payload)) => match serde_json::from_str::<Vec<Series>>(&payload) {
                    Ok(series) => {
                        tracing::debug!(target: "econfed::cache", provider = %key.provider(), "redis hit");
                        if let Some(store) = self.local.get(&key.provider()) {
                            store
                                .insert(key.redis_key(), Arc::new(series.clone()))
                                .await;
                        }
                        return Some(series);
                    }
                    Err(err) => {
                        tracing::warn!(target: "econfed::cache", %err, "corrupt redis entry ignored");
                    }
                },
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        target: "econfed::cache",
                        %err,
                        "redis read failed, falling back to the in-process tier"
                    );
                }
            }
        }

        let store = self.local.get(&key.provider())?;
        let hit = store.get(&key.redis_key()).await;
        if hit.is_some() {
            tracing::debug!(target: "econfed::cache", provider = %key.provider(), "in-process hit");
        }
        hit.map(|arc| (*arc).clone())
    }

    /// Store a result in both tiers with the provider-scoped TTL.
    pub async fn put(&self, key: &CacheKey, value: &[Series]) {
        let ttl = self.cfg.ttl_for(key.provider());

        if let Some(conn) = &self.redis {
            let mut conn = conn.clone();
            match serde_json::to_string(value) {
                Ok(payload) => {
                    let result: Result<(), redis::RedisError> = redis::cmd("SET")
                        .arg(key.redis_key())
                        .arg(payload)
                        .arg("EX")
                        .arg(ttl.as_secs().max(1))
                        .query_async(&mut conn)
                        .await;
                    if let Err(err) = result {
                        tracing::warn!(target: "econfed::cache", %err, "redis write failed");
                    }
                }
                Err(err) => {
                    tracing::warn!(target: "econfed::cache", %err, "serialize for redis failed");
                }
            }
        }

        if let Some(store) = self.local.get(&key.provider()) {
            store.insert(key.redis_key(), Arc::new(value.to_vec())).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use econfed_types::{FetchRequest, Frequency, Point, SeriesMeta};

    fn series(id: &str, value: f64) -> Series {
        let meta = SeriesMeta::new(
            Provider::ExchangeRate,
            "Exchange rate",
            "United States",
            id,
            Frequency::RealTime,
            "rate",
        );
        Series::new(
            meta,
            vec![Point::new("2024-01-01".parse().unwrap(), Some(value))],
        )
    }

    fn fx_request(base: &str, target: &str) -> FetchRequest {
        FetchRequest {
            indicator: "exchange rate".into(),
            base_currency: Some(base.into()),
            target_currency: Some(target.into()),
            ..FetchRequest::default()
        }
    }

    #[test]
    fn country_spelling_variants_collide() {
        let a = CacheKey::new(
            Provider::WorldBank,
            &FetchRequest::indicator_for_country("gdp", "US"),
        );
        let b = CacheKey::new(
            Provider::WorldBank,
            &FetchRequest::indicator_for_country("GDP", "usa"),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_currency_pairs_never_collide() {
        let a = CacheKey::new(Provider::ExchangeRate, &fx_request("USD", "EUR"));
        let b = CacheKey::new(Provider::ExchangeRate, &fx_request("USD", "JPY"));
        assert_ne!(a, b);
    }

    #[test]
    fn country_order_is_irrelevant() {
        let mut a = FetchRequest::indicator_for_country("gdp", "US");
        a.countries.push("DE".into());
        let mut b = FetchRequest::indicator_for_country("gdp", "DE");
        b.countries.push("US".into());
        assert_eq!(
            CacheKey::new(Provider::WorldBank, &a),
            CacheKey::new(Provider::WorldBank, &b)
        );
    }

    #[tokio::test]
    async fn put_then_get_round_trips_in_process() {
        let cache = TieredCache::in_process(CacheConfig::default());
        let key = CacheKey::new(Provider::ExchangeRate, &fx_request("USD", "EUR"));
        assert!(cache.get(&key).await.is_none());
        let value = vec![series("USD/EUR", 0.92)];
        cache.put(&key, &value).await;
        assert_eq!(cache.get(&key).await, Some(value));
    }

    #[tokio::test]
    async fn separate_pairs_store_separate_values() {
        let cache = TieredCache::in_process(CacheConfig::default());
        let eur_key = CacheKey::new(Provider::ExchangeRate, &fx_request("USD", "EUR"));
        let jpy_key = CacheKey::new(Provider::ExchangeRate, &fx_request("USD", "JPY"));
        cache.put(&eur_key, &[series("USD/EUR", 0.92)]).await;
        cache.put(&jpy_key, &[series("USD/JPY", 151.4)]).await;
        let eur = cache.get(&eur_key).await.unwrap();
        let jpy = cache.get(&jpy_key).await.unwrap();
        assert_ne!(eur[0].points[0].value, jpy[0].points[0].value);
    }
}
