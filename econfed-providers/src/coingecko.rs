//! CoinGecko cryptocurrency adapter.
//!
//! Demo and Pro keys differ in both hostname and query parameter name;
//! the free tier caps historical windows at 365 days. Current prices come
//! from `/simple/price`, history from `/coins/{id}/market_chart`.

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use econfed_core::adapter::ProviderAdapter;
use econfed_core::http::{HttpPool, mask_secrets};
use econfed_core::retry::check_response;
use econfed_types::{
    FedError, FetchRequest, Frequency, Point, Provider, Series, SeriesMeta,
};

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com";
const PRO_BASE_URL: &str = "https://pro-api.coingecko.com";
/// Free and demo tiers cannot reach past this many days of history.
const FREE_TIER_MAX_DAYS: u32 = 365;

const COIN_ALIASES: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("BITCOIN", "bitcoin"),
    ("ETH", "ethereum"),
    ("ETHEREUM", "ethereum"),
    ("SOL", "solana"),
    ("XRP", "ripple"),
    ("ADA", "cardano"),
    ("DOGE", "dogecoin"),
];

#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
}

/// The CoinGecko adapter.
pub struct CoinGeckoAdapter {
    api_key: Option<String>,
    pro: bool,
    base_url: String,
}

impl CoinGeckoAdapter {
    /// Build with an optional key; `pro` selects the Pro hostname and
    /// parameter name.
    #[must_use]
    pub fn new(api_key: Option<String>, pro: bool) -> Self {
        let base_url = if pro && api_key.is_some() {
            PRO_BASE_URL.to_string()
        } else {
            DEFAULT_BASE_URL.to_string()
        };
        Self {
            api_key,
            pro,
            base_url,
        }
    }

    /// Point the adapter at a different host (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn key_param(&self) -> Option<String> {
        let key = self.api_key.as_deref()?;
        // Pro and demo keys use different parameter names.
        let name = if self.pro {
            "x_cg_pro_api_key"
        } else {
            "x_cg_demo_api_key"
        };
        Some(format!("{name}={key}"))
    }

    fn resolve_coin(&self, req: &FetchRequest) -> Result<String, FedError> {
        if let Some(first) = req.coin_ids.first() {
            return Ok(first.to_ascii_lowercase());
        }
        let upper = req.indicator.trim().to_ascii_uppercase();
        if let Some((_, id)) = COIN_ALIASES.iter().find(|(alias, _)| *alias == upper) {
            return Ok((*id).to_string());
        }
        let compact = req.indicator.trim().to_ascii_lowercase();
        if !compact.is_empty() && compact.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Ok(compact);
        }
        Err(FedError::not_available(
            Provider::CoinGecko,
            format!("could not map '{}' to a CoinGecko coin id", req.indicator),
        ))
    }
}

#[async_trait]
impl ProviderAdapter for CoinGeckoAdapter {
    fn provider(&self) -> Provider {
        Provider::CoinGecko
    }

    fn default_range_years(&self) -> u32 {
        0 // windows are expressed in days, defaulted by the orchestrator
    }

    async fn fetch(&self, req: &FetchRequest) -> Result<Vec<Series>, FedError> {
        let coin = self.resolve_coin(req)?;
        let vs = req
            .vs_currency
            .clone()
            .unwrap_or_else(|| "usd".to_string())
            .to_ascii_lowercase();
        let mut days = req.days.unwrap_or(30);
        if !self.pro && days > FREE_TIER_MAX_DAYS {
            tracing::warn!(
                target: "econfed::coingecko",
                requested = days,
                cap = FREE_TIER_MAX_DAYS,
                "free tier caps history, clamping window"
            );
            days = FREE_TIER_MAX_DAYS;
        }

        let mut url = format!(
            "{}/api/v3/coins/{}/market_chart?vs_currency={}&days={}",
            self.base_url, coin, vs, days,
        );
        if let Some(param) = self.key_param() {
            url.push_str(&format!("&{param}"));
        }

        let resp = HttpPool::client()
            .get(&url)
            .send()
            .await
            .map_err(|err| FedError::Transport(format!("CoinGecko request failed: {err}")))?;
        let resp = check_response(Provider::CoinGecko, resp)?;
        let chart: MarketChart = resp
            .json()
            .await
            .map_err(|err| FedError::decode(Provider::CoinGecko, err.to_string()))?;

        if chart.prices.is_empty() {
            return Err(FedError::not_available(
                Provider::CoinGecko,
                format!("no price history for coin '{coin}'"),
            ));
        }

        // Millisecond timestamps; keep one point per calendar day (the API
        // returns intraday granularity for short windows).
        let mut points: Vec<Point> = Vec::new();
        for (ts_ms, price) in &chart.prices {
            let Some(dt) = DateTime::from_timestamp_millis(*ts_ms as i64) else {
                continue;
            };
            let date = dt.date_naive();
            match points.last_mut() {
                Some(last) if last.date == date => last.value = Some(*price),
                _ => points.push(Point::new(date, Some(*price))),
            }
        }

        let mut meta = SeriesMeta::new(
            Provider::CoinGecko,
            format!("{coin} price"),
            "Global",
            coin.clone(),
            Frequency::Daily,
            format!("{} per coin", vs.to_ascii_uppercase()),
        );
        meta.api_url = mask_secrets(&url);
        meta.source_url = format!("https://www.coingecko.com/en/coins/{coin}");
        Ok(vec![Series::new(meta, points)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_map_to_coin_ids() {
        let adapter = CoinGeckoAdapter::new(None, false);
        let req = FetchRequest {
            indicator: "BTC".into(),
            ..FetchRequest::default()
        };
        assert_eq!(adapter.resolve_coin(&req).unwrap(), "bitcoin");
    }

    #[test]
    fn explicit_coin_ids_win() {
        let adapter = CoinGeckoAdapter::new(None, false);
        let req = FetchRequest {
            indicator: "bitcoin".into(),
            coin_ids: vec!["ethereum".into()],
            ..FetchRequest::default()
        };
        assert_eq!(adapter.resolve_coin(&req).unwrap(), "ethereum");
    }

    #[test]
    fn pro_keys_use_the_pro_parameter_and_host() {
        let pro = CoinGeckoAdapter::new(Some("k".into()), true);
        assert!(pro.key_param().unwrap().starts_with("x_cg_pro_api_key="));
        assert_eq!(pro.base_url, PRO_BASE_URL);
        let demo = CoinGeckoAdapter::new(Some("k".into()), false);
        assert!(demo.key_param().unwrap().starts_with("x_cg_demo_api_key="));
        assert_eq!(demo.base_url, DEFAULT_BASE_URL);
    }
}
