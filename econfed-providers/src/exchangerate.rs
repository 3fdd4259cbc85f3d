//! ExchangeRate-API adapter.
//!
//! The free tier serves current rates only (`/v6/{key}/latest/{base}`, or
//! the keyless open endpoint); historical data needs a paid key, so a
//! dated request is answered with a structured pointer at the FRED
//! bilateral series instead of an upstream call that cannot succeed.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use econfed_core::adapter::ProviderAdapter;
use econfed_core::http::HttpPool;
use econfed_core::retry::check_response;
use econfed_types::{
    FedError, FetchRequest, Frequency, Point, Provider, Series, SeriesMeta,
};

const DEFAULT_KEYED_URL: &str = "https://v6.exchangerate-api.com";
const DEFAULT_OPEN_URL: &str = "https://open.er-api.com";

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    result: String,
    /// Keyed tier field name.
    #[serde(default)]
    conversion_rates: BTreeMap<String, f64>,
    /// Open tier field name.
    #[serde(default)]
    rates: BTreeMap<String, f64>,
}

/// The ExchangeRate-API adapter.
pub struct ExchangeRateAdapter {
    api_key: Option<String>,
    base_url: String,
}

impl ExchangeRateAdapter {
    /// Build with an optional API key; without one the open endpoint is
    /// used.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        let base_url = if api_key.is_some() {
            DEFAULT_KEYED_URL.to_string()
        } else {
            DEFAULT_OPEN_URL.to_string()
        };
        Self { api_key, base_url }
    }

    /// Point the adapter at a different host (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_url(&self, base_currency: &str) -> String {
        match self.api_key.as_deref() {
            Some(key) => format!("{}/v6/{}/latest/{}", self.base_url, key, base_currency),
            None => format!("{}/v6/latest/{}", self.base_url, base_currency),
        }
    }

    /// The key lives in the URL path; mask it for metadata.
    fn masked_url(&self, base_currency: &str) -> String {
        match self.api_key.as_deref() {
            Some(_) => format!("{}/v6/***/latest/{}", self.base_url, base_currency),
            None => self.request_url(base_currency),
        }
    }
}

#[async_trait]
impl ProviderAdapter for ExchangeRateAdapter {
    fn provider(&self) -> Provider {
        Provider::ExchangeRate
    }

    fn default_range_years(&self) -> u32 {
        0 // current rates only
    }

    async fn fetch(&self, req: &FetchRequest) -> Result<Vec<Series>, FedError> {
        let base = req
            .base_currency
            .clone()
            .unwrap_or_else(|| "USD".to_string())
            .to_ascii_uppercase();
        let target = req
            .target_currency
            .clone()
            .unwrap_or_else(|| if base == "USD" { "EUR".into() } else { "USD".into() })
            .to_ascii_uppercase();

        // Historical windows are a paid feature; point at the FRED route.
        if req.start_date.is_some() {
            return Err(FedError::not_available_with(
                Provider::ExchangeRate,
                format!(
                    "historical {base}/{target} rates require a paid ExchangeRate-API plan"
                ),
                vec![format!(
                    "Try FRED's bilateral series for {base}/{target} history \
                     (e.g. DEXUSEU for USD/EUR)."
                )],
            ));
        }

        let url = self.request_url(&base);
        let resp = HttpPool::client()
            .get(&url)
            .send()
            .await
            .map_err(|err| FedError::Transport(format!("ExchangeRate request failed: {err}")))?;
        let resp = check_response(Provider::ExchangeRate, resp)?;
        let body: RatesResponse = resp
            .json()
            .await
            .map_err(|err| FedError::decode(Provider::ExchangeRate, err.to_string()))?;

        if body.result != "success" {
            return Err(FedError::not_available(
                Provider::ExchangeRate,
                format!("rate lookup for {base} failed upstream"),
            ));
        }
        let rates = if body.conversion_rates.is_empty() {
            &body.rates
        } else {
            &body.conversion_rates
        };
        let Some(rate) = rates.get(&target) else {
            return Err(FedError::not_available(
                Provider::ExchangeRate,
                format!(
                    "currency '{target}' is not among the {} quoted currencies",
                    rates.len()
                ),
            ));
        };

        let today = Utc::now().date_naive();
        let mut meta = SeriesMeta::new(
            Provider::ExchangeRate,
            format!("{base} to {target} exchange rate"),
            base.clone(),
            format!("{base}/{target}"),
            Frequency::RealTime,
            format!("{target} per {base}"),
        );
        meta.api_url = self.masked_url(&base);
        meta.source_url = "https://www.exchangerate-api.com".to_string();

        Ok(vec![Series::new(
            meta,
            vec![Point::new(today, Some(*rate))],
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_masked_in_metadata_urls() {
        let adapter =
            ExchangeRateAdapter::new(Some("sekrit".into())).with_base_url("https://x.test");
        assert_eq!(adapter.masked_url("USD"), "https://x.test/v6/***/latest/USD");
        assert!(adapter.request_url("USD").contains("sekrit"));
    }

    #[tokio::test]
    async fn historical_requests_point_at_fred() {
        let adapter = ExchangeRateAdapter::new(None);
        let req = FetchRequest {
            indicator: "exchange rate".into(),
            base_currency: Some("USD".into()),
            target_currency: Some("EUR".into()),
            start_date: Some("2018-01-01".parse().unwrap()),
            ..FetchRequest::default()
        };
        let err = adapter.fetch(&req).await.unwrap_err();
        match err {
            FedError::DataNotAvailable { suggestions, .. } => {
                assert!(suggestions[0].contains("FRED"));
            }
            other => panic!("expected DataNotAvailable, got {other:?}"),
        }
    }
}
