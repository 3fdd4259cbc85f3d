//! FRED (Federal Reserve Economic Data) adapter.
//!
//! Covers `/fred/series` (metadata) and `/fred/series/observations`
//! (values). Supports FRED's units transforms through a `SERIES:pc1`
//! suffix convention on series ids, and serves historical bilateral
//! exchange-rate queries through the DEX* series family.

use async_trait::async_trait;
use serde::Deserialize;

use econfed_core::adapter::ProviderAdapter;
use econfed_core::http::{HttpPool, mask_secrets};
use econfed_core::retry::check_response;
use econfed_core::timeseries::normalize::normalize_percent;
use econfed_types::{
    FedError, FetchRequest, Frequency, Point, Provider, Series, SeriesMeta,
};

const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org";
const PORTAL_URL: &str = "https://fred.stlouisfed.org/series";

/// Bilateral spot exchange-rate series. Values are quoted as the series
/// defines them; the pair is matched in either direction.
const FX_SERIES: &[(&str, &str, &str)] = &[
    ("USD", "EUR", "DEXUSEU"),
    ("USD", "JPY", "DEXJPUS"),
    ("USD", "GBP", "DEXUSUK"),
    ("USD", "CAD", "DEXCAUS"),
    ("USD", "CHF", "DEXSZUS"),
    ("USD", "CNY", "DEXCHUS"),
    ("USD", "MXN", "DEXMXUS"),
    ("USD", "AUD", "DEXUSAL"),
    ("USD", "KRW", "DEXKOUS"),
    ("USD", "INR", "DEXINUS"),
    ("USD", "BRL", "DEXBZUS"),
];

/// Small fallback map for common free-text terms; the indicator resolver
/// handles everything else before the adapter is reached.
const TERM_FALLBACKS: &[(&str, &str)] = &[
    ("UNEMPLOYMENT_RATE", "UNRATE"),
    ("UNEMPLOYMENT", "UNRATE"),
    ("GDP", "GDP"),
    ("INFLATION", "CPIAUCSL"),
    ("CPI", "CPIAUCSL"),
    ("FED_FUNDS_RATE", "FEDFUNDS"),
    ("INTEREST_RATE", "FEDFUNDS"),
    ("HOUSING_STARTS", "HOUST"),
    ("NONFARM_PAYROLLS", "PAYEMS"),
];

#[derive(Debug, Deserialize)]
struct SeriesInfo {
    id: String,
    title: String,
    #[serde(default)]
    frequency: String,
    #[serde(default)]
    units: String,
    #[serde(default)]
    seasonal_adjustment: String,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    #[serde(default)]
    seriess: Vec<SeriesInfo>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<Observation>,
}

/// The FRED adapter.
pub struct FredAdapter {
    api_key: Option<String>,
    base_url: String,
}

impl FredAdapter {
    /// Build with an optional API key.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the adapter at a different host (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Split a `SERIES:pc1` style id into the series and the units
    /// transform FRED should apply server-side.
    fn split_transform(series_id: &str) -> (String, Option<String>) {
        match series_id.split_once(':') {
            Some((series, transform)) if !transform.is_empty() => {
                (series.to_string(), Some(transform.to_string()))
            }
            _ => (series_id.to_string(), None),
        }
    }

    /// Bilateral FX series for a currency pair, when FRED has one.
    #[must_use]
    pub fn fx_series_for_pair(base: &str, target: &str) -> Option<&'static str> {
        let base = base.to_ascii_uppercase();
        let target = target.to_ascii_uppercase();
        FX_SERIES
            .iter()
            .find(|(a, b, _)| {
                (*a == base && *b == target) || (*a == target && *b == base)
            })
            .map(|(_, _, series)| *series)
    }

    fn resolve_series_id(&self, req: &FetchRequest) -> Result<(String, Option<String>), FedError> {
        if let Some(id) = req.series_id.as_deref() {
            return Ok(Self::split_transform(id));
        }
        if let (Some(base), Some(target)) =
            (req.base_currency.as_deref(), req.target_currency.as_deref())
            && let Some(series) = Self::fx_series_for_pair(base, target)
        {
            return Ok((series.to_string(), None));
        }
        let key = req
            .indicator
            .trim()
            .to_ascii_uppercase()
            .replace([' ', '-'], "_");
        if let Some((_, code)) = TERM_FALLBACKS.iter().find(|(term, _)| *term == key) {
            return Ok(((*code).to_string(), None));
        }
        // A bare code ("UNRATE", "T10Y2Y") passes through.
        let compact = req.indicator.trim();
        if !compact.is_empty()
            && compact.len() <= 24
            && compact
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == ':')
        {
            return Ok(Self::split_transform(&compact.to_ascii_uppercase()));
        }
        Err(FedError::not_available(
            Provider::Fred,
            format!("could not map '{}' to a FRED series id", req.indicator),
        ))
    }

    async fn series_info(&self, series_id: &str) -> Result<SeriesInfo, FedError> {
        let url = format!(
            "{}/fred/series?series_id={}&api_key={}&file_type=json",
            self.base_url,
            series_id,
            self.api_key.as_deref().unwrap_or(""),
        );
        let resp = HttpPool::client()
            .get(&url)
            .send()
            .await
            .map_err(|err| FedError::Transport(format!("FRED request failed: {err}")))?;
        let resp = check_response(Provider::Fred, resp)?;
        let body: SeriesResponse = resp
            .json()
            .await
            .map_err(|err| FedError::decode(Provider::Fred, err.to_string()))?;
        body.seriess.into_iter().next().ok_or_else(|| {
            FedError::not_available(
                Provider::Fred,
                format!("FRED has no series '{series_id}'"),
            )
        })
    }

    fn map_frequency(raw: &str) -> Frequency {
        Frequency::parse(raw.split(',').next().unwrap_or(raw))
            .unwrap_or(Frequency::Monthly)
    }

    /// Full-text search over FRED's series catalog (`/fred/series/search`),
    /// ordered by search rank. Discovery flows feed accepted hits into the
    /// indicator index's learned-mapping store.
    pub async fn search_series(
        &self,
        text: &str,
        limit: u32,
    ) -> Result<Vec<SeriesSearchHit>, FedError> {
        let url = format!(
            "{}/fred/series/search?search_text={}&limit={}&api_key={}&file_type=json",
            self.base_url,
            text.replace(' ', "+"),
            limit,
            self.api_key.as_deref().unwrap_or(""),
        );
        let resp = HttpPool::client()
            .get(&url)
            .send()
            .await
            .map_err(|err| FedError::Transport(format!("FRED search failed: {err}")))?;
        let resp = check_response(Provider::Fred, resp)?;
        let body: SeriesResponse = resp
            .json()
            .await
            .map_err(|err| FedError::decode(Provider::Fred, err.to_string()))?;
        Ok(body
            .seriess
            .into_iter()
            .map(|info| SeriesSearchHit {
                id: info.id,
                title: info.title,
                frequency: info.frequency,
                units: info.units,
            })
            .collect())
    }
}

/// One hit from the FRED series search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSearchHit {
    /// FRED series id.
    pub id: String,
    /// Series title.
    pub title: String,
    /// Native cadence label.
    pub frequency: String,
    /// Unit label.
    pub units: String,
}

#[async_trait]
impl ProviderAdapter for FredAdapter {
    fn provider(&self) -> Provider {
        Provider::Fred
    }

    async fn fetch(&self, req: &FetchRequest) -> Result<Vec<Series>, FedError> {
        let (series_id, transform) = self.resolve_series_id(req)?;
        let info = self.series_info(&series_id).await?;

        let mut url = format!(
            "{}/fred/series/observations?series_id={}&api_key={}&file_type=json",
            self.base_url,
            series_id,
            self.api_key.as_deref().unwrap_or(""),
        );
        if let Some(start) = req.start_date {
            url.push_str(&format!("&observation_start={start}"));
        }
        if let Some(end) = req.end_date {
            url.push_str(&format!("&observation_end={end}"));
        }
        if let Some(transform) = &transform {
            url.push_str(&format!("&units={transform}"));
        }

        let resp = HttpPool::client()
            .get(&url)
            .send()
            .await
            .map_err(|err| FedError::Transport(format!("FRED request failed: {err}")))?;
        let resp = check_response(Provider::Fred, resp)?;
        let body: ObservationsResponse = resp
            .json()
            .await
            .map_err(|err| FedError::decode(Provider::Fred, err.to_string()))?;

        if body.observations.is_empty() {
            return Err(FedError::not_available(
                Provider::Fred,
                format!("no observations for series '{series_id}' in the requested window"),
            ));
        }

        let mut points: Vec<Point> = body
            .observations
            .iter()
            .filter_map(|obs| {
                let date = obs.date.parse().ok()?;
                // FRED marks missing observations with ".".
                let value = if obs.value.trim() == "." {
                    None
                } else {
                    obs.value.trim().parse::<f64>().ok()
                };
                Some(Point::new(date, value))
            })
            .collect();

        let unit = if transform.as_deref() == Some("pc1") {
            "Percent Change from Year Ago".to_string()
        } else {
            info.units.clone()
        };
        let corrected = normalize_percent(&mut points, &unit);

        let mut meta = SeriesMeta::new(
            Provider::Fred,
            info.title.clone(),
            "United States",
            info.id.clone(),
            Self::map_frequency(&info.frequency),
            unit,
        );
        meta.seasonal_adjustment = Some(info.seasonal_adjustment.clone())
            .filter(|s| !s.is_empty());
        meta.description = info.notes.clone();
        meta.api_url = mask_secrets(&url);
        meta.source_url = format!("{PORTAL_URL}/{}", info.id);
        if corrected {
            meta.notes = Some("values rescaled from decimal fractions to percent".to_string());
        }

        Ok(vec![Series::new(meta, points)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_suffix_is_split_off() {
        assert_eq!(
            FredAdapter::split_transform("CPIAUCSL:pc1"),
            ("CPIAUCSL".to_string(), Some("pc1".to_string()))
        );
        assert_eq!(
            FredAdapter::split_transform("UNRATE"),
            ("UNRATE".to_string(), None)
        );
    }

    #[test]
    fn fx_pairs_match_in_either_direction() {
        assert_eq!(FredAdapter::fx_series_for_pair("USD", "EUR"), Some("DEXUSEU"));
        assert_eq!(FredAdapter::fx_series_for_pair("eur", "usd"), Some("DEXUSEU"));
        assert_eq!(FredAdapter::fx_series_for_pair("USD", "ZWL"), None);
    }

    #[test]
    fn free_text_falls_back_to_known_codes() {
        let adapter = FredAdapter::new(None);
        let req = FetchRequest {
            indicator: "unemployment rate".into(),
            ..FetchRequest::default()
        };
        let (series, transform) = adapter.resolve_series_id(&req).unwrap();
        assert_eq!(series, "UNRATE");
        assert!(transform.is_none());
    }

    #[test]
    fn resolved_series_id_takes_precedence() {
        let adapter = FredAdapter::new(None);
        let req = FetchRequest {
            indicator: "inflation".into(),
            series_id: Some("CPIAUCSL:pc1".into()),
            ..FetchRequest::default()
        };
        let (series, transform) = adapter.resolve_series_id(&req).unwrap();
        assert_eq!(series, "CPIAUCSL");
        assert_eq!(transform.as_deref(), Some("pc1"));
    }
}
