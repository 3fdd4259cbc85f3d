//! OECD statistics adapter (SDMX-JSON).
//!
//! OECD serves SDMX-JSON like BIS but fans out per country: one request
//! per geography, because multi-key requests routinely hit the service's
//! aggressive rate limiting. The orchestrator gives OECD the conservative
//! pacing bucket; the adapter keeps each request minimal.

use async_trait::async_trait;

use econfed_catalog::CountryResolver;
use econfed_core::adapter::ProviderAdapter;
use econfed_core::http::HttpPool;
use econfed_core::retry::check_response;
use econfed_core::timeseries::normalize::normalize_percent;
use econfed_core::timeseries::period::parse_period;
use econfed_types::{
    FedError, FetchRequest, Frequency, Point, Provider, Series, SeriesMeta,
};

use crate::sdmx;

const DEFAULT_BASE_URL: &str = "https://sdmx.oecd.org/public/rest";
const SDMX_ACCEPT: &str = "application/vnd.sdmx.data+json;version=1.0.0";

const DATAFLOW_MAPPINGS: &[(&str, &str, &str)] = &[
    // (term, dataflow, unit)
    ("GDP", "GDP", "US dollars, millions"),
    ("UNEMPLOYMENT", "UNE_RT", "Percent of labour force"),
    ("UNEMPLOYMENT_RATE", "UNE_RT", "Percent of labour force"),
    ("CPI", "CPI", "Index"),
    ("INFLATION", "CPI", "Index"),
    ("INTEREST_RATE", "IR", "Percent per annum"),
    ("PRODUCTIVITY", "PDB_LV", "US dollars"),
    ("LABOR_PRODUCTIVITY", "PDB_LV", "US dollars"),
];

/// The OECD adapter.
pub struct OecdAdapter {
    base_url: String,
}

impl Default for OecdAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl OecdAdapter {
    /// Build against the public endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the adapter at a different host (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn resolve_dataflow(&self, req: &FetchRequest) -> Result<(String, &'static str), FedError> {
        if let Some(code) = req.series_id.as_deref() {
            let unit = DATAFLOW_MAPPINGS
                .iter()
                .find(|(_, flow, _)| flow.eq_ignore_ascii_case(code))
                .map_or("", |(_, _, unit)| *unit);
            return Ok((code.to_ascii_uppercase(), unit));
        }
        let key = req
            .indicator
            .trim()
            .to_ascii_uppercase()
            .replace([' ', '-'], "_");
        if let Some((_, flow, unit)) = DATAFLOW_MAPPINGS.iter().find(|(term, _, _)| *term == key)
        {
            return Ok(((*flow).to_string(), unit));
        }
        Err(FedError::not_available(
            Provider::Oecd,
            format!("could not map '{}' to an OECD dataflow", req.indicator),
        ))
    }

    async fn fetch_country(
        &self,
        dataflow: &str,
        unit: &str,
        iso2: &str,
        req: &FetchRequest,
    ) -> Result<Series, FedError> {
        let key = CountryResolver::to_iso3(iso2)
            .map(str::to_string)
            .unwrap_or_else(|| iso2.to_ascii_uppercase());
        let mut url = format!("{}/data/{}/{}", self.base_url, dataflow, key);
        let mut query = vec!["format=jsondata".to_string()];
        if let Some(start) = req.start_date {
            query.push(format!("startPeriod={}", start.format("%Y")));
        }
        if let Some(end) = req.end_date {
            query.push(format!("endPeriod={}", end.format("%Y")));
        }
        url.push('?');
        url.push_str(&query.join("&"));

        let resp = HttpPool::client()
            .get(&url)
            .header("Accept", SDMX_ACCEPT)
            .send()
            .await
            .map_err(|err| FedError::Transport(format!("OECD request failed: {err}")))?;
        let resp = check_response(Provider::Oecd, resp)?;
        let body = resp
            .text()
            .await
            .map_err(|err| FedError::Transport(format!("OECD body read failed: {err}")))?;

        let payload = sdmx::parse(Provider::Oecd, &body)?;
        let Some((series_key, observations)) = sdmx::select_best_series(&payload, &[]) else {
            return Err(FedError::not_available(
                Provider::Oecd,
                format!("OECD dataflow {dataflow} returned no observations for {key}"),
            ));
        };

        let frequency = match sdmx::series_dimension_value(&payload, series_key, "FREQ") {
            Some(code) => Frequency::parse(code).unwrap_or(Frequency::Annual),
            None => Frequency::Annual,
        };
        let mut points: Vec<Point> = sdmx::observations_in_time_order(&payload, observations)
            .into_iter()
            .filter_map(|(period, value)| parse_period(&period).map(|d| Point::new(d, value)))
            .collect();
        let corrected = normalize_percent(&mut points, unit);

        let country_display = CountryResolver::display_name(iso2)
            .map(str::to_string)
            .unwrap_or_else(|| iso2.to_string());
        let mut meta = SeriesMeta::new(
            Provider::Oecd,
            dataflow.to_string(),
            country_display,
            format!("{dataflow}/{key}"),
            frequency,
            unit,
        );
        meta.api_url = url;
        meta.source_url = "https://data-explorer.oecd.org".to_string();
        if corrected {
            meta.notes = Some("values rescaled from decimal fractions to percent".to_string());
        }
        Ok(Series::new(meta, points))
    }
}

#[async_trait]
impl ProviderAdapter for OecdAdapter {
    fn provider(&self) -> Provider {
        Provider::Oecd
    }

    fn default_range_years(&self) -> u32 {
        10
    }

    async fn fetch(&self, req: &FetchRequest) -> Result<Vec<Series>, FedError> {
        let (dataflow, unit) = self.resolve_dataflow(req)?;
        let countries = if req.countries.is_empty() {
            vec!["US".to_string()]
        } else {
            req.countries.clone()
        };

        let mut out = Vec::new();
        let mut errors = Vec::new();
        for iso2 in &countries {
            match self.fetch_country(&dataflow, unit, iso2, req).await {
                Ok(series) => out.push(series),
                Err(err) => {
                    tracing::warn!(
                        target: "econfed::oecd",
                        country = %iso2,
                        error = %err,
                        "per-country fetch failed"
                    );
                    errors.push(err);
                }
            }
        }

        if out.is_empty() {
            return Err(errors.pop().unwrap_or_else(|| {
                FedError::not_available(
                    Provider::Oecd,
                    format!("OECD dataflow {dataflow} returned no data"),
                )
            }));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_map_to_dataflows_with_units() {
        let adapter = OecdAdapter::new();
        let req = FetchRequest {
            indicator: "unemployment rate".into(),
            ..FetchRequest::default()
        };
        let (flow, unit) = adapter.resolve_dataflow(&req).unwrap();
        assert_eq!(flow, "UNE_RT");
        assert_eq!(unit, "Percent of labour force");
    }

    #[test]
    fn unknown_terms_are_rejected() {
        let adapter = OecdAdapter::new();
        let req = FetchRequest {
            indicator: "lunar regolith output".into(),
            ..FetchRequest::default()
        };
        assert!(adapter.resolve_dataflow(&req).is_err());
    }
}
