//! IMF DataMapper adapter.
//!
//! DataMapper is unusual among the upstreams: one call per indicator
//! returns *every* country keyed by ISO3. The adapter fetches once,
//! filters to the requested set, and returns series in request order. Its
//! error messages distinguish "the indicator exists but not for this
//! country" from "this is not a DataMapper code at all", because the two
//! need different fixes upstream.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use econfed_catalog::CountryResolver;
use econfed_core::adapter::ProviderAdapter;
use econfed_core::http::HttpPool;
use econfed_core::retry::check_response;
use econfed_core::timeseries::normalize::normalize_percent;
use econfed_core::timeseries::period::parse_period;
use econfed_types::{
    FedError, FetchRequest, Frequency, Point, Provider, Series, SeriesMeta,
};

const DEFAULT_BASE_URL: &str = "https://www.imf.org";

const TERM_FALLBACKS: &[(&str, &str)] = &[
    ("GDP_GROWTH", "NGDP_RPCH"),
    ("REAL_GDP_GROWTH", "NGDP_RPCH"),
    ("GDP", "NGDPD"),
    ("GDP_PER_CAPITA", "NGDPDPC"),
    ("UNEMPLOYMENT", "LUR"),
    ("UNEMPLOYMENT_RATE", "LUR"),
    ("INFLATION", "PCPIPCH"),
    ("GOVERNMENT_DEBT", "GGXWDG_NGDP"),
    ("CURRENT_ACCOUNT", "BCA_NGDPD"),
    ("TRADE_BALANCE", "BCA_NGDPD"),
    ("POPULATION", "LP"),
];

/// Units per WEO indicator family; DataMapper does not return units inline.
fn indicator_unit(code: &str) -> &'static str {
    match code {
        "NGDP_RPCH" | "PCPIPCH" | "LUR" | "GGXWDG_NGDP" | "BCA_NGDPD" => "Percent",
        "NGDPD" => "Billions of U.S. dollars",
        "NGDPDPC" => "U.S. dollars per capita",
        "LP" => "Millions of persons",
        _ => "",
    }
}

#[derive(Debug, Deserialize)]
struct DataMapperResponse {
    #[serde(default)]
    values: BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>,
}

/// The IMF DataMapper adapter.
pub struct ImfAdapter {
    base_url: String,
}

impl Default for ImfAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImfAdapter {
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

    fn resolve_indicator(&self, req: &FetchRequest) -> Result<String, FedError> {
        if let Some(code) = req.series_id.as_deref() {
            return Ok(code.to_ascii_uppercase());
        }
        let key = req
            .indicator
            .trim()
            .to_ascii_uppercase()
            .replace([' ', '-'], "_");
        if let Some((_, code)) = TERM_FALLBACKS.iter().find(|(term, _)| *term == key) {
            return Ok((*code).to_string());
        }
        // WEO codes are uppercase with underscores (NGDP_RPCH).
        if key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && key.len() <= 20
        {
            return Ok(key);
        }
        Err(FedError::not_available(
            Provider::Imf,
            format!("could not map '{}' to an IMF DataMapper code", req.indicator),
        ))
    }
}

#[async_trait]
impl ProviderAdapter for ImfAdapter {
    fn provider(&self) -> Provider {
        Provider::Imf
    }

    async fn fetch(&self, req: &FetchRequest) -> Result<Vec<Series>, FedError> {
        let indicator = self.resolve_indicator(req)?;
        let countries = if req.countries.is_empty() {
            vec!["US".to_string()]
        } else {
            req.countries.clone()
        };

        let url = format!(
            "{}/external/datamapper/api/v1/{}",
            self.base_url, indicator
        );
        let resp = HttpPool::client()
            .get(&url)
            .send()
            .await
            .map_err(|err| FedError::Transport(format!("IMF request failed: {err}")))?;
        let resp = check_response(Provider::Imf, resp)?;
        let body: DataMapperResponse = resp
            .json()
            .await
            .map_err(|err| FedError::decode(Provider::Imf, err.to_string()))?;

        let Some(by_country) = body.values.get(&indicator) else {
            return Err(FedError::not_available(
                Provider::Imf,
                format!(
                    "'{indicator}' is not a DataMapper indicator code; expected a WEO code \
                     such as NGDP_RPCH or GGXWDG_NGDP"
                ),
            ));
        };

        let unit = indicator_unit(&indicator);
        let start_year = req.start_date.map(|d| d.format("%Y").to_string());
        let end_year = req.end_date.map(|d| d.format("%Y").to_string());

        let mut out = Vec::new();
        let mut missing = Vec::new();
        for iso2 in &countries {
            let iso3 = CountryResolver::to_iso3(iso2)
                .map(str::to_string)
                .unwrap_or_else(|| iso2.to_ascii_uppercase());
            let Some(year_map) = by_country.get(&iso3) else {
                missing.push(iso3);
                continue;
            };
            let mut points: Vec<Point> = year_map
                .iter()
                .filter(|(year, _)| {
                    start_year.as_ref().is_none_or(|s| *year >= s)
                        && end_year.as_ref().is_none_or(|e| *year <= e)
                })
                .filter_map(|(year, value)| {
                    parse_period(year).map(|date| Point::new(date, Some(*value)))
                })
                .collect();
            let corrected = normalize_percent(&mut points, unit);

            let country_display = CountryResolver::display_name(iso2)
                .map(str::to_string)
                .unwrap_or_else(|| iso3.clone());
            let mut meta = SeriesMeta::new(
                Provider::Imf,
                indicator.clone(),
                country_display,
                format!("{indicator}/{iso3}"),
                Frequency::Annual,
                unit,
            );
            meta.api_url = url.clone();
            meta.source_url = format!(
                "https://www.imf.org/external/datamapper/{indicator}@WEO/{iso3}"
            );
            if corrected {
                meta.notes =
                    Some("values rescaled from decimal fractions to percent".to_string());
            }
            out.push(Series::new(meta, points));
        }

        if out.is_empty() {
            return Err(FedError::not_available(
                Provider::Imf,
                format!(
                    "IMF has indicator '{indicator}' but no data for {}; the code form is \
                     valid, the countries are simply not covered",
                    missing.join(", ")
                ),
            ));
        }
        if !missing.is_empty() {
            tracing::warn!(
                target: "econfed::imf",
                indicator = %indicator,
                missing = %missing.join(","),
                "some requested countries absent from DataMapper response"
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weo_codes_pass_through_uppercased() {
        let adapter = ImfAdapter::new();
        let req = FetchRequest {
            indicator: "ngdp_rpch".into(),
            ..FetchRequest::default()
        };
        assert_eq!(adapter.resolve_indicator(&req).unwrap(), "NGDP_RPCH");
    }

    #[test]
    fn common_terms_map_to_weo_codes() {
        let adapter = ImfAdapter::new();
        let req = FetchRequest {
            indicator: "government debt".into(),
            ..FetchRequest::default()
        };
        assert_eq!(adapter.resolve_indicator(&req).unwrap(), "GGXWDG_NGDP");
    }
}
