//! World Bank open data adapter.
//!
//! The World Bank REST API returns a two-element top-level array
//! `[meta, records]` and paginates via `page`/`pages` in the meta object.
//! Multiple countries go up as a semicolon-joined key list and come back
//! interleaved; the adapter groups records per country and returns one
//! canonical series each, in request order.

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

const DEFAULT_BASE_URL: &str = "https://api.worldbank.org";
const PER_PAGE: u32 = 1000;

const TERM_FALLBACKS: &[(&str, &str)] = &[
    ("GDP", "NY.GDP.MKTP.CD"),
    ("GDP_GROWTH", "NY.GDP.MKTP.KD.ZG"),
    ("GDP_PER_CAPITA", "NY.GDP.PCAP.CD"),
    ("UNEMPLOYMENT", "SL.UEM.TOTL.ZS"),
    ("UNEMPLOYMENT_RATE", "SL.UEM.TOTL.ZS"),
    ("INFLATION", "FP.CPI.TOTL.ZG"),
    ("POPULATION", "SP.POP.TOTL"),
    ("INTEREST_RATE", "FR.INR.RINR"),
];

#[derive(Debug, Deserialize)]
struct PageMeta {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    pages: u32,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    #[serde(default)]
    id: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Record {
    indicator: NamedRef,
    country: NamedRef,
    #[serde(default)]
    countryiso3code: String,
    date: String,
    value: Option<f64>,
    #[serde(default)]
    unit: String,
}

/// The World Bank adapter.
pub struct WorldBankAdapter {
    base_url: String,
}

impl Default for WorldBankAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldBankAdapter {
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
            return Ok(code.to_string());
        }
        let key = req
            .indicator
            .trim()
            .to_ascii_uppercase()
            .replace([' ', '-'], "_");
        if let Some((_, code)) = TERM_FALLBACKS.iter().find(|(term, _)| *term == key) {
            return Ok((*code).to_string());
        }
        // World Bank codes are dot-separated uppercase segments.
        let compact = req.indicator.trim();
        if compact.contains('.') && compact.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Ok(compact.to_ascii_uppercase());
        }
        Err(FedError::not_available(
            Provider::WorldBank,
            format!("could not map '{}' to a World Bank indicator code", req.indicator),
        ))
    }

    /// Unit inferred from the indicator label: the World Bank encodes it in
    /// the name parenthetical ("GDP growth (annual %)").
    fn infer_unit(indicator_name: &str, record_unit: &str) -> String {
        if !record_unit.is_empty() {
            return record_unit.to_string();
        }
        if let Some(open) = indicator_name.rfind('(')
            && let Some(close) = indicator_name[open..].find(')')
        {
            return indicator_name[open + 1..open + close].to_string();
        }
        String::new()
    }

    async fn fetch_all_pages(&self, url_base: &str) -> Result<Vec<Record>, FedError> {
        let mut records = Vec::new();
        let mut page = 1u32;
        loop {
            let url = format!("{url_base}&page={page}");
            let resp = HttpPool::client()
                .get(&url)
                .send()
                .await
                .map_err(|err| FedError::Transport(format!("World Bank request failed: {err}")))?;
            let resp = check_response(Provider::WorldBank, resp)?;
            let body: serde_json::Value = resp
                .json()
                .await
                .map_err(|err| FedError::decode(Provider::WorldBank, err.to_string()))?;

            // The API signals errors as a one-element array with a message
            // object instead of the [meta, records] pair.
            let array = body.as_array().ok_or_else(|| {
                FedError::decode(Provider::WorldBank, "expected a top-level JSON array")
            })?;
            if array.len() < 2 {
                let message = array
                    .first()
                    .and_then(|m| m.get("message"))
                    .and_then(|m| m.get(0))
                    .and_then(|m| m.get("value"))
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("empty response");
                return Err(FedError::not_available(
                    Provider::WorldBank,
                    format!("World Bank returned no data: {message}"),
                ));
            }

            let meta: PageMeta = serde_json::from_value(array[0].clone())
                .map_err(|err| FedError::decode(Provider::WorldBank, err.to_string()))?;
            if !array[1].is_null() {
                let page_records: Vec<Record> = serde_json::from_value(array[1].clone())
                    .map_err(|err| FedError::decode(Provider::WorldBank, err.to_string()))?;
                records.extend(page_records);
            }

            if meta.page >= meta.pages || meta.pages == 0 {
                break;
            }
            page += 1;
        }
        Ok(records)
    }
}

#[async_trait]
impl ProviderAdapter for WorldBankAdapter {
    fn provider(&self) -> Provider {
        Provider::WorldBank
    }

    async fn fetch(&self, req: &FetchRequest) -> Result<Vec<Series>, FedError> {
        let indicator = self.resolve_indicator(req)?;
        let countries = if req.countries.is_empty() {
            vec!["US".to_string()]
        } else {
            req.countries.clone()
        };
        let country_key = countries.join(";");

        let mut url_base = format!(
            "{}/v2/country/{}/indicator/{}?format=json&per_page={}",
            self.base_url, country_key, indicator, PER_PAGE,
        );
        if let (Some(start), Some(end)) = (req.start_date, req.end_date) {
            url_base.push_str(&format!(
                "&date={}:{}",
                start.format("%Y"),
                end.format("%Y")
            ));
        }

        let records = self.fetch_all_pages(&url_base).await?;
        if records.is_empty() {
            return Err(FedError::not_available(
                Provider::WorldBank,
                format!("no records for indicator '{indicator}'"),
            ));
        }

        // Group per country, preserving the request's country order.
        let mut grouped: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
        for record in &records {
            grouped
                .entry(record.countryiso3code.clone())
                .or_default()
                .push(record);
        }

        let mut out = Vec::new();
        for iso2 in &countries {
            let iso3 = CountryResolver::to_iso3(iso2)
                .map(str::to_string)
                .unwrap_or_else(|| iso2.to_ascii_uppercase());
            let Some(group) = grouped.get(&iso3) else {
                tracing::warn!(
                    target: "econfed::worldbank",
                    country = %iso2,
                    indicator = %indicator,
                    "no records for requested country"
                );
                continue;
            };
            let first = group[0];
            let unit = Self::infer_unit(&first.indicator.value, &first.unit);
            let mut points: Vec<Point> = group
                .iter()
                .filter_map(|r| {
                    parse_period(&r.date).map(|date| Point::new(date, r.value))
                })
                .collect();
            let corrected = normalize_percent(&mut points, &unit);

            let mut meta = SeriesMeta::new(
                Provider::WorldBank,
                first.indicator.value.clone(),
                first.country.value.clone(),
                iso3.clone(),
                Frequency::Annual,
                unit,
            );
            meta.api_url = format!("{url_base}&page=1");
            meta.source_url = format!(
                "https://data.worldbank.org/indicator/{}?locations={iso2}",
                first.indicator.id
            );
            if corrected {
                meta.notes =
                    Some("values rescaled from decimal fractions to percent".to_string());
            }
            out.push(Series::new(meta, points));
        }

        if out.is_empty() {
            return Err(FedError::not_available(
                Provider::WorldBank,
                format!(
                    "indicator '{indicator}' returned no data for {}",
                    countries.join(", ")
                ),
            ));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_codes_pass_through() {
        let adapter = WorldBankAdapter::new();
        let req = FetchRequest {
            indicator: "NY.GDP.MKTP.KD.ZG".into(),
            ..FetchRequest::default()
        };
        assert_eq!(adapter.resolve_indicator(&req).unwrap(), "NY.GDP.MKTP.KD.ZG");
    }

    #[test]
    fn unit_comes_from_the_name_parenthetical() {
        assert_eq!(
            WorldBankAdapter::infer_unit("GDP growth (annual %)", ""),
            "annual %"
        );
        assert_eq!(WorldBankAdapter::infer_unit("Population, total", ""), "");
        assert_eq!(WorldBankAdapter::infer_unit("Anything", "USD"), "USD");
    }
}
