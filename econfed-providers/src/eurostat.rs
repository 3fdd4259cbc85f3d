//! Eurostat dissemination API adapter (JSON-stat 2.0).
//!
//! Datasets come from `/statistics/1.0/data/{dataset}` with `geo`, `freq`
//! and `sinceTimePeriod` filters. Decoding goes through the shared
//! JSON-stat codec; datasets with a `unit` dimension get the contextually
//! correct slice (percentage-of-active-population for unemployment rather
//! than thousands of persons).

use std::collections::BTreeMap;

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

use crate::jsonstat::JsonStatDataset;

const DEFAULT_BASE_URL: &str = "https://ec.europa.eu/eurostat/api/dissemination";

const DATASET_MAPPINGS: &[(&str, &str)] = &[
    ("GDP", "nama_10_gdp"),
    ("GDP_GROWTH", "nama_10_gdp"),
    ("GDP_PER_CAPITA", "nama_10_pc"),
    ("UNEMPLOYMENT", "une_rt_a"),
    ("UNEMPLOYMENT_RATE", "une_rt_a"),
    ("INFLATION", "prc_hicp_aind"),
    ("CPI", "prc_hicp_aind"),
    ("HICP", "prc_hicp_aind"),
    ("GOVERNMENT_DEBT", "gov_10q_ggdebt"),
    ("HOUSE_PRICES", "prc_hpi_a"),
    ("HOUSE_PRICE_INDEX", "prc_hpi_a"),
    ("POPULATION", "demo_pjan"),
    ("TRADE_BALANCE", "tet00034"),
    ("INTEREST_RATE", "EI_MFIR_M"),
];

/// Preferred unit category per dataset. `une_rt_a` must read the
/// percentage-of-active-population slice, not thousands of persons.
fn preferred_units(dataset: &str) -> &'static [&'static str] {
    match dataset {
        "une_rt_a" => &["PC_ACT", "PC"],
        "gov_10q_ggdebt" => &["PC_GDP"],
        "prc_hicp_aind" => &["RCH_A_AVG", "INX_A_AVG"],
        _ => &[],
    }
}

fn dataset_unit_fallback(dataset: &str) -> &'static str {
    match dataset {
        "une_rt_a" => "Percentage of active population",
        "gov_10q_ggdebt" => "Percent of GDP",
        "prc_hicp_aind" | "prc_hpi_a" => "Index",
        "demo_pjan" => "Persons",
        "nama_10_gdp" | "nama_10_pc" => "Million euro",
        "EI_MFIR_M" => "Percent per annum",
        _ => "",
    }
}

/// The Eurostat adapter.
pub struct EurostatAdapter {
    base_url: String,
}

impl Default for EurostatAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl EurostatAdapter {
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

    fn resolve_dataset(&self, req: &FetchRequest) -> Result<String, FedError> {
        if let Some(code) = req.series_id.as_deref() {
            return Ok(code.to_string());
        }
        let key = req
            .indicator
            .trim()
            .to_ascii_uppercase()
            .replace([' ', '-'], "_");
        if let Some((_, dataset)) = DATASET_MAPPINGS.iter().find(|(term, _)| *term == key) {
            return Ok((*dataset).to_string());
        }
        // Dataset codes are lowercase with underscores (une_rt_a).
        let compact = req.indicator.trim();
        if compact
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && compact.contains('_')
        {
            return Ok(compact.to_string());
        }
        Err(FedError::not_available(
            Provider::Eurostat,
            format!("could not map '{}' to a Eurostat dataset", req.indicator),
        ))
    }

    async fn fetch_country(
        &self,
        dataset: &str,
        iso2: &str,
        req: &FetchRequest,
    ) -> Result<Series, FedError> {
        let mut url = format!(
            "{}/statistics/1.0/data/{}?format=JSON&lang=EN&geo={}",
            self.base_url, dataset, iso2,
        );
        if let Some(start) = req.start_date {
            url.push_str(&format!("&sinceTimePeriod={}", start.format("%Y")));
        }
        for (dim, value) in &req.dimensions {
            url.push_str(&format!("&{dim}={value}"));
        }

        let resp = HttpPool::client()
            .get(&url)
            .send()
            .await
            .map_err(|err| FedError::Transport(format!("Eurostat request failed: {err}")))?;
        let resp = check_response(Provider::Eurostat, resp)?;
        let body = resp
            .text()
            .await
            .map_err(|err| FedError::Transport(format!("Eurostat body read failed: {err}")))?;
        let decoded = JsonStatDataset::parse(Provider::Eurostat, &body)?;

        // Pin the unit dimension to the contextually correct slice.
        let mut pinned: BTreeMap<String, usize> = BTreeMap::new();
        let mut unit_label = dataset_unit_fallback(dataset).to_string();
        for preferred in preferred_units(dataset) {
            if let Some(index) = decoded.category_index("unit", preferred) {
                pinned.insert("unit".to_string(), index);
                if let Some(label) = decoded.category_label("unit", preferred) {
                    unit_label = label.to_string();
                }
                break;
            }
        }
        // Pin geo when the response still carries several.
        if let Some(geo_index) = decoded.category_index("geo", iso2) {
            pinned.insert("geo".to_string(), geo_index);
        }

        let slice = decoded.time_slice(&pinned);
        if slice.iter().all(|(_, v)| v.is_none()) {
            return Err(FedError::not_available(
                Provider::Eurostat,
                format!("dataset '{dataset}' has no observations for {iso2}"),
            ));
        }

        let frequency = slice
            .first()
            .map(|(label, _)| infer_frequency(label))
            .unwrap_or(Frequency::Annual);
        let mut points: Vec<Point> = slice
            .into_iter()
            .filter_map(|(label, value)| parse_period(&label).map(|d| Point::new(d, value)))
            .collect();
        let corrected = normalize_percent(&mut points, &unit_label);

        let country_display = CountryResolver::display_name(iso2)
            .map(str::to_string)
            .unwrap_or_else(|| iso2.to_string());
        let mut meta = SeriesMeta::new(
            Provider::Eurostat,
            decoded
                .label
                .clone()
                .unwrap_or_else(|| dataset.to_string()),
            country_display,
            dataset.to_string(),
            frequency,
            unit_label,
        );
        meta.api_url = url;
        meta.source_url = format!(
            "https://ec.europa.eu/eurostat/databrowser/view/{dataset}/default/table"
        );
        if corrected {
            meta.notes = Some("values rescaled from decimal fractions to percent".to_string());
        }
        Ok(Series::new(meta, points))
    }
}

fn infer_frequency(time_label: &str) -> Frequency {
    let upper = time_label.to_ascii_uppercase();
    if upper.contains('Q') {
        Frequency::Quarterly
    } else if upper.contains('M') || upper.matches('-').count() == 1 {
        Frequency::Monthly
    } else {
        Frequency::Annual
    }
}

#[async_trait]
impl ProviderAdapter for EurostatAdapter {
    fn provider(&self) -> Provider {
        Provider::Eurostat
    }

    fn default_range_years(&self) -> u32 {
        5
    }

    async fn fetch(&self, req: &FetchRequest) -> Result<Vec<Series>, FedError> {
        let dataset = self.resolve_dataset(req)?;
        let countries = if req.countries.is_empty() {
            vec!["DE".to_string()]
        } else {
            req.countries.clone()
        };

        let mut out = Vec::new();
        let mut errors = Vec::new();
        for iso2 in &countries {
            let iso2 = iso2.to_ascii_uppercase();
            match self.fetch_country(&dataset, &iso2, req).await {
                Ok(series) => out.push(series),
                Err(err) => {
                    tracing::warn!(
                        target: "econfed::eurostat",
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
                    Provider::Eurostat,
                    format!("dataset '{dataset}' returned no data"),
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
    fn terms_map_to_dataset_codes() {
        let adapter = EurostatAdapter::new();
        let req = FetchRequest {
            indicator: "unemployment rate".into(),
            ..FetchRequest::default()
        };
        assert_eq!(adapter.resolve_dataset(&req).unwrap(), "une_rt_a");
    }

    #[test]
    fn raw_dataset_codes_pass_through() {
        let adapter = EurostatAdapter::new();
        let req = FetchRequest {
            indicator: "prc_hicp_midx".into(),
            ..FetchRequest::default()
        };
        assert_eq!(adapter.resolve_dataset(&req).unwrap(), "prc_hicp_midx");
    }

    #[test]
    fn frequency_inferred_from_time_labels() {
        assert_eq!(infer_frequency("2020-Q2"), Frequency::Quarterly);
        assert_eq!(infer_frequency("2020-07"), Frequency::Monthly);
        assert_eq!(infer_frequency("2020"), Frequency::Annual);
    }

    #[test]
    fn unemployment_prefers_the_active_population_unit() {
        assert_eq!(preferred_units("une_rt_a")[0], "PC_ACT");
    }
}
