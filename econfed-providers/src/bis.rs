//! BIS Statistics adapter (SDMX-JSON).
//!
//! BIS dataflows are keyed `{FREQ}.{COUNTRY}` and served as SDMX-JSON
//! v1.0. Three contracts matter here: several dataflows exist at exactly
//! one cadence and the adapter forces it regardless of the caller's
//! request; coverage is a fixed country set and requests are partitioned
//! into supported/unsupported up front; and a dataflow query returns many
//! series, from which one is selected deterministically by the shared
//! preference scoring.

use async_trait::async_trait;

use econfed_core::adapter::ProviderAdapter;
use econfed_core::http::HttpPool;
use econfed_core::retry::check_response;
use econfed_core::timeseries::normalize::normalize_percent;
use econfed_core::timeseries::period::parse_period;
use econfed_types::{
    FedError, FetchRequest, Frequency, Point, Provider, Series, SeriesMeta,
};

use crate::sdmx;

const DEFAULT_BASE_URL: &str = "https://stats.bis.org/api/v1";
const SDMX_ACCEPT: &str = "application/vnd.sdmx.data+json;version=1.0.0";

/// Countries BIS publishes data for (ISO2), plus the euro-area aggregate.
/// Explicit coverage enables early rejection and clean fallback routing.
const SUPPORTED_COUNTRIES: &[&str] = &[
    "AE", "AR", "AT", "AU", "BE", "BG", "BR", "CA", "CH", "CL", "CN", "CO", "CZ", "DE", "DK",
    "EE", "EG", "ES", "FI", "FR", "GB", "GR", "HK", "HR", "HU", "ID", "IE", "IL", "IN", "IT",
    "JP", "KE", "KR", "LT", "LU", "LV", "MT", "MX", "MY", "NL", "NO", "NZ", "PH", "PL", "PT",
    "RO", "RU", "SA", "SE", "SG", "SI", "SK", "TH", "TR", "TW", "US", "VN", "ZA", "XM",
];

/// Term to dataflow mapping; only verified working dataflows.
const DATAFLOW_MAPPINGS: &[(&str, &str)] = &[
    ("POLICY_RATE", "WS_CBPOL"),
    ("INTEREST_RATE", "WS_CBPOL"),
    ("CENTRAL_BANK_POLICY_RATES", "WS_CBPOL"),
    ("TOTAL_CREDIT", "WS_TC"),
    ("CREDIT", "WS_TC"),
    ("CREDIT_TO_GDP", "WS_TC"),
    ("CREDIT_TO_PRIVATE_SECTOR", "WS_TC"),
    ("PRIVATE_SECTOR_CREDIT", "WS_TC"),
    ("HOUSEHOLD_DEBT", "WS_TC"),
    ("CORPORATE_DEBT", "WS_TC"),
    ("DEBT", "WS_TC"),
    ("DEBT_TO_GDP", "WS_TC"),
    ("PROPERTY_PRICES", "WS_SPP"),
    ("HOUSE_PRICES", "WS_SPP"),
    ("HOUSING_PRICES", "WS_SPP"),
    ("RESIDENTIAL_PROPERTY_PRICES", "WS_SPP"),
    ("REAL_ESTATE_PRICES", "WS_SPP"),
    ("EXCHANGE_RATE", "WS_XRU"),
    ("EFFECTIVE_EXCHANGE_RATES", "WS_XRU"),
    ("CPI", "WS_LONG_CPI"),
    ("INFLATION", "WS_LONG_CPI"),
    ("CONSUMER_PRICES", "WS_LONG_CPI"),
    ("DEBT_SERVICE_RATIO", "WS_DSR"),
    ("DEBT_SERVICE", "WS_DSR"),
    ("GLOBAL_LIQUIDITY", "WS_GLI"),
    ("LIQUIDITY", "WS_GLI"),
    ("DEBT_SECURITIES", "WS_DEBT_SEC2_PUB"),
    ("INTERNATIONAL_DEBT_SECURITIES", "WS_DEBT_SEC2_PUB"),
];

/// Indicators BIS does not publish; redirections feed the user-facing
/// suggestions on the resulting error.
const REDIRECTS: &[(&str, &str)] = &[
    ("PRODUCTIVITY", "OECD or WorldBank (SL.GDP.PCAP.EM.KD)"),
    ("LABOR_PRODUCTIVITY", "OECD or WorldBank (SL.GDP.PCAP.EM.KD)"),
    ("LABOUR_PRODUCTIVITY", "OECD or WorldBank (SL.GDP.PCAP.EM.KD)"),
    ("GDP", "WorldBank or IMF"),
    ("GDP_GROWTH", "WorldBank (NY.GDP.MKTP.KD.ZG) or IMF (NGDP_RPCH)"),
    ("UNEMPLOYMENT", "FRED (US) or WorldBank (SL.UEM.TOTL.ZS)"),
    ("UNEMPLOYMENT_RATE", "FRED (US) or WorldBank (SL.UEM.TOTL.ZS)"),
    ("UNIT_LABOR_COST", "OECD or Eurostat"),
];

/// Dataflows that exist at exactly one cadence.
const MONTHLY_DATAFLOWS: &[&str] = &["WS_CBPOL", "WS_LONG_CPI", "WS_XRU"];
const QUARTERLY_DATAFLOWS: &[&str] =
    &["WS_TC", "WS_SPP", "WS_DSR", "WS_GLI", "WS_DEBT_SEC2_PUB"];

fn dataflow_unit(dataflow: &str) -> &'static str {
    match dataflow {
        "WS_CBPOL" => "Percent per annum",
        "WS_TC" => "Percent of GDP",
        "WS_DSR" => "Percent",
        "WS_SPP" | "WS_XRU" | "WS_LONG_CPI" => "Index",
        "WS_GLI" | "WS_DEBT_SEC2_PUB" => "US dollars",
        _ => "",
    }
}

fn dataflow_label(dataflow: &str) -> &'static str {
    match dataflow {
        "WS_CBPOL" => "Central bank policy rate",
        "WS_TC" => "Credit to the private non-financial sector",
        "WS_SPP" => "Residential property prices",
        "WS_XRU" => "Effective exchange rate",
        "WS_LONG_CPI" => "Consumer prices",
        "WS_DSR" => "Debt service ratio",
        "WS_GLI" => "Global liquidity indicators",
        "WS_DEBT_SEC2_PUB" => "International debt securities",
        _ => "BIS statistics",
    }
}

/// The BIS adapter.
pub struct BisAdapter {
    base_url: String,
}

impl Default for BisAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl BisAdapter {
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

    /// Whether BIS covers a country.
    #[must_use]
    pub fn supports_country(iso2: &str) -> bool {
        SUPPORTED_COUNTRIES.contains(&iso2.to_ascii_uppercase().as_str())
    }

    fn resolve_dataflow(&self, req: &FetchRequest) -> Result<String, FedError> {
        if let Some(id) = req.series_id.as_deref() {
            let upper = id.to_ascii_uppercase();
            if upper.starts_with("WS_") {
                return Ok(upper);
            }
        }
        let key = req
            .indicator
            .trim()
            .to_ascii_uppercase()
            .replace([' ', '-'], "_");
        if key.starts_with("WS_") {
            return Ok(key);
        }
        if let Some((_, dataflow)) = DATAFLOW_MAPPINGS.iter().find(|(term, _)| *term == key) {
            return Ok((*dataflow).to_string());
        }
        if let Some((_, redirect)) = REDIRECTS.iter().find(|(term, _)| *term == key) {
            return Err(FedError::not_available_with(
                Provider::Bis,
                format!("BIS does not publish '{}'", req.indicator),
                vec![format!("Try {redirect} for this indicator.")],
            ));
        }
        Err(FedError::not_available(
            Provider::Bis,
            format!("could not map '{}' to a BIS dataflow", req.indicator),
        ))
    }

    /// The cadence a dataflow actually supports, ignoring the caller's
    /// request where the dataflow exists at a single frequency.
    fn effective_frequency(dataflow: &str, requested: Option<Frequency>) -> Frequency {
        if MONTHLY_DATAFLOWS.contains(&dataflow) {
            return Frequency::Monthly;
        }
        if QUARTERLY_DATAFLOWS.contains(&dataflow) {
            return Frequency::Quarterly;
        }
        requested.unwrap_or(Frequency::Monthly)
    }

    async fn fetch_country(
        &self,
        dataflow: &str,
        frequency: Frequency,
        iso2: &str,
        req: &FetchRequest,
    ) -> Result<Series, FedError> {
        let mut url = format!(
            "{}/data/{}/{}.{}",
            self.base_url,
            dataflow,
            frequency.code(),
            iso2,
        );
        let mut query = Vec::new();
        if let Some(start) = req.start_date {
            query.push(format!("startPeriod={}", start.format("%Y")));
        }
        if let Some(end) = req.end_date {
            query.push(format!("endPeriod={}", end.format("%Y")));
        }
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }

        let resp = HttpPool::client()
            .get(&url)
            .header("Accept", SDMX_ACCEPT)
            .send()
            .await
            .map_err(|err| FedError::Transport(format!("BIS request failed: {err}")))?;
        let resp = check_response(Provider::Bis, resp)?;
        let body = resp
            .text()
            .await
            .map_err(|err| FedError::Transport(format!("BIS body read failed: {err}")))?;

        let payload = sdmx::parse(Provider::Bis, &body)?;
        let preferences = sdmx::dataflow_preferences(dataflow);
        let Some((series_key, observations)) = sdmx::select_best_series(&payload, preferences)
        else {
            return Err(FedError::not_available(
                Provider::Bis,
                format!("BIS dataflow {dataflow} returned no observations for {iso2}"),
            ));
        };

        // Unit follows the selected series when the payload distinguishes
        // unit dimensions; otherwise the dataflow default applies.
        let unit = match sdmx::series_dimension_value(&payload, series_key, "UNIT_TYPE") {
            Some("770") => "Percent of GDP".to_string(),
            Some("USD") => "US dollars".to_string(),
            _ => dataflow_unit(dataflow).to_string(),
        };

        let mut points: Vec<Point> = sdmx::observations_in_time_order(&payload, observations)
            .into_iter()
            .filter_map(|(period, value)| parse_period(&period).map(|d| Point::new(d, value)))
            .collect();
        let corrected = normalize_percent(&mut points, &unit);

        let country_display = econfed_catalog::CountryResolver::display_name(iso2)
            .map(str::to_string)
            .unwrap_or_else(|| iso2.to_string());
        let mut meta = SeriesMeta::new(
            Provider::Bis,
            dataflow_label(dataflow),
            country_display,
            format!("{dataflow}/{series_key}"),
            frequency,
            unit,
        );
        meta.api_url = url;
        meta.source_url = "https://data.bis.org/topics".to_string();
        if corrected {
            meta.notes = Some("values rescaled from decimal fractions to percent".to_string());
        }
        Ok(Series::new(meta, points))
    }
}

#[async_trait]
impl ProviderAdapter for BisAdapter {
    fn provider(&self) -> Provider {
        Provider::Bis
    }

    fn default_range_years(&self) -> u32 {
        5
    }

    fn forced_frequency(&self, series_id: &str) -> Option<Frequency> {
        let upper = series_id.to_ascii_uppercase();
        let dataflow = upper.split('/').next().unwrap_or(&upper);
        if MONTHLY_DATAFLOWS.contains(&dataflow) {
            Some(Frequency::Monthly)
        } else if QUARTERLY_DATAFLOWS.contains(&dataflow) {
            Some(Frequency::Quarterly)
        } else {
            None
        }
    }

    async fn fetch(&self, req: &FetchRequest) -> Result<Vec<Series>, FedError> {
        let dataflow = self.resolve_dataflow(req)?;
        let frequency = Self::effective_frequency(&dataflow, req.frequency);

        let countries = if req.countries.is_empty() {
            vec!["US".to_string()]
        } else {
            req.countries.clone()
        };
        let (supported, unsupported): (Vec<_>, Vec<_>) = countries
            .iter()
            .map(|c| c.to_ascii_uppercase())
            .partition(|c| Self::supports_country(c));

        if supported.is_empty() {
            return Err(FedError::not_available_with(
                Provider::Bis,
                format!(
                    "BIS does not cover {}; it publishes for roughly 60 major economies",
                    unsupported.join(", ")
                ),
                vec![
                    "Try WorldBank or IMF, which have broader country coverage.".to_string(),
                ],
            ));
        }
        for skipped in &unsupported {
            tracing::warn!(
                target: "econfed::bis",
                country = %skipped,
                "country not covered by BIS, skipping"
            );
        }

        let mut out = Vec::new();
        let mut errors = Vec::new();
        for iso2 in &supported {
            match self.fetch_country(&dataflow, frequency, iso2, req).await {
                Ok(series) if !series.is_empty() => out.push(series),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        target: "econfed::bis",
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
                    Provider::Bis,
                    format!("BIS dataflow {dataflow} returned no data"),
                )
            }));
        }
        Ok(out)
    }
}
