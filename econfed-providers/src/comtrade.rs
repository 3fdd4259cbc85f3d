//! UN Comtrade adapter.
//!
//! Trade flows are typed by reporter, partner, commodity (HS code), and
//! flow direction. Two quirks carry real contract weight: region partners
//! ("EU") expand through the country resolver into one query per member,
//! and non-reporting territories (Taiwan, codes 158/490) cannot be queried
//! as reporter; the adapter flips to partner perspective over the major
//! trading partners with the flow direction inverted.

use async_trait::async_trait;
use serde::Deserialize;

use econfed_catalog::{CodeFormat, CountryResolver};
use econfed_core::adapter::ProviderAdapter;
use econfed_core::http::{HttpPool, mask_secrets};
use econfed_core::retry::check_response;
use econfed_core::timeseries::normalize::dedup_keep_max_magnitude;
use econfed_core::timeseries::period::parse_period;
use econfed_types::{
    FedError, FetchRequest, Frequency, Point, Provider, Series, SeriesMeta, TradeFlow,
};

const DEFAULT_BASE_URL: &str = "https://comtradeapi.un.org";

/// UN numeric code Comtrade uses for Taiwan in partner position
/// ("Other Asia, not elsewhere specified").
const TAIWAN_PARTNER_CODE: &str = "490";
/// ISO numeric for Taiwan, also seen in caller input.
const TAIWAN_ISO_NUMERIC: &str = "158";

/// Major trading partners queried when Taiwan must be read from the
/// partner perspective.
const TAIWAN_MAJOR_PARTNERS: &[&str] = &["CN", "US", "JP", "KR", "HK", "SG"];

#[derive(Debug, Deserialize)]
struct TradeRecord {
    #[serde(rename = "refYear")]
    ref_year: Option<i32>,
    #[serde(rename = "period", default)]
    period: Option<serde_json::Value>,
    #[serde(rename = "reporterDesc", default)]
    reporter_desc: String,
    #[serde(rename = "partnerDesc", default)]
    partner_desc: String,
    #[serde(rename = "flowCode", default)]
    flow_code: String,
    #[serde(rename = "cmdCode", default)]
    cmd_code: String,
    #[serde(rename = "primaryValue")]
    primary_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TradeResponse {
    #[serde(default)]
    data: Vec<TradeRecord>,
}

/// The UN Comtrade adapter.
pub struct ComtradeAdapter {
    api_key: Option<String>,
    base_url: String,
}

impl ComtradeAdapter {
    /// Build with an optional subscription key.
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

    /// Map a country name/code to the UN numeric code Comtrade expects.
    fn country_code(input: &str) -> Result<String, FedError> {
        let trimmed = input.trim();
        if trimmed.chars().all(|c| c.is_ascii_digit()) && !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
        CountryResolver::to_un_numeric(trimmed).ok_or_else(|| {
            FedError::invalid_input(format!("unknown Comtrade country: '{trimmed}'"))
        })
    }

    /// Expand a partner label: a region expands to its member list in UN
    /// numeric codes, a country maps to a single code.
    fn expand_partner(partner: &str) -> Result<Vec<String>, FedError> {
        if let Some(members) = CountryResolver::expand_region(partner, CodeFormat::UnNumeric) {
            return Ok(members);
        }
        Self::country_code(partner).map(|code| vec![code])
    }

    /// Period list for a year range: annual periods are bare years.
    fn periods(start_year: i32, end_year: i32) -> String {
        (start_year..=end_year)
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn is_taiwan(code: &str) -> bool {
        code == TAIWAN_PARTNER_CODE || code == TAIWAN_ISO_NUMERIC
    }

    async fn fetch_single(
        &self,
        reporter_code: &str,
        partner_code: Option<&str>,
        flow: TradeFlow,
        commodity: &str,
        periods: &str,
    ) -> Result<Vec<TradeRecord>, FedError> {
        let mut url = format!(
            "{}/data/v1/get/C/A/HS?reporterCode={}&period={}&flowCode={}&cmdCode={}",
            self.base_url,
            reporter_code,
            periods,
            flow.code(),
            commodity,
        );
        if let Some(partner) = partner_code {
            url.push_str(&format!("&partnerCode={partner}"));
        }
        if let Some(key) = self.api_key.as_deref() {
            url.push_str(&format!("&subscription-key={key}"));
        }

        let resp = HttpPool::client()
            .get(&url)
            .send()
            .await
            .map_err(|err| FedError::Transport(format!("Comtrade request failed: {err}")))?;
        let resp = check_response(Provider::Comtrade, resp)?;
        let body: TradeResponse = resp
            .json()
            .await
            .map_err(|err| FedError::decode(Provider::Comtrade, err.to_string()))?;
        Ok(body.data)
    }

    fn records_to_series(
        &self,
        records: Vec<TradeRecord>,
        country_display: String,
        indicator: String,
        flow: TradeFlow,
        api_url: String,
    ) -> Option<Series> {
        if records.is_empty() {
            return None;
        }
        // Revisions share the (period, flow, commodity) key; the largest
        // magnitude supersedes earlier estimates.
        let deduped = dedup_keep_max_magnitude(
            records,
            |r| {
                (
                    r.ref_year,
                    r.period.as_ref().map(ToString::to_string),
                    r.flow_code.clone(),
                    r.cmd_code.clone(),
                )
            },
            |r| r.primary_value.unwrap_or(0.0),
        );
        let points: Vec<Point> = deduped
            .iter()
            .filter_map(|r| {
                let period = r
                    .ref_year
                    .map(|y| y.to_string())
                    .or_else(|| r.period.as_ref().map(ToString::to_string))?;
                let date = parse_period(period.trim_matches('"'))?;
                Some(Point::new(date, r.primary_value))
            })
            .collect();
        if points.is_empty() {
            return None;
        }

        let mut meta = SeriesMeta::new(
            Provider::Comtrade,
            indicator,
            country_display,
            format!("C/A/HS/{}", flow.code()),
            Frequency::Annual,
            "US dollars",
        );
        meta.api_url = mask_secrets(&api_url);
        meta.source_url = "https://comtradeplus.un.org".to_string();
        Some(Series::new(meta, points))
    }
}

#[async_trait]
impl ProviderAdapter for ComtradeAdapter {
    fn provider(&self) -> Provider {
        Provider::Comtrade
    }

    fn default_range_years(&self) -> u32 {
        10
    }

    async fn fetch(&self, req: &FetchRequest) -> Result<Vec<Series>, FedError> {
        let reporter_raw = req
            .reporter
            .clone()
            .or_else(|| req.first_country().map(str::to_string))
            .ok_or_else(|| {
                FedError::invalid_input("Comtrade queries need a reporter country")
            })?;
        let reporter_code = Self::country_code(&reporter_raw)?;
        let flow = req.flow.unwrap_or(TradeFlow::Export);
        let commodity = req.commodity.clone().unwrap_or_else(|| "TOTAL".to_string());

        let end_year = req
            .end_date
            .map_or(2024, |d| d.format("%Y").to_string().parse().unwrap_or(2024));
        let start_year = req
            .start_date
            .map_or(end_year - 9, |d| {
                d.format("%Y").to_string().parse().unwrap_or(end_year - 9)
            });
        let periods = Self::periods(start_year, end_year);

        // Non-reporting territory: read Taiwan's trade from its partners'
        // books, with the flow inverted (Taiwan exports are partner
        // imports from Taiwan).
        if Self::is_taiwan(&reporter_code) {
            let flipped = flow.flipped();
            tracing::info!(
                target: "econfed::comtrade",
                flow = ?flipped,
                "Taiwan is a non-reporting territory; querying partner perspective"
            );
            let mut out = Vec::new();
            for partner_iso2 in TAIWAN_MAJOR_PARTNERS {
                let partner_reporter = Self::country_code(partner_iso2)?;
                let records = self
                    .fetch_single(
                        &partner_reporter,
                        Some(TAIWAN_PARTNER_CODE),
                        flipped,
                        &commodity,
                        &periods,
                    )
                    .await?;
                let display = CountryResolver::display_name(partner_iso2)
                    .map(str::to_string)
                    .unwrap_or_else(|| (*partner_iso2).to_string());
                let indicator = match flow {
                    TradeFlow::Export => format!("Taiwan exports to {display}"),
                    TradeFlow::Import => format!("Taiwan imports from {display}"),
                };
                let api_url = format!(
                    "{}/data/v1/get/C/A/HS?reporterCode={}&partnerCode={}&flowCode={}",
                    self.base_url,
                    partner_reporter,
                    TAIWAN_PARTNER_CODE,
                    flipped.code()
                );
                if let Some(series) =
                    self.records_to_series(records, display, indicator, flipped, api_url)
                {
                    out.push(series);
                }
            }
            if out.is_empty() {
                return Err(FedError::not_available(
                    Provider::Comtrade,
                    "no partner-perspective data found for Taiwan".to_string(),
                ));
            }
            return Ok(out);
        }

        // Partner expansion: regions become one query per member country.
        let partner_codes: Vec<Option<String>> = match req.partner.as_deref() {
            Some(partner) => Self::expand_partner(partner)?
                .into_iter()
                .map(Some)
                .collect(),
            None => vec![None],
        };
        if partner_codes.is_empty() {
            return Err(FedError::invalid_input(format!(
                "partner '{}' resolved to no countries",
                req.partner.as_deref().unwrap_or_default()
            )));
        }

        let mut out = Vec::new();
        for partner_code in &partner_codes {
            let records = self
                .fetch_single(
                    &reporter_code,
                    partner_code.as_deref(),
                    flow,
                    &commodity,
                    &periods,
                )
                .await?;
            let display = records
                .first()
                .map(|r| {
                    if partner_code.is_some() && !r.partner_desc.is_empty() {
                        r.partner_desc.clone()
                    } else {
                        r.reporter_desc.clone()
                    }
                })
                .unwrap_or_else(|| reporter_raw.clone());
            let indicator = match flow {
                TradeFlow::Export => "Merchandise exports".to_string(),
                TradeFlow::Import => "Merchandise imports".to_string(),
            };
            let api_url = format!(
                "{}/data/v1/get/C/A/HS?reporterCode={}&flowCode={}&cmdCode={}",
                self.base_url,
                reporter_code,
                flow.code(),
                commodity
            );
            if let Some(series) =
                self.records_to_series(records, display, indicator, flow, api_url)
            {
                out.push(series);
            }
        }

        if out.is_empty() {
            return Err(FedError::not_available(
                Provider::Comtrade,
                format!(
                    "no trade records for reporter {reporter_raw} in {start_year}-{end_year}; \
                     recent years may not be reported yet"
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
    fn country_codes_resolve_to_un_numeric() {
        assert_eq!(ComtradeAdapter::country_code("Canada").unwrap(), "124");
        assert_eq!(ComtradeAdapter::country_code("US").unwrap(), "840");
        assert_eq!(ComtradeAdapter::country_code("842").unwrap(), "842");
        assert!(ComtradeAdapter::country_code("Atlantis").is_err());
    }

    #[test]
    fn eu_partner_expands_to_member_list() {
        let members = ComtradeAdapter::expand_partner("EU").unwrap();
        assert_eq!(members.len(), 27);
        assert!(members.contains(&"276".to_string())); // Germany
    }

    #[test]
    fn taiwan_codes_are_detected() {
        assert!(ComtradeAdapter::is_taiwan("158"));
        assert!(ComtradeAdapter::is_taiwan("490"));
        assert!(!ComtradeAdapter::is_taiwan("840"));
        assert_eq!(ComtradeAdapter::country_code("Taiwan").unwrap(), "158");
    }

    #[test]
    fn period_lists_cover_the_range() {
        assert_eq!(ComtradeAdapter::periods(2020, 2022), "2020,2021,2022");
    }
}
