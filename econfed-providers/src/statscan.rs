//! Statistics Canada WDS adapter.
//!
//! StatsCan's Web Data Service is vector-oriented: a series is addressed
//! by a numeric vector id and fetched with a POST carrying the vector and
//! a period count. The adapter keeps a vector table for the common
//! indicators; anything else must arrive as a resolved numeric id.

use async_trait::async_trait;
use serde::Deserialize;

use econfed_core::adapter::ProviderAdapter;
use econfed_core::http::HttpPool;
use econfed_core::retry::check_response;
use econfed_core::timeseries::normalize::normalize_percent;
use econfed_core::timeseries::period::parse_period;
use econfed_types::{
    FedError, FetchRequest, Frequency, Point, Provider, Series, SeriesMeta,
};

const DEFAULT_BASE_URL: &str = "https://www150.statcan.gc.ca";

/// (term, vector id, label, unit, cadence)
const VECTOR_MAPPINGS: &[(&str, u64, &str, &str, Frequency)] = &[
    ("UNEMPLOYMENT_RATE", 2062815, "Unemployment rate", "Percent", Frequency::Monthly),
    ("UNEMPLOYMENT", 2062815, "Unemployment rate", "Percent", Frequency::Monthly),
    ("CPI", 41690914, "Consumer Price Index", "Index, 2002=100", Frequency::Monthly),
    ("INFLATION", 41690973, "Consumer Price Index, all-items", "Index, 2002=100", Frequency::Monthly),
    ("GDP", 65201210, "Gross domestic product at basic prices", "Millions of dollars", Frequency::Monthly),
    ("POPULATION", 1, "Population estimate", "Persons", Frequency::Quarterly),
];

#[derive(Debug, Deserialize)]
struct VectorDataPoint {
    #[serde(rename = "refPer")]
    ref_per: String,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct VectorObject {
    #[serde(rename = "vectorId")]
    vector_id: u64,
    #[serde(rename = "vectorDataPoint", default)]
    points: Vec<VectorDataPoint>,
}

#[derive(Debug, Deserialize)]
struct VectorEnvelope {
    #[serde(default)]
    status: String,
    object: Option<VectorObject>,
}

/// The Statistics Canada adapter.
pub struct StatsCanAdapter {
    base_url: String,
}

impl Default for StatsCanAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsCanAdapter {
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

    fn resolve_vector(
        &self,
        req: &FetchRequest,
    ) -> Result<(u64, &'static str, &'static str, Frequency), FedError> {
        if let Some(id) = req.series_id.as_deref()
            && let Ok(vector) = id.trim_start_matches('v').parse::<u64>()
        {
            let known = VECTOR_MAPPINGS.iter().find(|(_, v, ..)| *v == vector);
            return Ok(match known {
                Some((_, v, label, unit, freq)) => (*v, *label, *unit, *freq),
                None => (vector, "Statistics Canada series", "", Frequency::Monthly),
            });
        }
        let key = req
            .indicator
            .trim()
            .to_ascii_uppercase()
            .replace([' ', '-'], "_");
        if let Some((_, vector, label, unit, freq)) =
            VECTOR_MAPPINGS.iter().find(|(term, ..)| *term == key)
        {
            return Ok((*vector, label, unit, *freq));
        }
        if let Ok(vector) = key.trim_start_matches('V').parse::<u64>() {
            return Ok((vector, "Statistics Canada series", "", Frequency::Monthly));
        }
        Err(FedError::not_available(
            Provider::StatsCan,
            format!(
                "could not map '{}' to a StatsCan vector id",
                req.indicator
            ),
        ))
    }

    /// Periods to request for a window at a cadence.
    fn latest_n(freq: Frequency, years: u32) -> u32 {
        let per_year = match freq {
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
            _ => 1,
        };
        (years.max(1) * per_year).min(600)
    }
}

#[async_trait]
impl ProviderAdapter for StatsCanAdapter {
    fn provider(&self) -> Provider {
        Provider::StatsCan
    }

    async fn fetch(&self, req: &FetchRequest) -> Result<Vec<Series>, FedError> {
        let (vector, label, unit, frequency) = self.resolve_vector(req)?;

        let years = match (req.start_date, req.end_date) {
            (Some(start), Some(end)) => {
                let span = end.format("%Y").to_string().parse::<i64>().unwrap_or(0)
                    - start.format("%Y").to_string().parse::<i64>().unwrap_or(0);
                u32::try_from(span.max(1)).unwrap_or(10)
            }
            _ => 10,
        };
        let latest_n = Self::latest_n(frequency, years);

        let url = format!(
            "{}/t1/wds/rest/getDataFromVectorsAndLatestNPeriods",
            self.base_url
        );
        let payload = serde_json::json!([{ "vectorId": vector, "latestN": latest_n }]);
        let resp = HttpPool::client()
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| FedError::Transport(format!("StatsCan request failed: {err}")))?;
        let resp = check_response(Provider::StatsCan, resp)?;
        let envelopes: Vec<VectorEnvelope> = resp
            .json()
            .await
            .map_err(|err| FedError::decode(Provider::StatsCan, err.to_string()))?;

        let Some(object) = envelopes
            .into_iter()
            .find(|e| e.status == "SUCCESS")
            .and_then(|e| e.object)
        else {
            return Err(FedError::not_available(
                Provider::StatsCan,
                format!("vector v{vector} returned no data"),
            ));
        };

        let mut points: Vec<Point> = object
            .points
            .iter()
            .filter_map(|p| {
                let date = parse_period(&p.ref_per)?;
                // Honor the requested window; WDS only supports "latest N".
                if let Some(start) = req.start_date
                    && date < start
                {
                    return None;
                }
                if let Some(end) = req.end_date
                    && date > end
                {
                    return None;
                }
                Some(Point::new(date, p.value))
            })
            .collect();
        if points.is_empty() {
            return Err(FedError::not_available(
                Provider::StatsCan,
                format!("vector v{vector} has no observations in the requested window"),
            ));
        }
        let corrected = normalize_percent(&mut points, unit);

        let mut meta = SeriesMeta::new(
            Provider::StatsCan,
            label,
            "Canada",
            format!("v{}", object.vector_id),
            frequency,
            unit,
        );
        meta.api_url = url;
        meta.source_url = "https://www150.statcan.gc.ca/n1/en/type/data".to_string();
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
    fn terms_map_to_vectors() {
        let adapter = StatsCanAdapter::new();
        let req = FetchRequest {
            indicator: "unemployment rate".into(),
            ..FetchRequest::default()
        };
        let (vector, _, unit, freq) = adapter.resolve_vector(&req).unwrap();
        assert_eq!(vector, 2062815);
        assert_eq!(unit, "Percent");
        assert_eq!(freq, Frequency::Monthly);
    }

    #[test]
    fn numeric_vector_ids_pass_through() {
        let adapter = StatsCanAdapter::new();
        let req = FetchRequest {
            indicator: "v123456".into(),
            ..FetchRequest::default()
        };
        let (vector, ..) = adapter.resolve_vector(&req).unwrap();
        assert_eq!(vector, 123456);
    }

    #[test]
    fn latest_n_scales_with_cadence() {
        assert_eq!(StatsCanAdapter::latest_n(Frequency::Monthly, 10), 120);
        assert_eq!(StatsCanAdapter::latest_n(Frequency::Quarterly, 10), 40);
        assert_eq!(StatsCanAdapter::latest_n(Frequency::Annual, 10), 10);
    }
}
