//! SDMX-JSON decoding and deterministic best-series selection.
//!
//! SDMX-JSON keys each series by colon-separated dimension-value indices
//! ("0:0:1:0"); observations are time-indexed arrays whose first element is
//! the value. A dataflow query frequently returns *many* series (one per
//! dimension combination); [`select_best_series`] picks one
//! deterministically using a per-dataflow preference table.

use std::collections::BTreeMap;

use serde::Deserialize;

use econfed_types::{FedError, Provider};

/// A dimension value descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct SdmxDimensionValue {
    /// Value identifier (e.g. "US", "770").
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,
}

/// A series or observation dimension.
#[derive(Debug, Clone, Deserialize)]
pub struct SdmxDimension {
    /// Dimension identifier (e.g. "FREQ", "TC_BORROWERS", "TIME_PERIOD").
    pub id: String,
    /// Ordered values; series keys index into this list.
    #[serde(default)]
    pub values: Vec<SdmxDimensionValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SdmxDimensions {
    #[serde(default)]
    pub series: Vec<SdmxDimension>,
    #[serde(default)]
    pub observation: Vec<SdmxDimension>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SdmxStructure {
    pub dimensions: SdmxDimensions,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SdmxSeriesObject {
    /// Observation index (as a decimal string) to `[value, ...flags]`.
    #[serde(default)]
    pub observations: BTreeMap<String, Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SdmxDataSet {
    #[serde(default)]
    pub series: BTreeMap<String, SdmxSeriesObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SdmxData {
    #[serde(rename = "dataSets", default)]
    pub data_sets: Vec<SdmxDataSet>,
    pub structure: SdmxStructure,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SdmxEnvelope {
    pub data: SdmxData,
}

/// Decoded SDMX payload: the series map plus dimension metadata.
#[derive(Debug, Clone)]
pub struct SdmxPayload {
    /// Series keyed by colon-separated dimension indices, in key order.
    pub series: BTreeMap<String, BTreeMap<String, Vec<serde_json::Value>>>,
    /// Series dimensions, in key-position order.
    pub series_dimensions: Vec<SdmxDimension>,
    /// Time periods, in observation-index order.
    pub time_periods: Vec<String>,
}

/// Parse an SDMX-JSON body.
pub fn parse(provider: Provider, body: &str) -> Result<SdmxPayload, FedError> {
    let envelope: SdmxEnvelope = serde_json::from_str(body)
        .map_err(|err| FedError::decode(provider, format!("SDMX-JSON parse failure: {err}")))?;
    let data_set = envelope
        .data
        .data_sets
        .into_iter()
        .next()
        .ok_or_else(|| FedError::decode(provider, "SDMX response carries no dataSets"))?;
    let time_periods = envelope
        .data
        .structure
        .dimensions
        .observation
        .iter()
        .find(|d| d.id.eq_ignore_ascii_case("TIME_PERIOD"))
        .map(|d| d.values.iter().map(|v| v.id.clone()).collect())
        .unwrap_or_default();
    Ok(SdmxPayload {
        series: data_set
            .series
            .into_iter()
            .map(|(k, v)| (k, v.observations))
            .collect(),
        series_dimensions: envelope.data.structure.dimensions.series,
        time_periods,
    })
}

/// One preferred dimension value: (dimension id, preferred value id).
pub type Preference = (&'static str, &'static str);

/// Preference tables per BIS dataflow. Any preference match dominates
/// observation count; series without preferences fall back to "most data
/// wins".
#[must_use]
pub fn dataflow_preferences(dataflow: &str) -> &'static [Preference] {
    match dataflow {
        // Total credit: private non-financial borrowers, percent of GDP,
        // break-adjusted, market value.
        "WS_TC" => &[
            ("TC_BORROWERS", "P"),
            ("UNIT_TYPE", "770"),
            ("TC_ADJUST", "A"),
            ("VALUATION", "M"),
        ],
        // Property prices: real valuation, index unit.
        "WS_SPP" | "WS_CPP" | "WS_DPP" => &[("PP_VALUATION", "R"), ("UNIT_MEASURE", "628")],
        // Debt service ratios: private non-financial, adjusted.
        "WS_DSR" => &[("DSR_BORROWERS", "P"), ("DSR_ADJUST", "A")],
        // Global liquidity: USD denomination, all countries/sectors.
        "WS_GLI" => &[
            ("CURR_DENOM", "USD"),
            ("BORROWERS_CTY", "3P"),
            ("BORROWERS_SECTOR", "A"),
            ("LENDERS_SECTOR", "A"),
        ],
        // International debt securities: all issuers, USD.
        "WS_DEBT_SEC2_PUB" => &[("ISSUER_RES", "5J"), ("UNIT_MEASURE", "USD")],
        _ => &[],
    }
}

/// Select the best series from a multi-series payload.
///
/// Scoring: observation count as the base, plus 1000 for every preferred
/// dimension value the series matches, so any preference match dominates raw
/// data volume. Ties break toward the first series in key order, so
/// repeated calls over the same payload select the same series.
#[must_use]
pub fn select_best_series<'a>(
    payload: &'a SdmxPayload,
    preferences: &[Preference],
) -> Option<(&'a str, &'a BTreeMap<String, Vec<serde_json::Value>>)> {
    let mut best: Option<(&str, &BTreeMap<String, Vec<serde_json::Value>>, i64)> = None;

    for (series_key, observations) in &payload.series {
        if observations.is_empty() {
            continue;
        }
        let Some(key_parts) = parse_series_key(series_key) else {
            tracing::warn!(
                target: "econfed::sdmx",
                series_key,
                "invalid series key format, skipping"
            );
            continue;
        };

        let mut score = observations.len() as i64;
        for (dim_id, preferred_value) in preferences {
            let Some((dim_index, dimension)) = payload
                .series_dimensions
                .iter()
                .enumerate()
                .find(|(_, d)| d.id == *dim_id)
            else {
                continue;
            };
            let Some(&value_index) = key_parts.get(dim_index) else {
                continue;
            };
            if dimension
                .values
                .get(value_index)
                .is_some_and(|v| v.id == *preferred_value)
            {
                score += 1000;
            }
        }

        // Strictly-greater keeps the first series on ties.
        if best.is_none_or(|(_, _, b)| score > b) {
            best = Some((series_key, observations, score));
        }
    }

    best.map(|(k, obs, _)| (k, obs))
}

/// Split "0:1:0:2" into indices.
#[must_use]
pub fn parse_series_key(key: &str) -> Option<Vec<usize>> {
    key.split(':')
        .map(|part| part.parse::<usize>().ok())
        .collect()
}

/// The value id a series holds for a named dimension, if resolvable.
#[must_use]
pub fn series_dimension_value<'a>(
    payload: &'a SdmxPayload,
    series_key: &str,
    dimension_id: &str,
) -> Option<&'a str> {
    let key_parts = parse_series_key(series_key)?;
    let (dim_index, dimension) = payload
        .series_dimensions
        .iter()
        .enumerate()
        .find(|(_, d)| d.id == dimension_id)?;
    let value_index = *key_parts.get(dim_index)?;
    dimension
        .values
        .get(value_index)
        .map(|v| v.id.as_str())
}

/// Observations of a series as `(time period, value)` pairs in time order.
#[must_use]
pub fn observations_in_time_order(
    payload: &SdmxPayload,
    observations: &BTreeMap<String, Vec<serde_json::Value>>,
) -> Vec<(String, Option<f64>)> {
    let mut indexed: Vec<(usize, Option<f64>)> = observations
        .iter()
        .filter_map(|(idx, values)| {
            let position: usize = idx.parse().ok()?;
            let value = values.first().and_then(serde_json::Value::as_f64);
            Some((position, value))
        })
        .collect();
    indexed.sort_by_key(|(pos, _)| *pos);
    indexed
        .into_iter()
        .filter_map(|(pos, value)| {
            payload
                .time_periods
                .get(pos)
                .map(|period| (period.clone(), value))
        })
        .collect()
}
