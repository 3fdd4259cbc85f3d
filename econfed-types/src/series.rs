//! Canonical time-series shapes returned by every provider adapter.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Provider;

/// Observation cadence of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    /// One observation per day.
    Daily,
    /// One observation per week.
    Weekly,
    /// One observation per month.
    Monthly,
    /// One observation per quarter.
    Quarterly,
    /// Two observations per year.
    Semiannual,
    /// One observation per year.
    Annual,
    /// Spot values with no fixed cadence (e.g. latest exchange rates).
    RealTime,
    /// Categorical breakdowns rather than a time axis.
    Categorical,
}

impl Frequency {
    /// Parse both single-letter codes ("M") and full words ("monthly").
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "daily" => Some(Self::Daily),
            "w" | "weekly" => Some(Self::Weekly),
            "m" | "monthly" => Some(Self::Monthly),
            "q" | "quarterly" => Some(Self::Quarterly),
            "s" | "sa" | "semiannual" | "semi-annual" => Some(Self::Semiannual),
            "a" | "y" | "annual" | "yearly" => Some(Self::Annual),
            "real-time" | "realtime" | "spot" => Some(Self::RealTime),
            "categorical" => Some(Self::Categorical),
            _ => None,
        }
    }

    /// Single-letter provider code (SDMX style).
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Daily => 'D',
            Self::Weekly => 'W',
            Self::Monthly => 'M',
            Self::Quarterly => 'Q',
            Self::Semiannual => 'S',
            Self::Annual | Self::RealTime | Self::Categorical => 'A',
        }
    }

    /// Human-readable label used in metadata.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Semiannual => "semiannual",
            Self::Annual => "annual",
            Self::RealTime => "real-time",
            Self::Categorical => "categorical",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What kind of quantity a series measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Absolute level (e.g. GDP in current USD).
    Level,
    /// A rate already expressed in percent (e.g. unemployment rate).
    Rate,
    /// An index relative to a base period.
    Index,
    /// Period-over-period percent change.
    PercentChange,
    /// Absolute change between periods.
    Change,
}

/// Whether values are inflation-adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceType {
    /// Inflation-adjusted values.
    Real,
    /// Current-price values.
    Nominal,
}

/// One dated observation. A `None` value is a gap the provider reported,
/// distinct from a period that was never fetched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Period-start date of the observation.
    pub date: NaiveDate,
    /// Observed value, if reported.
    pub value: Option<f64>,
}

impl Point {
    /// Convenience constructor.
    #[must_use]
    pub const fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }
}

/// Descriptive metadata attached to every canonical series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMeta {
    /// Provider the data came from.
    pub source: Provider,
    /// Human-readable indicator label.
    pub indicator: String,
    /// Display name of the geography the series covers.
    pub country: String,
    /// Provider-native series identifier.
    pub series_id: String,
    /// Observation cadence.
    pub frequency: Frequency,
    /// Unit string as reported (possibly normalized).
    pub unit: String,
    /// Quantity kind, when known.
    pub data_type: Option<DataType>,
    /// Real vs nominal, when known.
    pub price_type: Option<PriceType>,
    /// Seasonal adjustment note, when reported.
    pub seasonal_adjustment: Option<String>,
    /// Date of the first point.
    pub start_date: Option<NaiveDate>,
    /// Date of the last point.
    pub end_date: Option<NaiveDate>,
    /// Exact upstream request URL with secrets masked, for reproducibility.
    pub api_url: String,
    /// Human-readable provider portal URL.
    pub source_url: String,
    /// Longer description, when the provider supplies one.
    pub description: Option<String>,
    /// Free-form notes (e.g. applied normalizations).
    pub notes: Option<String>,
}

impl SeriesMeta {
    /// Minimal metadata with the required identification fields.
    #[must_use]
    pub fn new(
        source: Provider,
        indicator: impl Into<String>,
        country: impl Into<String>,
        series_id: impl Into<String>,
        frequency: Frequency,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            source,
            indicator: indicator.into(),
            country: country.into(),
            series_id: series_id.into(),
            frequency,
            unit: unit.into(),
            data_type: None,
            price_type: None,
            seasonal_adjustment: None,
            start_date: None,
            end_date: None,
            api_url: String::new(),
            source_url: String::new(),
            description: None,
            notes: None,
        }
    }
}

/// A canonical series: metadata plus date-ascending observations.
///
/// Construct through [`Series::new`], which sorts points, collapses
/// duplicate dates to their first occurrence (adapters apply any
/// revision-preference policy first), and syncs `start_date`/`end_date` with the
/// actual observations. The invariants hold for the lifetime of the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Series metadata.
    pub meta: SeriesMeta,
    /// Observations, sorted by date ascending, unique dates.
    pub points: Vec<Point>,
}

impl Series {
    /// Build a series, normalizing point ordering and metadata date range.
    #[must_use]
    pub fn new(mut meta: SeriesMeta, mut points: Vec<Point>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        meta.start_date = points.first().map(|p| p.date);
        meta.end_date = points.last().map(|p| p.date);
        Self { meta, points }
    }

    /// Whether the series has no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Largest absolute non-null value, if any.
    #[must_use]
    pub fn max_abs_value(&self) -> Option<f64> {
        self.points
            .iter()
            .filter_map(|p| p.value)
            .map(f64::abs)
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn new_sorts_and_syncs_date_range() {
        let meta = SeriesMeta::new(
            Provider::Fred,
            "Unemployment Rate",
            "United States",
            "UNRATE",
            Frequency::Monthly,
            "Percent",
        );
        let series = Series::new(
            meta,
            vec![
                Point::new(d("2020-03-01"), Some(4.4)),
                Point::new(d("2020-01-01"), Some(3.5)),
                Point::new(d("2020-02-01"), Some(3.5)),
            ],
        );
        assert_eq!(series.points[0].date, d("2020-01-01"));
        assert_eq!(series.meta.start_date, Some(d("2020-01-01")));
        assert_eq!(series.meta.end_date, Some(d("2020-03-01")));
    }

    #[test]
    fn new_drops_duplicate_dates() {
        let meta = SeriesMeta::new(
            Provider::WorldBank,
            "GDP",
            "Canada",
            "NY.GDP.MKTP.CD",
            Frequency::Annual,
            "USD",
        );
        let series = Series::new(
            meta,
            vec![
                Point::new(d("2020-01-01"), Some(1.0)),
                Point::new(d("2020-01-01"), Some(2.0)),
            ],
        );
        assert_eq!(series.points.len(), 1);
    }

    #[test]
    fn frequency_parses_codes_and_words() {
        assert_eq!(Frequency::parse("M"), Some(Frequency::Monthly));
        assert_eq!(Frequency::parse("quarterly"), Some(Frequency::Quarterly));
        assert_eq!(Frequency::parse("A"), Some(Frequency::Annual));
        assert_eq!(Frequency::parse("fortnightly"), None);
    }
}
