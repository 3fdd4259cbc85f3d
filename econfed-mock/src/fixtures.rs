//! Series fixtures for tests.

use econfed_types::{Frequency, Point, Provider, Series, SeriesMeta};

/// A monthly percent series from literal (date, value) pairs.
#[must_use]
pub fn monthly_series(
    provider: Provider,
    series_id: &str,
    country: &str,
    points: &[(&str, f64)],
) -> Series {
    series_with(provider, series_id, series_id, country, Frequency::Monthly, "Percent", points)
}

/// An annual series with an explicit indicator label and unit.
#[must_use]
pub fn annual_series(
    provider: Provider,
    indicator: &str,
    country: &str,
    unit: &str,
    points: &[(&str, f64)],
) -> Series {
    series_with(
        provider,
        indicator,
        &indicator.to_ascii_uppercase().replace(' ', "_"),
        country,
        Frequency::Annual,
        unit,
        points,
    )
}

/// Fully parameterized fixture.
#[must_use]
pub fn series_with(
    provider: Provider,
    indicator: &str,
    series_id: &str,
    country: &str,
    frequency: Frequency,
    unit: &str,
    points: &[(&str, f64)],
) -> Series {
    let meta = SeriesMeta::new(provider, indicator, country, series_id, frequency, unit);
    let points = points
        .iter()
        .map(|(date, value)| Point::new(date.parse().expect("fixture date"), Some(*value)))
        .collect();
    Series::new(meta, points)
}
