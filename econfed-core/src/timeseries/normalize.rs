//! Numeric cleanup applied to decoded observations.

use econfed_types::Point;

/// Threshold below which percent-unit values are considered
/// decimal-encoded. 1.5 rather than 1.0: genuine sub-1.5% series exist, but
/// a *whole series* maxing out under 1.5 under a percent unit is the
/// decimal-fraction signature.
const DECIMAL_PERCENT_CEILING: f64 = 1.5;

/// Whether a unit string denotes percentage values.
#[must_use]
pub fn is_percent_unit(unit: &str) -> bool {
    let lower = unit.to_ascii_lowercase();
    lower.contains('%') || lower.contains("percent") || lower.contains("per cent")
}

/// Correct decimal-encoded percentages in place.
///
/// When the unit is percent-like and the largest absolute value across the
/// series is below the decimal ceiling, every non-null value is multiplied
/// by 100 (a provider reported 0.052 for 5.2%). Ratios without a percent
/// unit are never touched. Returns whether a correction was applied.
pub fn normalize_percent(points: &mut [Point], unit: &str) -> bool {
    if !is_percent_unit(unit) {
        return false;
    }
    let max_abs = points
        .iter()
        .filter_map(|p| p.value)
        .map(f64::abs)
        .fold(f64::NAN, f64::max);
    if !max_abs.is_finite() || max_abs >= DECIMAL_PERCENT_CEILING || max_abs == 0.0 {
        return false;
    }
    for p in points.iter_mut() {
        if let Some(v) = p.value.as_mut() {
            *v *= 100.0;
        }
    }
    true
}

/// Deduplicate records sharing a key, keeping the maximum-magnitude value.
///
/// Trade providers emit revisions as separate records under the same
/// (period, flow, commodity) key; later revisions supersede earlier
/// estimates and are, in practice, the larger magnitude. Input order is
/// preserved for the surviving records.
#[must_use]
pub fn dedup_keep_max_magnitude<K, T, FK, FV>(records: Vec<T>, key_of: FK, value_of: FV) -> Vec<T>
where
    K: std::hash::Hash + Eq + Clone,
    FK: Fn(&T) -> K,
    FV: Fn(&T) -> f64,
{
    use std::collections::HashMap;

    let mut best: HashMap<K, usize> = HashMap::new();
    let mut keep: Vec<Option<T>> = Vec::with_capacity(records.len());

    for record in records {
        let key = key_of(&record);
        match best.get(&key) {
            Some(&idx) => {
                let existing = keep[idx]
                    .as_ref()
                    .expect("kept slot is only cleared when replaced");
                if value_of(&record).abs() > value_of(existing).abs() {
                    keep[idx] = Some(record);
                }
            }
            None => {
                best.insert(key, keep.len());
                keep.push(Some(record));
            }
        }
    }

    keep.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn pt(date: &str, value: Option<f64>) -> Point {
        Point::new(date.parse::<NaiveDate>().unwrap(), value)
    }

    #[test]
    fn decimal_percentages_are_scaled_up() {
        let mut points = vec![pt("2020-01-01", Some(0.025)), pt("2020-02-01", None)];
        assert!(normalize_percent(&mut points, "Percent of GDP"));
        assert_eq!(points[0].value, Some(2.5));
        assert_eq!(points[1].value, None);
    }

    #[test]
    fn genuine_percentages_are_untouched() {
        let mut points = vec![pt("2020-01-01", Some(5.2)), pt("2020-02-01", Some(4.4))];
        assert!(!normalize_percent(&mut points, "%"));
        assert_eq!(points[0].value, Some(5.2));
    }

    #[test]
    fn non_percent_units_are_never_scaled() {
        let mut points = vec![pt("2020-01-01", Some(0.72))];
        assert!(!normalize_percent(&mut points, "Ratio"));
        assert_eq!(points[0].value, Some(0.72));
    }

    #[test]
    fn dedup_keeps_largest_magnitude_per_key() {
        let records = vec![("2020", 10.0), ("2020", -25.0), ("2021", 5.0)];
        let out = dedup_keep_max_magnitude(records, |r| r.0, |r| r.1);
        assert_eq!(out, vec![("2020", -25.0), ("2021", 5.0)]);
    }
}
