//! Fallback relevance validation.
//!
//! When a *different* provider answers a fallback attempt, the result must
//! still be about what the user asked. Vaguely overlapping keywords are
//! not enough: the checks separate subject entities (who the data is
//! about) from metric types (what is measured), compare semantically
//! heavy qualifiers, verify the geography, and finally require real term
//! overlap. A rejection means "try the next fallback", never "surface
//! with a warning".

use econfed_catalog::CountryResolver;
use econfed_types::Series;

/// Subject entities: who or what the series describes.
const SUBJECT_ENTITIES: &[&str] = &[
    "corporation", "corporations", "corporate", "company", "companies", "nonfinancial",
    "nonfin", "nfc", "government", "public", "fiscal", "general", "household", "households",
    "consumer", "consumers", "bank", "banks", "banking", "financial", "mfi", "business",
    "businesses", "enterprise", "enterprises", "private", "sector",
];

/// Metric types: what the series measures.
const METRIC_TYPES: &[&str] = &[
    "assets", "liabilities", "debt", "income", "expenditure", "revenue", "expense",
    "expenses", "balance", "equity", "gdp", "gnp", "unemployment", "inflation", "cpi", "ppi",
    "trade", "exports", "imports", "deficit", "surplus", "investment", "consumption",
    "savings", "production", "employment", "wages", "salaries", "output", "growth",
];

/// Qualifiers with enough semantic weight that a mismatch changes the
/// meaning ("fixed assets" vs "current assets"). This set is the baseline
/// from observed failures; extend it here as new mismatches show up.
const SIGNIFICANT_QUALIFIERS: &[&str] = &["fixed", "current", "tangible", "intangible"];

/// Recorded but not rejecting on their own.
const SOFT_QUALIFIERS: &[&str] = &["gross", "net", "total", "real", "nominal"];

const STOP_WORDS: &[&str] = &[
    "data", "statistics", "annual", "quarterly", "monthly", "index", "rate", "by", "and",
    "the", "of", "for", "in", "to", "a", "an", "all", "from", "with", "as", "at", "show",
    "plot", "get", "find", "display", "chart", "graph", "value", "values", "economic",
    "activity", "activities",
];

/// Minimum share of the original terms a relevant result must cover.
const MIN_OVERLAP: f64 = 0.30;

fn extract_terms(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for word in text
        .to_ascii_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
    {
        let clean: String = word.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        if clean.len() > 2 && !STOP_WORDS.contains(&clean.as_str()) && !out.contains(&clean) {
            out.push(clean);
        }
    }
    out
}

/// Fold related subject terms into canonical subjects.
fn canonical_subjects(terms: &[String]) -> Vec<&'static str> {
    let has = |names: &[&str]| terms.iter().any(|t| names.contains(&t.as_str()));
    let mut out = Vec::new();
    if has(&["corporation", "corporations", "corporate", "company", "companies", "nfc"]) {
        out.push("corporation");
    }
    if has(&["government", "public", "fiscal", "general"]) {
        out.push("government");
    }
    if has(&["household", "households", "consumer", "consumers"]) {
        out.push("household");
    }
    if has(&["bank", "banks", "banking", "mfi"]) {
        out.push("bank");
    }
    if has(&["nonfinancial", "nonfin"]) {
        out.push("nonfinancial");
    }
    if has(&["financial"]) && !has(&["nonfinancial", "nonfin"]) {
        out.push("financial");
    }
    out
}

fn intersect<'a>(terms: &'a [String], vocabulary: &[&str]) -> Vec<&'a str> {
    terms
        .iter()
        .map(String::as_str)
        .filter(|t| vocabulary.contains(t))
        .collect()
}

/// Decide whether a fallback result is semantically related to the
/// original request.
#[must_use]
pub fn is_fallback_relevant(
    original_indicators: &[String],
    results: &[Series],
    target_country: Option<&str>,
) -> bool {
    if results.is_empty() || original_indicators.is_empty() {
        return false;
    }

    // Geography check: a fallback about a different country is never
    // acceptable, whatever the indicator says.
    if let Some(target) = target_country {
        let target_iso = CountryResolver::normalize(target);
        for series in results {
            let result_iso = CountryResolver::normalize(&series.meta.country);
            if let (Some(want), Some(have)) = (target_iso, result_iso)
                && want != have
            {
                tracing::warn!(
                    target: "econfed::relevance",
                    requested = want,
                    got = have,
                    "fallback rejected: country mismatch"
                );
                return false;
            }
        }
    }

    let original_text = original_indicators.join(" ");
    let original_terms = extract_terms(&original_text);
    if original_terms.is_empty() {
        return true; // nothing to validate against
    }
    let original_subjects = canonical_subjects(&original_terms);
    let original_metrics = intersect(&original_terms, METRIC_TYPES);
    let original_significant = intersect(&original_terms, SIGNIFICANT_QUALIFIERS);
    let original_soft = intersect(&original_terms, SOFT_QUALIFIERS);
    if !original_soft.is_empty() {
        tracing::debug!(
            target: "econfed::relevance",
            qualifiers = ?original_soft,
            "soft qualifiers present; not rejecting on these alone"
        );
    }

    for series in results {
        let result_terms = extract_terms(&series.meta.indicator);
        let result_subjects = canonical_subjects(&result_terms);
        let result_metrics = intersect(&result_terms, METRIC_TYPES);
        let result_significant = intersect(&result_terms, SIGNIFICANT_QUALIFIERS);

        // Subject entity check: a requested subject must be matched; a
        // result with no subject at all is too generic to substitute.
        if !original_subjects.is_empty() {
            let matched = original_subjects
                .iter()
                .any(|s| result_subjects.contains(s));
            if !matched {
                tracing::warn!(
                    target: "econfed::relevance",
                    original = ?original_subjects,
                    result = ?result_subjects,
                    "fallback rejected: subject mismatch"
                );
                return false;
            }
        }

        // Metric type check with qualifier awareness.
        if !original_metrics.is_empty() && !result_metrics.is_empty() {
            if !original_metrics.iter().any(|m| result_metrics.contains(m)) {
                tracing::warn!(
                    target: "econfed::relevance",
                    original = ?original_metrics,
                    result = ?result_metrics,
                    "fallback rejected: metric mismatch"
                );
                return false;
            }
            if !original_significant.is_empty()
                && !result_significant.is_empty()
                && original_significant != result_significant
            {
                tracing::warn!(
                    target: "econfed::relevance",
                    original = ?original_significant,
                    result = ?result_significant,
                    "fallback rejected: qualifier mismatch"
                );
                return false;
            }
        }

        // Term overlap floor.
        let overlap = original_terms
            .iter()
            .filter(|t| result_terms.contains(t))
            .count() as f64;
        let required = (original_terms.len() as f64 * MIN_OVERLAP).max(1.0);
        if overlap >= required {
            return true;
        }
    }

    tracing::warn!(
        target: "econfed::relevance",
        indicators = %original_text,
        "fallback rejected: no result passed relevance checks"
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use econfed_mock::fixtures::annual_series;
    use econfed_types::Provider;

    fn result(indicator: &str, country: &str) -> Vec<Series> {
        vec![annual_series(
            Provider::WorldBank,
            indicator,
            country,
            "Percent",
            &[("2020-01-01", 1.0)],
        )]
    }

    #[test]
    fn household_debt_does_not_substitute_for_corporate_debt() {
        let original = vec!["non-financial corporations debt".to_string()];
        let fallback = result("Household debt to GDP", "United States");
        assert!(!is_fallback_relevant(&original, &fallback, None));
    }

    #[test]
    fn matching_subject_and_metric_is_accepted() {
        let original = vec!["household debt".to_string()];
        let fallback = result("Household debt, percent of GDP", "United States");
        assert!(is_fallback_relevant(&original, &fallback, None));
    }

    #[test]
    fn country_mismatch_rejects_regardless_of_indicator() {
        let original = vec!["unemployment".to_string()];
        let fallback = result("Unemployment rate", "Germany");
        assert!(!is_fallback_relevant(&original, &fallback, Some("FR")));
        assert!(is_fallback_relevant(
            &vec!["unemployment rate".to_string()],
            &result("Unemployment rate", "Germany"),
            Some("DE")
        ));
    }

    #[test]
    fn subjectless_generic_results_are_rejected_for_subject_queries() {
        let original = vec!["government debt".to_string()];
        let fallback = result("Total debt securities outstanding", "United States");
        assert!(!is_fallback_relevant(&original, &fallback, None));
    }

    #[test]
    fn significant_qualifier_mismatch_rejects() {
        let original = vec!["fixed assets of corporations".to_string()];
        let fallback = result("Current assets of corporations", "United States");
        assert!(!is_fallback_relevant(&original, &fallback, None));
    }

    #[test]
    fn low_term_overlap_rejects() {
        let original = vec!["steel production output".to_string()];
        let fallback = result("Consumer confidence survey", "United States");
        assert!(!is_fallback_relevant(&original, &fallback, None));
    }
}
