//! Parameter defaulting and normalization.
//!
//! Everything here runs exactly once per subquery, *before* cache lookup,
//! so that two phrasings of the same request key identically: `country`
//! vs `countries` collapse into one ISO2 list, default windows are
//! materialized, frequencies normalize to provider codes, and currency
//! pairs are extracted from the query text.

use chrono::{Datelike, NaiveDate, Utc};

use econfed_catalog::{CodeFormat, CountryResolver};
use econfed_types::{FetchRequest, Frequency, ParsedIntent, Provider, TradeFlow};

/// Currency names and symbols folded to ISO codes.
const CURRENCY_NAMES: &[(&str, &str)] = &[
    ("dollar", "USD"),
    ("dollars", "USD"),
    ("us dollar", "USD"),
    ("euro", "EUR"),
    ("euros", "EUR"),
    ("pound", "GBP"),
    ("pounds", "GBP"),
    ("sterling", "GBP"),
    ("british pound", "GBP"),
    ("yen", "JPY"),
    ("japanese yen", "JPY"),
    ("yuan", "CNY"),
    ("renminbi", "CNY"),
    ("rmb", "CNY"),
    ("franc", "CHF"),
    ("swiss franc", "CHF"),
    ("rupee", "INR"),
    ("won", "KRW"),
    ("real", "BRL"),
    ("ruble", "RUB"),
    ("peso", "MXN"),
    ("rand", "ZAR"),
    ("lira", "TRY"),
    ("canadian dollar", "CAD"),
    ("loonie", "CAD"),
    ("australian dollar", "AUD"),
    ("singapore dollar", "SGD"),
    ("hong kong dollar", "HKD"),
    ("new zealand dollar", "NZD"),
    ("kiwi dollar", "NZD"),
];

const KNOWN_CURRENCY_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CNY", "CHF", "CAD", "AUD", "INR", "KRW", "BRL", "MXN", "ZAR",
    "TRY", "SGD", "HKD", "NZD", "SEK", "NOK", "DKK", "THB", "MYR", "TWD", "RUB",
];

/// Build the normalized fetch request for one (intent, provider) pair.
///
/// `default_years` is the provider's default history window; zero means
/// "latest only" and leaves the date window empty.
#[must_use]
pub fn build_request(
    intent: &ParsedIntent,
    provider: Provider,
    default_years: u32,
) -> FetchRequest {
    let indicator = intent
        .indicators
        .first()
        .cloned()
        .unwrap_or_default();

    let countries = normalize_countries(intent);
    let (start_date, end_date) = date_window(intent, provider, default_years);
    let frequency = intent
        .param_str("frequency")
        .and_then(|f| Frequency::parse(&f));

    let mut req = FetchRequest {
        indicator,
        series_id: None,
        countries,
        start_date,
        end_date,
        frequency,
        base_currency: intent.param_str("baseCurrency").map(|c| c.to_ascii_uppercase()),
        target_currency: intent
            .param_str("targetCurrency")
            .map(|c| c.to_ascii_uppercase()),
        reporter: intent.param_str("reporter"),
        partner: intent.param_str("partner"),
        commodity: intent.param_str("commodity"),
        flow: intent.param_str("flow").and_then(|f| TradeFlow::parse(&f)),
        coin_ids: intent
            .param_list("coinIds")
            .into_iter()
            .map(|c| c.to_ascii_lowercase())
            .collect(),
        vs_currency: intent.param_str("vsCurrency"),
        days: intent.param_str("days").and_then(|d| d.parse().ok()),
        dimensions: intent
            .parameters
            .get("dimensions")
            .and_then(|v| v.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default(),
    };

    // Currency pairs must be pinned down before the cache key is derived;
    // otherwise distinct pairs could collide on identical parameter maps.
    // ExchangeRate always needs a pair; FRED needs one for FX routings.
    if provider == Provider::ExchangeRate {
        let (base, target) = extract_currency_pair(intent, &req);
        req.base_currency = Some(base);
        req.target_currency = Some(target);
    } else if provider == Provider::Fred && req.base_currency.is_none() {
        let wants_fx = req.indicator.to_ascii_lowercase().contains("exchange rate")
            || intent
                .original_query
                .to_ascii_lowercase()
                .contains("exchange rate")
            || crate::router::ProviderRouter::detect_currency_pair(&intent.original_query);
        if wants_fx {
            let (base, target) = extract_currency_pair(intent, &req);
            req.base_currency = Some(base);
            req.target_currency = Some(target);
        }
    }

    if provider == Provider::CoinGecko && req.days.is_none() {
        // Time references in the query beat parser-supplied dates.
        req.days = Some(days_from_query(&intent.original_query).unwrap_or(30));
    }

    if provider == Provider::Comtrade {
        if req.reporter.is_none() {
            req.reporter = req.countries.first().cloned();
        }
        if req.flow.is_none() {
            let lower = intent.original_query.to_ascii_lowercase();
            req.flow = if lower.contains("import") {
                Some(TradeFlow::Import)
            } else {
                Some(TradeFlow::Export)
            };
        }
    }

    req
}

/// Unify `country`/`countries` params, region labels, and query-text
/// detection into one ISO2 list.
fn normalize_countries(intent: &ParsedIntent) -> Vec<String> {
    let mut raw: Vec<String> = Vec::new();
    if let Some(single) = intent.param_str("country") {
        raw.push(single);
    }
    raw.extend(intent.param_list("countries"));

    let mut out: Vec<String> = Vec::new();
    let push = |iso2: String, out: &mut Vec<String>| {
        if !out.contains(&iso2) {
            out.push(iso2);
        }
    };
    for token in &raw {
        if let Some(members) = CountryResolver::expand_region(token, CodeFormat::Iso2) {
            for m in members {
                push(m, &mut out);
            }
        } else if let Some(iso2) = CountryResolver::normalize(token) {
            push(iso2.to_string(), &mut out);
        } else {
            tracing::warn!(target: "econfed::params", token = %token, "unrecognized country token");
        }
    }

    // Geography override: when the query text clearly names countries but
    // the parser defaulted to US or nothing, the query wins.
    let from_query = CountryResolver::detect_all_countries_in_query(&intent.original_query);
    let defaulted = out.is_empty() || out == vec!["US".to_string()];
    if defaulted && !from_query.is_empty() {
        let non_us: Vec<&String> = from_query.iter().filter(|c| *c != "US").collect();
        if !non_us.is_empty() {
            tracing::info!(
                target: "econfed::params",
                previous = ?out,
                detected = ?from_query,
                "query text overrides parsed geography"
            );
            return from_query;
        }
    }
    if out.is_empty() {
        let from_regions = CountryResolver::expand_regions_in_query(&intent.original_query);
        if !from_regions.is_empty() {
            return from_regions;
        }
    }
    out
}

/// Materialize the date window: explicit dates win, then `startYear`/
/// `endYear`, then the provider default span ending today.
fn date_window(
    intent: &ParsedIntent,
    provider: Provider,
    default_years: u32,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let parse_date = |key: &str| -> Option<NaiveDate> {
        intent.param_str(key).and_then(|v| v.parse().ok())
    };
    let parse_year = |key: &str| -> Option<i32> {
        intent.param_str(key).and_then(|v| v.parse().ok())
    };

    let mut start = parse_date("startDate");
    let mut end = parse_date("endDate");
    if start.is_none()
        && let Some(year) = parse_year("startYear")
    {
        start = NaiveDate::from_ymd_opt(year, 1, 1);
    }
    if end.is_none()
        && let Some(year) = parse_year("endYear")
    {
        end = NaiveDate::from_ymd_opt(year, 12, 31);
    }

    // Latest-only providers take no default window at all.
    if default_years == 0 || matches!(provider, Provider::ExchangeRate | Provider::CoinGecko) {
        return (start, end);
    }

    let today = Utc::now().date_naive();
    let end = end.unwrap_or(today);
    let start = start.unwrap_or_else(|| {
        NaiveDate::from_ymd_opt(end.year() - default_years as i32, end.month(), 1)
            .unwrap_or(end)
    });
    (Some(start), Some(end))
}

/// Extract `(base, target)` from parameters, query patterns, code scans,
/// and currency names, in that order, with USD/EUR defaults.
fn extract_currency_pair(intent: &ParsedIntent, req: &FetchRequest) -> (String, String) {
    if let (Some(base), Some(target)) = (&req.base_currency, &req.target_currency) {
        return (base.clone(), target.clone());
    }

    let upper = intent.original_query.to_ascii_uppercase();
    let pair_patterns = [
        r"\b([A-Z]{3})\s+TO\s+([A-Z]{3})\b",
        r"\b([A-Z]{3})[/\-]([A-Z]{3})\b",
        r"\b([A-Z]{3})\s+VS\.?\s+([A-Z]{3})\b",
    ];
    for pattern in pair_patterns {
        let re = regex::Regex::new(pattern).expect("static regex");
        if let Some(caps) = re.captures(&upper) {
            return (caps[1].to_string(), caps[2].to_string());
        }
    }

    // Any known codes present, in order of appearance.
    let code_re = regex::Regex::new(r"\b([A-Z]{3})\b").expect("static regex");
    let found: Vec<String> = code_re
        .captures_iter(&upper)
        .map(|c| c[1].to_string())
        .filter(|c| KNOWN_CURRENCY_CODES.contains(&c.as_str()))
        .collect();
    if found.len() >= 2 {
        return (found[0].clone(), found[1].clone());
    }
    if found.len() == 1 {
        let code = found[0].clone();
        return if code == "USD" {
            ("USD".to_string(), "EUR".to_string())
        } else {
            (code, "USD".to_string())
        };
    }

    // Currency names, ordered by position in the query.
    let lower = intent.original_query.to_ascii_lowercase();
    let mut named: Vec<(usize, &str)> = Vec::new();
    for (name, code) in CURRENCY_NAMES {
        if let Some(pos) = lower.find(name)
            && !named.iter().any(|(_, c)| c == code)
        {
            named.push((pos, code));
        }
    }
    named.sort_by_key(|(pos, _)| *pos);
    match named.as_slice() {
        [(_, first), (_, second), ..] => ((*first).to_string(), (*second).to_string()),
        [(_, only)] if *only == "USD" => ("USD".to_string(), "EUR".to_string()),
        [(_, only)] => ((*only).to_string(), "USD".to_string()),
        [] => ("USD".to_string(), "EUR".to_string()),
    }
}

/// "last 90 days" style references for CoinGecko windows.
fn days_from_query(query: &str) -> Option<u32> {
    let lower = query.to_ascii_lowercase();
    let re = regex::Regex::new(r"(?:last|past)\s+(\d{1,4})\s+day").expect("static regex");
    if let Some(caps) = re.captures(&lower) {
        return caps[1].parse().ok();
    }
    if lower.contains("last week") || lower.contains("past week") {
        return Some(7);
    }
    if lower.contains("last month") || lower.contains("past month") {
        return Some(30);
    }
    if lower.contains("last year") || lower.contains("past year") {
        return Some(365);
    }
    None
}
