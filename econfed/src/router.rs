//! Deterministic provider routing.
//!
//! Routing precedence, highest first: an explicit provider mention in the
//! query text (locked, never overridden), the parser's provider hint,
//! deterministic domain rules, a catalog availability override, and the
//! optional ranking hook. `validate_routing` adds informational warnings,
//! never hard failures.

use econfed_catalog::{Catalog, CountryResolver};
use econfed_types::{ParsedIntent, Provider, RoutingDecision};

/// Phrases that lock a provider when present in the query text.
const EXPLICIT_PHRASES: &[(Provider, &[&str])] = &[
    (Provider::Oecd, &["from oecd", "using oecd", "via oecd", "according to oecd", "oecd data", "oecd"]),
    (
        Provider::Fred,
        &["from fred", "using fred", "via fred", "federal reserve", "st. louis fed", "stlouisfed"],
    ),
    (
        Provider::WorldBank,
        &["from world bank", "using world bank", "world bank data", "world bank", "worldbank"],
    ),
    (
        Provider::Comtrade,
        &["from comtrade", "using comtrade", "un comtrade", "united nations comtrade", "comtrade"],
    ),
    (
        Provider::StatsCan,
        &["from statscan", "using statscan", "statistics canada", "stats canada", "statscan"],
    ),
    (
        Provider::Imf,
        &["from imf", "from the imf", "using imf", "international monetary fund"],
    ),
    (
        Provider::Bis,
        &["from bis", "using bis", "bank for international settlements"],
    ),
    (
        Provider::Eurostat,
        &["from eurostat", "using eurostat", "eu statistics", "european statistics", "eurostat"],
    ),
    (
        Provider::ExchangeRate,
        &["from exchangerate", "exchange rate api", "exchangerate-api"],
    ),
    (
        Provider::CoinGecko,
        &["from coingecko", "using coingecko", "coin gecko", "coingecko"],
    ),
];

const CRYPTO_TOKENS: &[&str] = &[
    "bitcoin", "btc", "ethereum", "eth", "crypto", "cryptocurrency", "nft", "dogecoin",
    "solana", "stablecoin", "altcoin",
];

const HISTORICAL_MARKERS: &[&str] = &[
    "history", "historical", "over time", "trend", "since", "past year", "past decade",
    "last year", "last decade", "evolution",
];

const BIS_CONCEPT_TOKENS: &[&str] = &[
    "policy rate", "central bank rate", "property price", "house price", "housing price",
    "credit to gdp", "total credit", "debt service", "global liquidity",
    "effective exchange rate",
];

const US_ONLY_TOKENS: &[&str] = &[
    "fed funds", "federal funds", "payems", "nonfarm payroll", "napm", "icsa",
    "initial claims", "housing starts", "case-shiller",
];

const FISCAL_TOKENS: &[&str] = &[
    "government debt", "public debt", "sovereign debt", "fiscal", "budget deficit",
    "current account", "balance of payments",
];

const DEVELOPMENT_TOKENS: &[&str] = &["gdp", "population", "poverty", "development", "income"];

/// The deterministic router.
pub struct ProviderRouter;

impl ProviderRouter {
    /// Detect an explicit provider mention in query text.
    #[must_use]
    pub fn detect_explicit_provider(query: &str) -> Option<Provider> {
        let lower = query.to_ascii_lowercase();
        for (provider, phrases) in EXPLICIT_PHRASES {
            if phrases.iter().any(|p| lower.contains(p)) {
                return Some(*provider);
            }
        }
        None
    }

    /// Whether query text carries a currency-pair pattern (`USD to EUR`,
    /// `EUR/JPY`).
    #[must_use]
    pub fn detect_currency_pair(query: &str) -> bool {
        let pair = regex::Regex::new(r"\b[A-Z]{3}(\s+to\s+|\s+TO\s+|/|-)[A-Z]{3}\b")
            .expect("static regex");
        pair.is_match(query)
    }

    fn has_historical_intent(intent: &ParsedIntent, lower_query: &str) -> bool {
        if intent.param_str("startDate").is_some() || intent.param_str("startYear").is_some() {
            return true;
        }
        HISTORICAL_MARKERS.iter().any(|m| lower_query.contains(m))
            || regex::Regex::new(r"\b(19|20)\d{2}\b")
                .expect("static regex")
                .is_match(lower_query)
    }

    fn countries_of(intent: &ParsedIntent, query: &str) -> Vec<String> {
        let mut out = Vec::new();
        for key in ["country", "countries"] {
            for raw in intent
                .param_str(key)
                .map(|s| vec![s])
                .unwrap_or_else(|| intent.param_list(key))
            {
                if let Some(iso2) = CountryResolver::normalize(&raw) {
                    if !out.contains(&iso2.to_string()) {
                        out.push(iso2.to_string());
                    }
                } else if let Some(members) =
                    CountryResolver::expand_region(&raw, econfed_catalog::CodeFormat::Iso2)
                {
                    for m in members {
                        if !out.contains(&m) {
                            out.push(m);
                        }
                    }
                }
            }
        }
        if out.is_empty() {
            out = CountryResolver::detect_all_countries_in_query(query);
        }
        if out.is_empty() {
            out = CountryResolver::expand_regions_in_query(query);
        }
        out
    }

    /// Route an intent to its primary provider.
    #[must_use]
    pub fn route(intent: &ParsedIntent, catalog: &Catalog) -> RoutingDecision {
        let query = intent.original_query.as_str();
        let lower = query.to_ascii_lowercase();

        // 1. Explicit user choice is locked in; nothing below may override.
        if let Some(provider) = Self::detect_explicit_provider(query) {
            let mut decision = RoutingDecision::explicit(
                provider,
                format!("user named {provider} in the query"),
            );
            decision.validation_warning = Self::validate_routing(provider, &lower);
            return decision;
        }

        let mut decision = Self::route_unlocked(intent, query, &lower);

        // 4. Catalog availability override (never over an explicit choice).
        if let Some(first_indicator) = intent.indicators.first()
            && let Some(concept) = catalog.find_concept_by_term(first_indicator)
            && !catalog.is_provider_available(concept, decision.provider)
        {
            let countries = Self::countries_of(intent, query);
            if let Some((better, _, _)) = catalog.get_best_provider(concept, &countries, None) {
                decision = RoutingDecision::routed(
                    better,
                    format!(
                        "{} lacks '{concept}' per the catalog; re-routed to {better}",
                        decision.provider
                    ),
                );
            }
        }

        decision.validation_warning = Self::validate_routing(decision.provider, &lower);
        decision
    }

    fn route_unlocked(intent: &ParsedIntent, query: &str, lower: &str) -> RoutingDecision {
        // 2. Parser-declared provider.
        if let Some(name) = intent.provider.as_deref()
            && let Some(provider) = Provider::parse(name)
        {
            return RoutingDecision::routed(provider, "provider declared by the intent parser");
        }

        let countries = Self::countries_of(intent, query);
        let indicator_text = intent.indicators.join(" ").to_ascii_lowercase();
        let text = format!("{lower} {indicator_text}");

        // 3. Deterministic rules, most specific first.
        if CRYPTO_TOKENS.iter().any(|t| contains_token(&text, t)) {
            return RoutingDecision::routed(Provider::CoinGecko, "crypto token in query");
        }

        if Self::detect_currency_pair(query)
            || intent.param_str("baseCurrency").is_some()
            || text.contains("exchange rate")
        {
            if Self::has_historical_intent(intent, lower) {
                return RoutingDecision::routed(
                    Provider::Fred,
                    "currency pair with historical intent routes to FRED bilateral series",
                );
            }
            if Self::detect_currency_pair(query) || intent.param_str("baseCurrency").is_some() {
                return RoutingDecision::routed(
                    Provider::ExchangeRate,
                    "currency pair without historical intent",
                );
            }
        }

        let trade_flow_words =
            text.contains("export") || text.contains("import") || text.contains("trade balance");
        let has_partner = intent.param_str("partner").is_some()
            || intent.param_str("reporter").is_some()
            || text.contains(" partner");
        if trade_flow_words && has_partner {
            return RoutingDecision::routed(Provider::Comtrade, "trade flow with a partner");
        }

        if countries == ["CA"] || lower.contains("canadian") {
            return RoutingDecision::routed(Provider::StatsCan, "Canada-specific query");
        }

        if BIS_CONCEPT_TOKENS.iter().any(|t| text.contains(t)) {
            return RoutingDecision::routed(Provider::Bis, "BIS-specific concept");
        }

        if US_ONLY_TOKENS.iter().any(|t| text.contains(t)) {
            return RoutingDecision::routed(Provider::Fred, "US-only series");
        }

        if !countries.is_empty()
            && countries.len() < 25
            && countries.iter().all(|c| CountryResolver::is_eu_member(c))
        {
            return RoutingDecision::routed(Provider::Eurostat, "EU member statistics");
        }

        if FISCAL_TOKENS.iter().any(|t| text.contains(t)) {
            return RoutingDecision::routed(Provider::Imf, "fiscal/debt/balance-of-payments");
        }

        if countries.len() > 1 && DEVELOPMENT_TOKENS.iter().any(|t| contains_token(&text, t)) {
            return RoutingDecision::routed(
                Provider::WorldBank,
                "multi-country development statistics",
            );
        }

        if countries == ["US"] || countries.is_empty() {
            return RoutingDecision::routed(Provider::Fred, "US or unspecified geography default");
        }
        RoutingDecision::routed(Provider::WorldBank, "broad-coverage default")
    }

    /// Informational warnings for suspicious routings; never a failure.
    fn validate_routing(provider: Provider, lower_query: &str) -> Option<String> {
        if provider == Provider::Fred
            && (lower_query.contains("trade balance") || lower_query.contains("bilateral trade"))
        {
            return Some(
                "trade data routed to FRED; Comtrade usually has the richer partner breakdown"
                    .to_string(),
            );
        }
        if provider == Provider::Bis && lower_query.contains("productivity") {
            return Some("BIS does not publish productivity data".to_string());
        }
        if provider == Provider::StatsCan && !lower_query.contains("canad") {
            return Some("StatsCan covers Canada only".to_string());
        }
        None
    }
}

/// Word-boundary containment for single-word tokens; phrases fall back to
/// substring containment.
fn contains_token(text: &str, token: &str) -> bool {
    if token.contains(' ') {
        return text.contains(token);
    }
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word == token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use econfed_catalog::Catalog;

    fn intent(query: &str, indicators: &[&str]) -> ParsedIntent {
        let mut i = ParsedIntent::for_indicator(
            indicators.first().copied().unwrap_or_default(),
            query,
        );
        i.indicators = indicators.iter().map(|s| (*s).to_string()).collect();
        i
    }

    #[test]
    fn explicit_mention_locks_the_provider() {
        let catalog = Catalog::builtin();
        for (query, expected) in [
            ("unemployment from OECD", Provider::Oecd),
            ("GDP according to the international monetary fund", Provider::Imf),
            ("inflation via FRED", Provider::Fred),
        ] {
            let decision = ProviderRouter::route(&intent(query, &["unemployment"]), &catalog);
            assert_eq!(decision.provider, expected, "{query}");
            assert!(decision.is_explicit_user_choice);
        }
    }

    #[test]
    fn explicit_choice_survives_catalog_unavailability() {
        let catalog = Catalog::builtin();
        // The catalog marks BIS as lacking productivity, but the user asked.
        let decision =
            ProviderRouter::route(&intent("productivity from BIS", &["productivity"]), &catalog);
        assert_eq!(decision.provider, Provider::Bis);
        assert!(decision.is_explicit_user_choice);
    }

    #[test]
    fn catalog_override_reroutes_unavailable_concepts() {
        let catalog = Catalog::builtin();
        let mut i = intent("labor productivity trend", &["productivity"]);
        i.provider = Some("BIS".into());
        let decision = ProviderRouter::route(&i, &catalog);
        assert_ne!(decision.provider, Provider::Bis);
    }

    #[test]
    fn currency_pairs_route_by_historical_intent() {
        let catalog = Catalog::builtin();
        let spot = ProviderRouter::route(&intent("USD to EUR", &["exchange rate"]), &catalog);
        assert_eq!(spot.provider, Provider::ExchangeRate);

        let mut historical = intent("USD to EUR", &["exchange rate"]);
        historical.set_param("startDate", "2018-01-01");
        let decision = ProviderRouter::route(&historical, &catalog);
        assert_eq!(decision.provider, Provider::Fred);
    }

    #[test]
    fn crypto_routes_to_coingecko() {
        let catalog = Catalog::builtin();
        let decision = ProviderRouter::route(&intent("bitcoin price last month", &["bitcoin"]), &catalog);
        assert_eq!(decision.provider, Provider::CoinGecko);
    }

    #[test]
    fn canada_routes_to_statscan() {
        let catalog = Catalog::builtin();
        let decision = ProviderRouter::route(
            &intent("Canada unemployment rate", &["unemployment rate"]),
            &catalog,
        );
        assert_eq!(decision.provider, Provider::StatsCan);
    }

    #[test]
    fn eu_members_route_to_eurostat() {
        let catalog = Catalog::builtin();
        let decision = ProviderRouter::route(
            &intent("unemployment in Germany and France", &["unemployment rate"]),
            &catalog,
        );
        assert_eq!(decision.provider, Provider::Eurostat);
    }

    #[test]
    fn multi_country_gdp_routes_to_worldbank() {
        let catalog = Catalog::builtin();
        let decision = ProviderRouter::route(
            &intent("GDP growth for G7 countries", &["GDP growth"]),
            &catalog,
        );
        assert_eq!(decision.provider, Provider::WorldBank);
    }

    #[test]
    fn policy_rates_route_to_bis() {
        let catalog = Catalog::builtin();
        let decision = ProviderRouter::route(
            &intent("policy rate for Japan", &["policy rate"]),
            &catalog,
        );
        assert_eq!(decision.provider, Provider::Bis);
    }

    #[test]
    fn trade_balance_to_fred_warns_but_does_not_fail() {
        let catalog = Catalog::builtin();
        let decision = ProviderRouter::route(
            &intent("US trade balance from FRED", &["trade balance"]),
            &catalog,
        );
        assert_eq!(decision.provider, Provider::Fred);
        assert!(decision.validation_warning.is_some());
    }
}
