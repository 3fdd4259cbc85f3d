//! Static fallback chains and per-provider no-data suggestions.

use econfed_types::Provider;

/// Provider-to-provider fallback chains, tried after resolver- and
/// catalog-driven candidates.
#[must_use]
pub fn static_fallback_chain(primary: Provider) -> &'static [Provider] {
    use Provider::*;
    match primary {
        WorldBank => &[Oecd, Imf, Eurostat],
        Oecd => &[WorldBank, Eurostat, Imf],
        Eurostat => &[WorldBank, Oecd, Imf],
        Imf => &[WorldBank, Oecd, Bis],
        Bis => &[Imf, WorldBank, Oecd],
        StatsCan => &[WorldBank, Oecd, Imf],
        Fred => &[WorldBank, Oecd, Imf],
        ExchangeRate => &[Fred, Bis],
        CoinGecko => &[Fred],
        Comtrade => &[WorldBank],
    }
}

/// User-facing suggestion lines for a provider that returned no data.
#[must_use]
pub fn no_data_suggestions(provider: Provider) -> Vec<String> {
    let base: &[&str] = match provider {
        Provider::Imf => &[
            "Try alternative providers: World Bank or OECD may have similar data.",
            "Check country coverage: IMF does not have data for all countries.",
            "IMF primarily provides recent WEO-vintage indicators.",
        ],
        Provider::Bis => &[
            "Try alternative providers: World Bank or FRED may have property/credit data.",
            "BIS focuses on property prices, credit, and banking data.",
            "BIS covers roughly 60 major economies.",
        ],
        Provider::Oecd => &[
            "Try alternative providers: World Bank has broader country coverage.",
            "OECD data primarily covers member countries.",
            "OECD uses specific dataflow codes; check the indicator name.",
        ],
        Provider::Eurostat => &[
            "Eurostat covers EU member states only.",
            "Try World Bank for broader European or global data.",
            "Eurostat uses specific dataset codes (e.g. une_rt_a).",
        ],
        Provider::Comtrade => &[
            "UN Comtrade identifies countries by numeric codes; check the country spelling.",
            "Recent years may not be reported yet.",
            "Region partners like 'Asia' need expansion to individual countries.",
        ],
        Provider::StatsCan => &[
            "Statistics Canada covers Canadian data only.",
            "Try World Bank for Canadian data with global comparison.",
            "StatsCan series are addressed by table/vector ids.",
        ],
        Provider::WorldBank => &[
            "World Bank indicators use specific codes (e.g. NY.GDP.MKTP.CD).",
            "Some indicators have one-to-two-year reporting delays.",
            "Regional aggregates are available under region names.",
        ],
        Provider::Fred => &[
            "FRED primarily covers US economic data.",
            "Try World Bank for non-US countries.",
            "Check that the FRED series id is correct.",
        ],
        Provider::CoinGecko => &[
            "Use canonical coin ids (e.g. 'bitcoin', 'ethereum').",
            "Some coins have limited history.",
            "The free tier caps history at 365 days.",
        ],
        Provider::ExchangeRate => &[
            "Use ISO currency codes (e.g. USD, EUR, GBP).",
            "The free tier serves current rates only.",
            "Try FRED for major currency pairs with history.",
        ],
    };
    let mut out: Vec<String> = base.iter().map(|s| (*s).to_string()).collect();
    let chain = static_fallback_chain(provider);
    if !chain.is_empty() {
        let names: Vec<&str> = chain.iter().map(|p| p.as_str()).collect();
        out.push(format!("Alternative providers to try: {}", names.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_never_contain_their_primary() {
        for provider in Provider::ALL {
            assert!(
                !static_fallback_chain(provider).contains(&provider),
                "{provider} falls back to itself"
            );
        }
    }

    #[test]
    fn suggestions_always_include_alternatives() {
        for provider in Provider::ALL {
            let lines = no_data_suggestions(provider);
            assert!(lines.last().unwrap().contains("Alternative providers"));
        }
    }
}
