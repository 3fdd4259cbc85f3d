//! The closed set of upstream statistical data providers.

use serde::{Deserialize, Serialize};

/// Tag identifying one of the supported upstream providers.
///
/// The set is closed on purpose: routing, caching, rate limiting, and
/// fallback chains are all keyed by this tag, and adapter dispatch is a
/// table lookup rather than string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    /// Federal Reserve Economic Data (St. Louis Fed).
    Fred,
    /// World Bank open data.
    WorldBank,
    /// IMF DataMapper (WEO indicators).
    Imf,
    /// Bank for International Settlements statistics.
    Bis,
    /// Eurostat dissemination API.
    Eurostat,
    /// OECD statistics.
    Oecd,
    /// UN Comtrade trade flows.
    Comtrade,
    /// Statistics Canada WDS.
    StatsCan,
    /// ExchangeRate-API spot currency rates.
    ExchangeRate,
    /// CoinGecko cryptocurrency market data.
    CoinGecko,
}

impl Provider {
    /// All providers, in canonical order.
    pub const ALL: [Self; 10] = [
        Self::Fred,
        Self::WorldBank,
        Self::Imf,
        Self::Bis,
        Self::Eurostat,
        Self::Oecd,
        Self::Comtrade,
        Self::StatsCan,
        Self::ExchangeRate,
        Self::CoinGecko,
    ];

    /// Canonical display name used in metadata and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fred => "FRED",
            Self::WorldBank => "WorldBank",
            Self::Imf => "IMF",
            Self::Bis => "BIS",
            Self::Eurostat => "Eurostat",
            Self::Oecd => "OECD",
            Self::Comtrade => "Comtrade",
            Self::StatsCan => "StatsCan",
            Self::ExchangeRate => "ExchangeRate",
            Self::CoinGecko => "CoinGecko",
        }
    }

    /// Parse a provider name, folding the alias table the upstream ecosystem
    /// uses ("World Bank", "UN COMTRADE", "statistics canada", ...).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let folded: String = name
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "fred" | "federalreserve" | "stlouisfed" => Some(Self::Fred),
            "worldbank" | "wb" => Some(Self::WorldBank),
            "imf" | "internationalmonetaryfund" | "imfdatamapper" => Some(Self::Imf),
            "bis" | "bankforinternationalsettlements" => Some(Self::Bis),
            "eurostat" => Some(Self::Eurostat),
            "oecd" => Some(Self::Oecd),
            "comtrade" | "uncomtrade" | "unitednationscomtrade" => Some(Self::Comtrade),
            "statscan" | "statisticscanada" | "statcan" | "statscanada" => Some(Self::StatsCan),
            "exchangerate" | "exchangerateapi" => Some(Self::ExchangeRate),
            "coingecko" | "coingeckoapi" => Some(Self::CoinGecko),
            _ => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown provider: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_aliases() {
        assert_eq!(Provider::parse("World Bank"), Some(Provider::WorldBank));
        assert_eq!(Provider::parse("UN COMTRADE"), Some(Provider::Comtrade));
        assert_eq!(Provider::parse("statistics canada"), Some(Provider::StatsCan));
        assert_eq!(Provider::parse("fred"), Some(Provider::Fred));
        assert_eq!(Provider::parse("Exchange-Rate API"), Some(Provider::ExchangeRate));
        assert_eq!(Provider::parse("bloomberg"), None);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for p in Provider::ALL {
            assert_eq!(Provider::parse(p.as_str()), Some(p));
        }
    }
}
