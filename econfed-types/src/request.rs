//! The normalized fetch request every adapter receives, plus indicator
//! resolution results.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Frequency, Provider};

/// Trade flow direction for Comtrade-style queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeFlow {
    /// Goods leaving the reporter.
    Export,
    /// Goods entering the reporter.
    Import,
}

impl TradeFlow {
    /// Parse the common textual forms.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "export" | "exports" | "x" => Some(Self::Export),
            "import" | "imports" | "m" => Some(Self::Import),
            _ => None,
        }
    }

    /// The opposite direction (used for partner-perspective flips).
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Export => Self::Import,
            Self::Import => Self::Export,
        }
    }

    /// Comtrade flow code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Export => "X",
            Self::Import => "M",
        }
    }
}

/// Fully-defaulted, normalized parameters for one upstream fetch.
///
/// Parameter defaulting (country/countries unification, window defaults,
/// frequency normalization, currency-pair extraction) happens exactly once,
/// before cache lookup; adapters and the cache key both consume this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FetchRequest {
    /// Free-text indicator term (possibly a raw provider code).
    pub indicator: String,
    /// Resolved provider-native series/indicator code, when known.
    pub series_id: Option<String>,
    /// Requested geographies as ISO-3166-1 alpha-2 codes. Always a list;
    /// single-country requests carry one element.
    pub countries: Vec<String>,
    /// Window start (inclusive).
    pub start_date: Option<NaiveDate>,
    /// Window end (inclusive).
    pub end_date: Option<NaiveDate>,
    /// Requested cadence.
    pub frequency: Option<Frequency>,
    /// Currency pair base (ExchangeRate / FRED bilateral).
    pub base_currency: Option<String>,
    /// Currency pair target.
    pub target_currency: Option<String>,
    /// Comtrade reporter country (name or code; adapter maps it).
    pub reporter: Option<String>,
    /// Comtrade partner country or region label.
    pub partner: Option<String>,
    /// Comtrade HS commodity code or label.
    pub commodity: Option<String>,
    /// Comtrade flow direction.
    pub flow: Option<TradeFlow>,
    /// CoinGecko coin identifiers.
    pub coin_ids: Vec<String>,
    /// CoinGecko quote currency.
    pub vs_currency: Option<String>,
    /// CoinGecko history window in days.
    pub days: Option<u32>,
    /// Categorical breakdown hints (StatsCan, BIS, Eurostat).
    pub dimensions: BTreeMap<String, String>,
}

impl FetchRequest {
    /// A request for one indicator over one country.
    #[must_use]
    pub fn indicator_for_country(indicator: impl Into<String>, iso2: impl Into<String>) -> Self {
        Self {
            indicator: indicator.into(),
            countries: vec![iso2.into()],
            ..Self::default()
        }
    }

    /// First requested country, if any.
    #[must_use]
    pub fn first_country(&self) -> Option<&str> {
        self.countries.first().map(String::as_str)
    }

    /// Clone with a different country list (used by per-country fan-out).
    #[must_use]
    pub fn with_countries(&self, countries: Vec<String>) -> Self {
        Self {
            countries,
            ..self.clone()
        }
    }
}

/// Where an indicator resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    /// Exact or ranked hit in the local indicator index.
    Database,
    /// Cross-provider universal-concept translation.
    Translator,
    /// Concept catalog mapping.
    Catalog,
    /// Last-resort fallback.
    Fallback,
}

/// Result of resolving a free-text indicator term to a provider code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedIndicator {
    /// Provider-native indicator code.
    pub code: String,
    /// Provider the code belongs to.
    pub provider: Provider,
    /// Human-readable indicator name.
    pub name: String,
    /// Resolution confidence, always within [0, 1].
    pub confidence: f64,
    /// Which resolution stage produced the hit.
    pub source: ResolutionSource,
    /// Extra metadata from the index record, when available.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}
