//! econfed-providers
//!
//! One adapter per upstream statistical API, all implementing the
//! [`ProviderAdapter`](econfed_core::ProviderAdapter) contract, plus the
//! two shared wire codecs (SDMX-JSON and JSON-stat 2.0).
//!
//! Adapters own everything provider-specific: identifier mapping, request
//! shaping, decoding, best-series selection for multi-dimensional
//! datasets, and converting upstream failures into the shared error
//! taxonomy. Country and indicator resolution is delegated to
//! `econfed-catalog`; adapters keep only small fallback maps for
//! provider-proprietary quirks.
#![warn(missing_docs)]

pub mod bis;
pub mod coingecko;
pub mod comtrade;
pub mod eurostat;
pub mod exchangerate;
pub mod fred;
pub mod imf;
pub mod jsonstat;
pub mod oecd;
pub mod sdmx;
pub mod statscan;
pub mod worldbank;

pub use bis::BisAdapter;
pub use coingecko::CoinGeckoAdapter;
pub use comtrade::ComtradeAdapter;
pub use eurostat::EurostatAdapter;
pub use exchangerate::ExchangeRateAdapter;
pub use fred::FredAdapter;
pub use imf::ImfAdapter;
pub use oecd::OecdAdapter;
pub use statscan::StatsCanAdapter;
pub use worldbank::WorldBankAdapter;
