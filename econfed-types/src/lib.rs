//! econfed-specific data transfer objects and configuration primitives.
#![warn(missing_docs)]

mod config;
mod error;
mod intent;
mod provider;
mod request;
mod routing;
mod series;

pub use config::{CacheConfig, FedConfig, ProviderKeys, RateLimitConfig, RetryConfig};
pub use error::FedError;
pub use intent::{Decomposition, ParsedIntent};
pub use provider::Provider;
pub use request::{FetchRequest, ResolutionSource, ResolvedIndicator, TradeFlow};
pub use routing::RoutingDecision;
pub use series::{DataType, Frequency, Point, PriceType, Series, SeriesMeta};
