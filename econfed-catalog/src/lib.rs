//! econfed-catalog
//!
//! The single source of truth for identifier resolution:
//!
//! - `catalog`: YAML-defined economic concepts (synonyms, exclusions,
//!   per-provider codes, coverage, confidence).
//! - `country`: country and region group resolution across code schemes.
//! - `translator`: universal-concept translation between provider code
//!   spaces, including IMF-style codes.
//! - `index`: the local indicator index with lexical search and the
//!   learned-mapping store.
//! - `resolver`: the unified indicator resolver layered over all of the
//!   above.
#![warn(missing_docs)]

pub mod catalog;
pub mod country;
pub mod index;
pub mod resolver;
pub mod translator;

pub use catalog::{Catalog, Concept, Coverage};
pub use country::{CodeFormat, CountryResolver, RegionGroup};
pub use index::{IndicatorIndex, IndicatorRecord};
pub use resolver::IndicatorResolver;
pub use translator::IndicatorTranslator;
