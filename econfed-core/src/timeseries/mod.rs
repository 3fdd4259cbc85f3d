//! Time-series helpers: period parsing and numeric normalization.

pub mod normalize;
pub mod period;

pub use normalize::{dedup_keep_max_magnitude, is_percent_unit, normalize_percent};
pub use period::{parse_period, quarter_start_month};
