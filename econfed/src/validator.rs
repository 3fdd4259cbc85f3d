//! Data value validation.
//!
//! Sanity checks per indicator category: expected ranges, percentage
//! bounds, sign constraints. The orchestrator logs validation results and
//! returns upstream data unchanged; this layer is observability, not
//! filtering.

use econfed_types::Series;

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    /// Might be fine.
    Info,
    /// Suspicious but possible.
    Warning,
    /// Likely wrong data.
    Error,
    /// Definitely wrong.
    Critical,
}

/// One issue found while validating a series.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Issue severity.
    pub severity: ValidationSeverity,
    /// Operator-facing description.
    pub message: String,
}

/// Outcome of validating one series.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// False when any critical issue was found.
    pub valid: bool,
    /// All issues found.
    pub issues: Vec<ValidationIssue>,
    /// Confidence that the data is correct, in [0, 1].
    pub confidence: f64,
}

/// Indicator categories with expected value ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Gdp,
    GdpGrowth,
    GdpPerCapita,
    Unemployment,
    EmploymentRate,
    Inflation,
    Cpi,
    InterestRate,
    Exports,
    Imports,
    TradeBalance,
    PropertyPriceIndex,
    ExchangeRate,
    CryptoPrice,
    Population,
    DebtToGdp,
}

impl Category {
    /// (min, max) sanity range; not strict limits.
    const fn range(self) -> (f64, f64) {
        match self {
            Self::Gdp => (1e9, 100e12),
            Self::GdpGrowth => (-50.0, 50.0),
            Self::GdpPerCapita => (100.0, 200_000.0),
            Self::Unemployment => (0.0, 50.0),
            Self::EmploymentRate => (20.0, 100.0),
            Self::Inflation => (-20.0, 100.0),
            Self::Cpi => (0.0, 500.0),
            Self::InterestRate => (-5.0, 50.0),
            Self::Exports | Self::Imports => (1e6, 5e12),
            Self::TradeBalance => (-1e12, 1e12),
            Self::PropertyPriceIndex => (0.0, 500.0),
            Self::ExchangeRate => (0.0001, 10_000.0),
            Self::CryptoPrice => (0.000_001, 1e6),
            Self::Population => (1_000.0, 2e10),
            Self::DebtToGdp => (0.0, 300.0),
        }
    }

    /// Percentages that cannot legitimately exceed 100.
    const fn bounded_percentage(self) -> bool {
        matches!(
            self,
            Self::Unemployment | Self::EmploymentRate | Self::InterestRate
        )
    }

    /// Values that cannot legitimately be negative.
    const fn nonnegative(self) -> bool {
        matches!(
            self,
            Self::Unemployment
                | Self::Population
                | Self::Exports
                | Self::Imports
                | Self::Gdp
                | Self::Cpi
                | Self::CryptoPrice
        )
    }
}

/// (name fragment, category) detection table; first hit wins.
const PATTERNS: &[(&str, Category)] = &[
    ("gdp per capita", Category::GdpPerCapita),
    ("per capita", Category::GdpPerCapita),
    ("gdp growth", Category::GdpGrowth),
    ("gross domestic product", Category::Gdp),
    ("unemployment", Category::Unemployment),
    ("jobless", Category::Unemployment),
    ("employment rate", Category::EmploymentRate),
    ("inflation", Category::Inflation),
    ("consumer price", Category::Cpi),
    ("cpi", Category::Cpi),
    ("interest rate", Category::InterestRate),
    ("policy rate", Category::InterestRate),
    ("federal funds", Category::InterestRate),
    ("export", Category::Exports),
    ("import", Category::Imports),
    ("trade balance", Category::TradeBalance),
    ("property price", Category::PropertyPriceIndex),
    ("house price", Category::PropertyPriceIndex),
    ("home price", Category::PropertyPriceIndex),
    ("exchange rate", Category::ExchangeRate),
    ("bitcoin", Category::CryptoPrice),
    ("ethereum", Category::CryptoPrice),
    ("crypto", Category::CryptoPrice),
    ("population", Category::Population),
    ("debt to gdp", Category::DebtToGdp),
    ("debt", Category::DebtToGdp),
    ("growth", Category::GdpGrowth),
    ("gdp", Category::Gdp),
];

/// The validator. Stateless; construct once and share.
#[derive(Default)]
pub struct DataValidator;

impl DataValidator {
    /// Validate one series.
    #[must_use]
    pub fn validate(&self, series: &Series) -> ValidationResult {
        let mut issues = Vec::new();

        let values: Vec<f64> = series.points.iter().filter_map(|p| p.value).collect();
        if values.is_empty() {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Error,
                message: "series has no non-null values".to_string(),
            });
            return finish(issues);
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let Some(category) = detect_category(series) else {
            return finish(issues);
        };
        let (range_min, range_max) = category.range();

        if range_min >= 0.0 && min < range_min * 0.01 {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Warning,
                message: format!(
                    "minimum {min:.2} is far below the expected floor {range_min:.0} for {category:?}"
                ),
            });
        }
        if max > range_max * 100.0 {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Warning,
                message: format!(
                    "maximum {max:.2} is far above the expected ceiling {range_max:.0} for {category:?}"
                ),
            });
        }

        if category.bounded_percentage() && max > 100.0 {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Error,
                message: format!("{max:.2}% exceeds 100% for {category:?}"),
            });
        }
        if category.nonnegative() && min < 0.0 {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Error,
                message: format!("negative value {min:.2} for non-negative {category:?}"),
            });
        }

        finish(issues)
    }

    /// Validate and log a batch; data passes through untouched.
    pub fn validate_and_log(&self, series_list: &[Series]) {
        for series in series_list {
            let result = self.validate(series);
            if result.valid && result.confidence >= 0.8 {
                tracing::debug!(
                    target: "econfed::validator",
                    series = %series.meta.series_id,
                    confidence = result.confidence,
                    "validation passed"
                );
            } else {
                for issue in &result.issues {
                    tracing::warn!(
                        target: "econfed::validator",
                        series = %series.meta.series_id,
                        severity = ?issue.severity,
                        "{}",
                        issue.message
                    );
                }
            }
        }
    }
}

fn detect_category(series: &Series) -> Option<Category> {
    let indicator = series.meta.indicator.to_ascii_lowercase();
    for (pattern, category) in PATTERNS {
        if indicator.contains(pattern) {
            return Some(*category);
        }
    }
    let unit = series.meta.unit.to_ascii_lowercase();
    if unit.contains('%') || unit.contains("percent") {
        return Some(if indicator.contains("gdp") {
            Category::GdpGrowth
        } else {
            Category::Inflation
        });
    }
    None
}

fn finish(issues: Vec<ValidationIssue>) -> ValidationResult {
    let mut confidence: f64 = 1.0;
    for issue in &issues {
        confidence -= match issue.severity {
            ValidationSeverity::Critical => 0.5,
            ValidationSeverity::Error => 0.3,
            ValidationSeverity::Warning => 0.1,
            ValidationSeverity::Info => 0.02,
        };
    }
    let valid = !issues
        .iter()
        .any(|i| i.severity == ValidationSeverity::Critical);
    ValidationResult {
        valid,
        issues,
        confidence: confidence.max(0.0),
    }
}
