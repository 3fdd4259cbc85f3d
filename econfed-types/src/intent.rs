//! Structured intent produced by the external natural-language parser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Instruction to split one user query into per-entity subqueries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decomposition {
    /// Kind of split (e.g. "by_country", "by_province").
    pub kind: String,
    /// Entities to expand over, in the order results must be returned.
    pub entities: Vec<String>,
}

/// Parsed query intent, as delivered by the external LLM parsing service.
///
/// The federation core treats this as input: it fills defaults, normalizes
/// parameters into a [`FetchRequest`](crate::FetchRequest), and routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
    /// Provider the parser believes the user wants, if any.
    #[serde(default)]
    pub provider: Option<String>,
    /// Free-text indicator terms, in query order.
    #[serde(default)]
    pub indicators: Vec<String>,
    /// Recognized parameter keys (country, countries, startDate, endDate,
    /// frequency, baseCurrency, targetCurrency, reporter, partner,
    /// commodity, flow, coinIds, vsCurrency, days, dimensions, ...).
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// The verbatim user query.
    #[serde(default)]
    pub original_query: String,
    /// Parser confidence in [0, 1].
    #[serde(default)]
    pub confidence: f64,
    /// Whether the parser wants the caller to clarify before fetching.
    #[serde(default)]
    pub needs_clarification: bool,
    /// Clarification questions, when `needs_clarification` is set.
    #[serde(default)]
    pub clarification_questions: Vec<String>,
    /// Optional decomposition instruction.
    #[serde(default)]
    pub decomposition: Option<Decomposition>,
}

impl ParsedIntent {
    /// Minimal intent around a single indicator term and the original query.
    #[must_use]
    pub fn for_indicator(indicator: impl Into<String>, original_query: impl Into<String>) -> Self {
        Self {
            provider: None,
            indicators: vec![indicator.into()],
            parameters: BTreeMap::new(),
            original_query: original_query.into(),
            confidence: 1.0,
            needs_clarification: false,
            clarification_questions: Vec::new(),
            decomposition: None,
        }
    }

    /// String-typed parameter accessor, tolerating JSON strings and numbers.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<String> {
        match self.parameters.get(key)? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// List-typed parameter accessor.
    #[must_use]
    pub fn param_list(&self, key: &str) -> Vec<String> {
        match self.parameters.get(key) {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(serde_json::Value::String(s)) if !s.is_empty() => {
                s.split(',').map(|p| p.trim().to_string()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Set a string parameter, replacing any existing value.
    pub fn set_param(&mut self, key: &str, value: impl Into<String>) {
        self.parameters
            .insert(key.to_string(), serde_json::Value::String(value.into()));
    }
}
