//! JSON-stat 2.0 decoding.
//!
//! JSON-stat flattens an n-dimensional cube into one array (or sparse
//! map) of values; `id` lists the dimensions in nesting order and `size`
//! their cardinalities. Reading a (dimension, time) slice means computing
//! the flat position for each time index with all other dimensions pinned.

use std::collections::BTreeMap;

use serde::Deserialize;

use econfed_types::{FedError, Provider};

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JsonStatCategory {
    /// Category value id to its position within the dimension.
    #[serde(default)]
    pub index: BTreeMap<String, usize>,
    /// Category value id to display label.
    #[serde(default)]
    pub label: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JsonStatDimension {
    pub category: JsonStatCategory,
}

/// A decoded JSON-stat 2.0 dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonStatDataset {
    /// Sparse flat-position to value map.
    #[serde(default)]
    value: BTreeMap<String, serde_json::Value>,
    /// Dimension ids in nesting order.
    #[serde(default)]
    id: Vec<String>,
    /// Dimension cardinalities, aligned with `id`.
    #[serde(default)]
    size: Vec<usize>,
    #[serde(default)]
    dimension: BTreeMap<String, JsonStatDimension>,
    /// Dataset label, when present.
    #[serde(default)]
    pub label: Option<String>,
}

impl JsonStatDataset {
    /// Parse a JSON-stat 2.0 body.
    pub fn parse(provider: Provider, body: &str) -> Result<Self, FedError> {
        let dataset: Self = serde_json::from_str(body)
            .map_err(|err| FedError::decode(provider, format!("JSON-stat parse failure: {err}")))?;
        if dataset.dimension.is_empty() {
            return Err(FedError::decode(
                provider,
                "JSON-stat body carries no dimension metadata",
            ));
        }
        Ok(dataset)
    }

    /// Time labels in index order.
    #[must_use]
    pub fn time_labels(&self) -> Vec<String> {
        let Some(time) = self.dimension.get("time") else {
            return Vec::new();
        };
        let mut ordered: Vec<(usize, &String)> = time
            .category
            .index
            .iter()
            .map(|(label, idx)| (*idx, label))
            .collect();
        ordered.sort_by_key(|(idx, _)| *idx);
        ordered.into_iter().map(|(_, label)| label.clone()).collect()
    }

    /// Category index of a value within a named dimension.
    #[must_use]
    pub fn category_index(&self, dimension: &str, value: &str) -> Option<usize> {
        self.dimension
            .get(dimension)?
            .category
            .index
            .get(value)
            .copied()
    }

    /// Display label of a category value.
    #[must_use]
    pub fn category_label(&self, dimension: &str, value: &str) -> Option<&str> {
        self.dimension
            .get(dimension)?
            .category
            .label
            .get(value)
            .map(String::as_str)
    }

    /// All category ids of a dimension, in index order.
    #[must_use]
    pub fn category_ids(&self, dimension: &str) -> Vec<String> {
        let Some(dim) = self.dimension.get(dimension) else {
            return Vec::new();
        };
        let mut ordered: Vec<(usize, &String)> =
            dim.category.index.iter().map(|(id, idx)| (*idx, id)).collect();
        ordered.sort_by_key(|(idx, _)| *idx);
        ordered.into_iter().map(|(_, id)| id.clone()).collect()
    }

    /// Read the time series with every non-time dimension pinned to the
    /// given category index (missing entries default to position 0).
    ///
    /// Returns `(time label, value)` pairs in time order; absent flat
    /// positions are reported as `None` (a gap).
    #[must_use]
    pub fn time_slice(&self, pinned: &BTreeMap<String, usize>) -> Vec<(String, Option<f64>)> {
        let Some(time) = self.dimension.get("time") else {
            return Vec::new();
        };
        let mut ordered: Vec<(usize, &String)> = time
            .category
            .index
            .iter()
            .map(|(label, idx)| (*idx, label))
            .collect();
        ordered.sort_by_key(|(idx, _)| *idx);

        let usable_arithmetic = self.id.len() == self.size.len() && !self.id.is_empty();

        ordered
            .into_iter()
            .map(|(time_index, label)| {
                let position = if usable_arithmetic {
                    self.flat_position(time_index, pinned)
                } else {
                    Some(time_index)
                };
                let value = position
                    .and_then(|p| self.value.get(&p.to_string()))
                    .and_then(serde_json::Value::as_f64);
                (label.clone(), value)
            })
            .collect()
    }

    /// Flat position with `time` at `time_index` and other dimensions at
    /// their pinned (or zeroth) category.
    fn flat_position(&self, time_index: usize, pinned: &BTreeMap<String, usize>) -> Option<usize> {
        let mut position = 0usize;
        let mut multiplier = 1usize;
        // Work backwards: the last dimension varies fastest.
        for (dim_id, dim_size) in self.id.iter().zip(self.size.iter()).rev() {
            let index = if dim_id == "time" {
                time_index
            } else {
                pinned.get(dim_id).copied().unwrap_or(0)
            };
            if index >= *dim_size {
                return None;
            }
            position += index * multiplier;
            multiplier *= dim_size;
        }
        Some(position)
    }
}
