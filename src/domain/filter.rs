//! Categorical row filtering.

use crate::domain::dataset::Dataset;
use std::collections::{BTreeMap, BTreeSet};

/// Allowed values per categorical column.
///
/// A row passes when, for every constrained column the dataset actually has,
/// the row's value (compared as text) is in the allowed set. Constraints on
/// columns the dataset lacks are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    allowed: BTreeMap<String, BTreeSet<String>>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new spec with the column constrained to `values`.
    pub fn with<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed
            .entry(column.to_string())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn allowed(&self, column: &str) -> Option<&BTreeSet<String>> {
        self.allowed.get(column)
    }

    pub fn apply(&self, dataset: &Dataset) -> Dataset {
        let active: Vec<(usize, &BTreeSet<String>)> = self
            .allowed
            .iter()
            .filter_map(|(col, values)| dataset.column_index(col).map(|i| (i, values)))
            .collect();

        let rows = dataset
            .rows
            .iter()
            .filter(|row| {
                active
                    .iter()
                    .all(|(i, values)| values.contains(&row[*i].to_string()))
            })
            .cloned()
            .collect();

        Dataset {
            name: dataset.name.clone(),
            columns: dataset.columns.clone(),
            rows,
        }
    }
}
