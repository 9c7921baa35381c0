//! Cross-dataset derived metrics.
//!
//! For each requested measure column `c`, two row-aligned datasets `a` and
//! `b` produce:
//! - `c_sum`        = a + b
//! - `c_diff`       = b - a
//! - `c_pct_change` = (b - a) / a * 100, rounded to 2 decimals
//!
//! Two further named metrics can be requested on top of those:
//! - `c_mean`        = (a + b) / 2
//! - `c_growth_rate` = b / a - 1
//!
//! Alignment is by a stable sort on the key columns; the datasets must have
//! the same number of rows.

use crate::domain::dataset::{Dataset, Value};
use crate::domain::error::TradestatsError;
use std::fmt;
use std::str::FromStr;

/// Optional metrics emitted after the sum/diff/percent-change triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraMetric {
    Mean,
    GrowthRate,
}

impl ExtraMetric {
    pub fn column(self, column: &str) -> String {
        match self {
            ExtraMetric::Mean => format!("{column}_mean"),
            ExtraMetric::GrowthRate => format!("{column}_growth_rate"),
        }
    }
}

impl fmt::Display for ExtraMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExtraMetric::Mean => "mean",
            ExtraMetric::GrowthRate => "growth-rate",
        })
    }
}

impl FromStr for ExtraMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" | "average" => Ok(ExtraMetric::Mean),
            "growth-rate" | "growth_rate" | "growth" => Ok(ExtraMetric::GrowthRate),
            other => Err(format!(
                "unknown metric '{other}' (expected mean or growth-rate)"
            )),
        }
    }
}

/// A cell whose value could not be defined (percent change against zero).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndefinedCell {
    pub row: usize,
    pub column: String,
}

#[derive(Debug, Clone)]
pub struct Derived {
    pub dataset: Dataset,
    pub undefined: Vec<UndefinedCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    pub mean_sum: Option<f64>,
    pub mean_diff: Option<f64>,
    pub mean_pct_change: Option<f64>,
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn sum_column(column: &str) -> String {
    format!("{column}_sum")
}

pub fn diff_column(column: &str) -> String {
    format!("{column}_diff")
}

pub fn pct_change_column(column: &str) -> String {
    format!("{column}_pct_change")
}

fn operand(ds: &Dataset, row: usize, idx: usize, column: &str) -> Result<Option<f64>, TradestatsError> {
    match &ds.rows[row][idx] {
        Value::Null => Ok(None),
        v => v.as_f64().map(Some).ok_or_else(|| TradestatsError::NonNumeric {
            dataset: ds.name.clone(),
            column: column.to_string(),
            row,
        }),
    }
}

pub fn compute_derived(
    dataset_a: &Dataset,
    dataset_b: &Dataset,
    columns: &[String],
    key_columns: &[String],
) -> Result<Derived, TradestatsError> {
    compute_derived_with(dataset_a, dataset_b, columns, key_columns, &[])
}

/// [`compute_derived`] plus the requested extra metrics, in the order given,
/// after each column's triple.
pub fn compute_derived_with(
    dataset_a: &Dataset,
    dataset_b: &Dataset,
    columns: &[String],
    key_columns: &[String],
    extras: &[ExtraMetric],
) -> Result<Derived, TradestatsError> {
    let mut a = dataset_a.clone();
    let mut b = dataset_b.clone();
    a.sort_by_columns(key_columns);
    b.sort_by_columns(key_columns);

    if a.len() != b.len() {
        return Err(TradestatsError::RowCountMismatch {
            left: a.name,
            right: b.name,
            left_rows: dataset_a.len(),
            right_rows: dataset_b.len(),
        });
    }

    let mut requested: Vec<&String> = Vec::new();
    for c in columns {
        if !requested.contains(&c) {
            requested.push(c);
        }
    }

    let mut operands = Vec::with_capacity(requested.len());
    for col in &requested {
        let ai = a.column_index(col).ok_or_else(|| TradestatsError::MissingColumn {
            dataset: a.name.clone(),
            column: col.to_string(),
        })?;
        let bi = b.column_index(col).ok_or_else(|| TradestatsError::MissingColumn {
            dataset: b.name.clone(),
            column: col.to_string(),
        })?;
        operands.push((col.as_str(), ai, bi));
    }

    let carried: Vec<(String, usize)> = key_columns
        .iter()
        .filter_map(|k| a.column_index(k).map(|i| (k.clone(), i)))
        .collect();

    let mut out_columns: Vec<String> = carried.iter().map(|(k, _)| k.clone()).collect();
    for (col, _, _) in &operands {
        out_columns.push(sum_column(col));
        out_columns.push(diff_column(col));
        out_columns.push(pct_change_column(col));
        out_columns.extend(extras.iter().map(|m| m.column(col)));
    }

    let mut rows = Vec::with_capacity(a.len());
    let mut undefined = Vec::new();
    for r in 0..a.len() {
        let mut row: Vec<Value> = carried.iter().map(|(_, i)| a.rows[r][*i].clone()).collect();
        for &(col, ai, bi) in &operands {
            let x = operand(&a, r, ai, col)?;
            let y = operand(&b, r, bi, col)?;
            match (x, y) {
                (Some(x), Some(y)) => {
                    row.push(Value::Float(x + y));
                    row.push(Value::Float(y - x));
                    if x == 0.0 {
                        undefined.push(UndefinedCell {
                            row: r,
                            column: pct_change_column(col),
                        });
                        row.push(Value::Undefined);
                    } else {
                        row.push(Value::Float(round2((y - x) / x * 100.0)));
                    }
                    for &metric in extras {
                        match metric {
                            ExtraMetric::Mean => row.push(Value::Float((x + y) / 2.0)),
                            ExtraMetric::GrowthRate if x == 0.0 => {
                                undefined.push(UndefinedCell {
                                    row: r,
                                    column: metric.column(col),
                                });
                                row.push(Value::Undefined);
                            }
                            ExtraMetric::GrowthRate => row.push(Value::Float(y / x - 1.0)),
                        }
                    }
                }
                _ => row.extend(std::iter::repeat_n(Value::Null, 3 + extras.len())),
            }
        }
        rows.push(row);
    }

    if !undefined.is_empty() {
        tracing::warn!(
            cells = undefined.len(),
            left = %a.name,
            "derived values undefined where the base value is zero"
        );
    }

    Ok(Derived {
        dataset: Dataset {
            name: format!("{}~{}", a.name, b.name),
            columns: out_columns,
            rows,
        },
        undefined,
    })
}

fn column_mean(ds: &Dataset, column: &str) -> Option<f64> {
    let idx = ds.column_index(column)?;
    let values: Vec<f64> = ds
        .rows
        .iter()
        .filter_map(|r| r[idx].as_f64())
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(round2(values.iter().sum::<f64>() / values.len() as f64))
}

/// Per source column means of the derived columns. `Null` and `Undefined`
/// cells are left out of each mean.
pub fn summarize(derived: &Derived, columns: &[String]) -> Vec<ColumnSummary> {
    let ds = &derived.dataset;
    let mut seen = Vec::new();
    columns
        .iter()
        .filter(|c| ds.has_column(&sum_column(c)))
        .filter(|c| {
            let fresh = !seen.contains(c);
            seen.push(*c);
            fresh
        })
        .map(|c| ColumnSummary {
            column: c.clone(),
            mean_sum: column_mean(ds, &sum_column(c)),
            mean_diff: column_mean(ds, &diff_column(c)),
            mean_pct_change: column_mean(ds, &pct_change_column(c)),
        })
        .collect()
}
