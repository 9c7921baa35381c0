//! Set-style combination of datasets.
//!
//! Four modes are supported:
//! - `concat`: stack rows in input order, union of columns.
//! - `union`: `concat` then drop exact duplicate rows (first occurrence wins).
//! - `intersection`: inner join of exactly two datasets on every shared column.
//! - `outer`: pairwise full outer join on the declared key columns, folding
//!   left to right. Shared non-key columns are suffixed with the name of the
//!   dataset they came from.

use crate::domain::dataset::{Dataset, SOURCE_TAG, Value};
use crate::domain::error::TradestatsError;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Concat,
    Union,
    Intersection,
    Outer,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MergeMode::Concat => "concat",
            MergeMode::Union => "union",
            MergeMode::Intersection => "intersection",
            MergeMode::Outer => "outer",
        };
        f.write_str(s)
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concat" | "stack" => Ok(MergeMode::Concat),
            "union" => Ok(MergeMode::Union),
            "intersection" | "inner" => Ok(MergeMode::Intersection),
            "outer" => Ok(MergeMode::Outer),
            other => Err(format!(
                "unknown merge mode '{other}' (expected concat, union, intersection or outer)"
            )),
        }
    }
}

pub fn merge(
    datasets: &[Dataset],
    mode: MergeMode,
    key_columns: &[String],
) -> Result<Dataset, TradestatsError> {
    match mode {
        MergeMode::Concat => Ok(concat(datasets)),
        MergeMode::Union => Ok(union(datasets)),
        MergeMode::Intersection => match datasets {
            [left, right] => intersection(left, right),
            _ => Err(TradestatsError::UnsupportedCardinality {
                mode: mode.to_string(),
                inputs: datasets.len(),
            }),
        },
        MergeMode::Outer => outer(datasets, key_columns),
    }
}

fn combined_name(datasets: &[Dataset]) -> String {
    datasets
        .iter()
        .map(|d| d.name.as_str())
        .collect::<Vec<_>>()
        .join("+")
}

pub fn concat(datasets: &[Dataset]) -> Dataset {
    let mut columns: Vec<String> = Vec::new();
    for ds in datasets {
        for col in &ds.columns {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }
    }

    let total = datasets.iter().map(Dataset::len).sum();
    let mut rows = Vec::with_capacity(total);
    for ds in datasets {
        let positions: Vec<Option<usize>> =
            columns.iter().map(|c| ds.column_index(c)).collect();
        for row in &ds.rows {
            rows.push(
                positions
                    .iter()
                    .map(|p| p.map(|i| row[i].clone()).unwrap_or(Value::Null))
                    .collect(),
            );
        }
    }

    Dataset {
        name: combined_name(datasets),
        columns,
        rows,
    }
}

pub fn union(datasets: &[Dataset]) -> Dataset {
    let mut stacked = concat(datasets);
    let mut seen: HashSet<Vec<Value>> = HashSet::with_capacity(stacked.len());
    stacked.rows.retain(|row| seen.insert(row.clone()));
    stacked
}

fn key_of(row: &[Value], positions: &[usize]) -> Vec<Value> {
    positions.iter().map(|&i| row[i].clone()).collect()
}

fn index_rows(dataset: &Dataset, positions: &[usize]) -> HashMap<Vec<Value>, Vec<usize>> {
    let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
    for (i, row) in dataset.rows.iter().enumerate() {
        index.entry(key_of(row, positions)).or_default().push(i);
    }
    index
}

pub fn intersection(left: &Dataset, right: &Dataset) -> Result<Dataset, TradestatsError> {
    let common: Vec<String> = left
        .columns
        .iter()
        .filter(|c| right.has_column(c))
        .cloned()
        .collect();
    if common.is_empty() {
        return Err(TradestatsError::NoCommonColumns {
            left: left.name.clone(),
            right: right.name.clone(),
        });
    }

    let left_pos: Vec<usize> = common.iter().filter_map(|c| left.column_index(c)).collect();
    let right_pos: Vec<usize> = common.iter().filter_map(|c| right.column_index(c)).collect();
    let extra: Vec<usize> = (0..right.columns.len())
        .filter(|i| !right_pos.contains(i))
        .collect();

    let mut columns = left.columns.clone();
    columns.extend(extra.iter().map(|&i| right.columns[i].clone()));

    let index = index_rows(right, &right_pos);
    let mut rows = Vec::new();
    for lrow in &left.rows {
        if let Some(matches) = index.get(&key_of(lrow, &left_pos)) {
            for &r in matches {
                let mut row = lrow.clone();
                row.extend(extra.iter().map(|&i| right.rows[r][i].clone()));
                rows.push(row);
            }
        }
    }

    Ok(Dataset {
        name: format!("{}+{}", left.name, right.name),
        columns,
        rows,
    })
}

/// Suffix labels: the dataset name when non-empty and unique among the
/// inputs, otherwise its 1-based position (`df1`, `df2`, ...).
fn suffix_labels(datasets: &[Dataset]) -> Vec<String> {
    datasets
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let unique = datasets.iter().filter(|o| o.name == d.name).count() == 1;
            if d.name.is_empty() || !unique {
                format!("df{}", i + 1)
            } else {
                d.name.clone()
            }
        })
        .collect()
}

pub fn outer(datasets: &[Dataset], key_columns: &[String]) -> Result<Dataset, TradestatsError> {
    let Some((first, rest)) = datasets.split_first() else {
        return Ok(Dataset::default());
    };
    let labels = suffix_labels(datasets);

    let mut acc = first.clone();
    // Bare column name in the accumulator -> label of the dataset it came from.
    let mut origins: HashMap<String, String> = first
        .columns
        .iter()
        .map(|c| (c.clone(), labels[0].clone()))
        .collect();
    // Base names that have been suffixed at some step.
    let mut disambiguated: HashSet<String> = HashSet::new();

    for (step, right) in rest.iter().enumerate() {
        acc = outer_step(
            &acc,
            right,
            &labels[step + 1],
            key_columns,
            &mut origins,
            &mut disambiguated,
        )?;
        tracing::debug!(
            step = step + 1,
            rows = acc.len(),
            columns = acc.columns.len(),
            "outer merge step"
        );
    }
    Ok(acc)
}

fn outer_step(
    left: &Dataset,
    right: &Dataset,
    right_label: &str,
    key_columns: &[String],
    origins: &mut HashMap<String, String>,
    disambiguated: &mut HashSet<String>,
) -> Result<Dataset, TradestatsError> {
    let keys: Vec<&String> = key_columns
        .iter()
        .filter(|k| left.has_column(k) && right.has_column(k))
        .collect();
    if keys.is_empty() {
        return Err(TradestatsError::NoCommonColumns {
            left: left.name.clone(),
            right: right.name.clone(),
        });
    }
    let is_key = |c: &str| keys.iter().any(|k| k.as_str() == c);

    // Recomputed against the current accumulator on every step.
    let collisions: HashSet<String> = right
        .columns
        .iter()
        .filter(|c| !is_key(c) && c.as_str() != SOURCE_TAG)
        .filter(|c| left.has_column(c) || disambiguated.contains(c.as_str()))
        .cloned()
        .collect();

    let mut columns: Vec<String> = left
        .columns
        .iter()
        .map(|c| {
            if collisions.contains(c) {
                let origin = origins.remove(c).unwrap_or_else(|| left.name.clone());
                format!("{c}_{origin}")
            } else {
                c.clone()
            }
        })
        .collect();

    let left_tag = left.column_index(SOURCE_TAG);
    let right_tag = right.column_index(SOURCE_TAG);
    let shared_tag = left_tag.is_some() && right_tag.is_some();

    let mut extra: Vec<usize> = Vec::new();
    for (i, c) in right.columns.iter().enumerate() {
        if is_key(c) || (shared_tag && c == SOURCE_TAG) {
            continue;
        }
        extra.push(i);
        if collisions.contains(c) {
            columns.push(format!("{c}_{right_label}"));
        } else {
            origins.insert(c.clone(), right_label.to_string());
            columns.push(c.clone());
        }
    }
    disambiguated.extend(collisions);

    let left_keys: Vec<usize> = keys.iter().filter_map(|k| left.column_index(k)).collect();
    let right_keys: Vec<usize> = keys.iter().filter_map(|k| right.column_index(k)).collect();
    let index = index_rows(right, &right_keys);
    let mut matched = vec![false; right.len()];
    let mut rows = Vec::new();

    for lrow in &left.rows {
        match index.get(&key_of(lrow, &left_keys)) {
            Some(hits) => {
                for &r in hits {
                    matched[r] = true;
                    let rrow = &right.rows[r];
                    let mut row = lrow.clone();
                    if let (Some(lt), Some(rt)) = (left_tag, right_tag) {
                        row[lt] = combine_tags(&lrow[lt], &rrow[rt]);
                    }
                    row.extend(extra.iter().map(|&i| rrow[i].clone()));
                    rows.push(row);
                }
            }
            None => {
                let mut row = lrow.clone();
                row.extend(extra.iter().map(|_| Value::Null));
                rows.push(row);
            }
        }
    }

    for (r, rrow) in right.rows.iter().enumerate() {
        if matched[r] {
            continue;
        }
        let mut row = vec![Value::Null; left.columns.len()];
        for (&li, &ri) in left_keys.iter().zip(&right_keys) {
            row[li] = rrow[ri].clone();
        }
        if let (Some(lt), Some(rt)) = (left_tag, right_tag) {
            row[lt] = rrow[rt].clone();
        }
        row.extend(extra.iter().map(|&i| rrow[i].clone()));
        rows.push(row);
    }

    Ok(Dataset {
        name: format!("{}+{}", left.name, right.name),
        columns,
        rows,
    })
}

fn combine_tags(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Null, r) => r.clone(),
        (l, Value::Null) => l.clone(),
        (l, r) if l == r => l.clone(),
        (l, r) => Value::Text(format!("{l}+{r}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ds(name: &str, columns: &[&str], rows: Vec<Vec<i64>>) -> Dataset {
        Dataset::from_rows(
            name,
            columns,
            rows.into_iter()
                .map(|r| r.into_iter().map(Value::Int).collect())
                .collect(),
        )
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn mode_parses_aliases() {
        assert_eq!("stack".parse::<MergeMode>().unwrap(), MergeMode::Concat);
        assert_eq!("Outer".parse::<MergeMode>().unwrap(), MergeMode::Outer);
        assert_eq!("inner".parse::<MergeMode>().unwrap(), MergeMode::Intersection);
        assert!("cross".parse::<MergeMode>().is_err());
    }

    #[test]
    fn concat_appends_all_rows() {
        let d1 = ds("d1", &["x"], vec![vec![1], vec![2]]);
        let d2 = ds("d2", &["x"], vec![vec![3], vec![4], vec![5]]);
        let out = merge(&[d1, d2], MergeMode::Concat, &[]).unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(out.name, "d1+d2");
    }

    #[test]
    fn concat_fills_missing_columns_with_null() {
        let d1 = ds("d1", &["x", "y"], vec![vec![1, 2]]);
        let d2 = ds("d2", &["x", "z"], vec![vec![3, 4]]);
        let out = concat(&[d1, d2]);
        assert_eq!(out.columns, keys(&["x", "y", "z"]));
        assert_eq!(out.rows[0], vec![Value::Int(1), Value::Int(2), Value::Null]);
        assert_eq!(out.rows[1], vec![Value::Int(3), Value::Null, Value::Int(4)]);
    }

    #[test]
    fn union_drops_exact_duplicates() {
        let d1 = ds("d1", &["x"], vec![vec![1]]);
        let d2 = ds("d2", &["x"], vec![vec![1], vec![2]]);
        let out = merge(&[d1, d2], MergeMode::Union, &[]).unwrap();
        assert_eq!(out.rows, vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
    }

    #[test]
    fn union_keeps_rows_differing_in_one_column() {
        let d1 = ds("d1", &["x", "y"], vec![vec![1, 1]]);
        let d2 = ds("d2", &["x", "y"], vec![vec![1, 2], vec![1, 1]]);
        let out = union(&[d1, d2]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn intersection_joins_on_all_shared_columns() {
        let d1 = ds("d1", &["x", "y", "a"], vec![vec![1, 1, 10], vec![2, 2, 20]]);
        let d2 = ds("d2", &["x", "y", "b"], vec![vec![1, 1, 100], vec![2, 3, 200]]);
        let out = merge(&[d1, d2], MergeMode::Intersection, &[]).unwrap();
        assert_eq!(out.columns, keys(&["x", "y", "a", "b"]));
        assert_eq!(out.len(), 1);
        assert_eq!(out.get(0, "b"), Some(&Value::Int(100)));
    }

    #[test]
    fn intersection_rejects_three_inputs() {
        let d = ds("d", &["x"], vec![vec![1]]);
        let err = merge(&[d.clone(), d.clone(), d], MergeMode::Intersection, &[]).unwrap_err();
        assert!(matches!(
            err,
            TradestatsError::UnsupportedCardinality { inputs: 3, .. }
        ));
    }

    #[test]
    fn intersection_without_shared_columns_fails() {
        let d1 = ds("d1", &["x"], vec![vec![1]]);
        let d2 = ds("d2", &["y"], vec![vec![1]]);
        let err = intersection(&d1, &d2).unwrap_err();
        assert!(matches!(err, TradestatsError::NoCommonColumns { .. }));
    }

    #[test]
    fn outer_keeps_unmatched_rows_from_both_sides() {
        let a = ds("a", &["k", "v"], vec![vec![1, 10], vec![2, 20]]);
        let b = ds("b", &["k", "w"], vec![vec![2, 200], vec![3, 300]]);
        let out = merge(&[a, b], MergeMode::Outer, &keys(&["k"])).unwrap();
        assert_eq!(out.columns, keys(&["k", "v", "w"]));
        assert_eq!(
            out.rows,
            vec![
                vec![Value::Int(1), Value::Int(10), Value::Null],
                vec![Value::Int(2), Value::Int(20), Value::Int(200)],
                vec![Value::Int(3), Value::Null, Value::Int(300)],
            ]
        );
    }

    #[test]
    fn outer_suffixes_shared_non_key_columns() {
        let a = ds("a", &["k", "value"], vec![vec![1, 10]]);
        let b = ds("b", &["k", "value"], vec![vec![1, 15]]);
        let out = outer(&[a, b], &keys(&["k"])).unwrap();
        assert_eq!(out.columns, keys(&["k", "value_a", "value_b"]));
        assert_eq!(out.rows[0], vec![Value::Int(1), Value::Int(10), Value::Int(15)]);
    }

    #[test]
    fn outer_recomputes_common_columns_each_step() {
        let a = ds("a", &["x", "y"], vec![vec![1, 10]]);
        let b = ds("b", &["x", "z"], vec![vec![1, 20]]);
        let c = ds("c", &["x", "w"], vec![vec![1, 30], vec![2, 40]]);
        let out = merge(&[a, b, c], MergeMode::Outer, &keys(&["x"])).unwrap();
        for col in ["x", "y", "z", "w"] {
            assert!(out.has_column(col), "missing {col}: {:?}", out.columns);
        }
        assert_eq!(out.len(), 2);
        assert_eq!(out.get(0, "w"), Some(&Value::Int(30)));
        assert_eq!(out.get(1, "y"), Some(&Value::Null));
    }

    #[test]
    fn outer_suffixes_repeated_measure_across_three_inputs() {
        let a = ds("a", &["x", "value"], vec![vec![1, 1]]);
        let b = ds("b", &["x", "value"], vec![vec![1, 2]]);
        let c = ds("c", &["x", "value"], vec![vec![1, 3]]);
        let out = outer(&[a, b, c], &keys(&["x"])).unwrap();
        assert_eq!(out.columns, keys(&["x", "value_a", "value_b", "value_c"]));
        assert_eq!(
            out.rows[0],
            vec![Value::Int(1), Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn outer_collision_on_third_input_suffixes_origin() {
        let a = ds("a", &["x", "y"], vec![vec![1, 1]]);
        let b = ds("b", &["x", "z"], vec![vec![1, 2]]);
        let c = ds("c", &["x", "z"], vec![vec![1, 3]]);
        let out = outer(&[a, b, c], &keys(&["x"])).unwrap();
        assert_eq!(out.columns, keys(&["x", "y", "z_b", "z_c"]));
    }

    #[test]
    fn outer_uses_positions_for_duplicate_names() {
        let a = ds("same", &["k", "v"], vec![vec![1, 1]]);
        let b = ds("same", &["k", "v"], vec![vec![1, 2]]);
        let out = outer(&[a, b], &keys(&["k"])).unwrap();
        assert_eq!(out.columns, keys(&["k", "v_df1", "v_df2"]));
    }

    #[test]
    fn outer_without_usable_keys_fails() {
        let a = ds("a", &["x"], vec![vec![1]]);
        let b = ds("b", &["y"], vec![vec![1]]);
        let err = outer(&[a, b], &keys(&["x"])).unwrap_err();
        assert!(matches!(err, TradestatsError::NoCommonColumns { .. }));
    }

    #[test]
    fn outer_combines_source_tags() {
        let a = ds("a", &["k", "v"], vec![vec![1, 1], vec![2, 2]]).with_source_tag();
        let b = ds("b", &["k", "w"], vec![vec![1, 5], vec![3, 6]]).with_source_tag();
        let out = outer(&[a, b], &keys(&["k"])).unwrap();
        assert_eq!(out.columns, keys(&["k", "v", SOURCE_TAG, "w"]));
        assert_eq!(out.get(0, SOURCE_TAG), Some(&Value::from("a+b")));
        assert_eq!(out.get(1, SOURCE_TAG), Some(&Value::from("a")));
        assert_eq!(out.get(2, SOURCE_TAG), Some(&Value::from("b")));
        assert_eq!(out.get(2, "k"), Some(&Value::Int(3)));
    }

    #[test]
    fn outer_single_input_is_identity() {
        let a = ds("a", &["k"], vec![vec![1]]);
        let out = outer(std::slice::from_ref(&a), &keys(&["k"])).unwrap();
        assert_eq!(out, a);
    }
}
