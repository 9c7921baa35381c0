//! Tabular dataset representation.
//!
//! A [`Dataset`] is an ordered column list plus rows of typed [`Value`]s, one
//! value per column. Datasets are decoded from and encoded to CSV.

use crate::domain::error::TradestatsError;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};

/// Flow direction (import/export).
pub const FLOW: &str = "flujo";
/// Year.
pub const YEAR: &str = "año";
/// Partner country name.
pub const COUNTRY: &str = "pais_nombre";
/// Spanish province name.
pub const PROVINCE: &str = "provincia_nombre";

/// Categorical columns offered for filtering, in display order.
pub const CATEGORICAL_COLUMNS: [&str; 4] = [FLOW, YEAR, COUNTRY, PROVINCE];

/// Numeric partner country code, kept as three-character text.
pub const COUNTRY_CODE: &str = "pais";

/// Column tagging each row with the dataset it came from.
pub const SOURCE_TAG: &str = "source_database";

/// A single cell.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    /// Result of an arithmetic operation with no defined value (e.g. x / 0).
    Undefined,
}

impl Value {
    /// Parse a raw CSV field. Integers are only recognised when the text
    /// round-trips, so zero-padded codes like `004` stay text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if is_zero_padded(trimmed) {
            return Value::Text(raw.to_string());
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            if n.to_string() == trimmed {
                return Value::Int(n);
            }
        }
        if trimmed.chars().any(|c| c.is_ascii_digit()) {
            if let Ok(f) = trimmed.parse::<f64>() {
                if f.is_finite() {
                    return Value::Float(f);
                }
            }
        }
        Value::Text(raw.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Text(_) => 2,
            Value::Undefined => 3,
        }
    }
}

/// `004`, `-01`: a leading zero followed by another digit.
fn is_zero_padded(s: &str) -> bool {
    let digits = s.trim_start_matches(['+', '-']).as_bytes();
    digits.len() > 1 && digits[0] == b'0' && digits[1].is_ascii_digit()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Undefined => f.write_str("undefined"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

// Int and Float compare numerically so that 2020 and 2020.0 join and dedup
// as the same value.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) if a.rank() == 1 && b.rank() == 1 => {
                let x = a.as_f64().unwrap_or_default();
                let y = b.as_f64().unwrap_or_default();
                x.total_cmp(&y)
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Int(n) => (*n as f64).to_bits().hash(state),
            Value::Float(x) => {
                let x = if *x == 0.0 { 0.0 } else { *x };
                x.to_bits().hash(state)
            }
            Value::Text(s) => s.hash(state),
            Value::Null | Value::Undefined => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Source label, used in error messages and merge suffixes.
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset from string column names and rows of values.
    pub fn from_rows(name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn from_csv_reader<R: Read>(name: &str, reader: R) -> Result<Self, TradestatsError> {
        let csv_err = |e: csv::Error| TradestatsError::Csv {
            dataset: name.to_string(),
            reason: e.to_string(),
        };

        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let columns: Vec<String> = rdr
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(csv_err)?;
            if record.len() > columns.len() {
                return Err(TradestatsError::Csv {
                    dataset: name.to_string(),
                    reason: format!(
                        "record {} has {} fields but the header has {}",
                        line + 1,
                        record.len(),
                        columns.len()
                    ),
                });
            }
            let row = (0..columns.len())
                .map(|i| record.get(i).map(Value::parse).unwrap_or(Value::Null))
                .collect();
            rows.push(row);
        }

        Ok(Self {
            name: name.to_string(),
            columns,
            rows,
        })
    }

    pub fn from_csv_bytes(name: &str, bytes: &[u8]) -> Result<Self, TradestatsError> {
        Self::from_csv_reader(name, bytes)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TradestatsError> {
        let csv_err = |e: csv::Error| TradestatsError::Csv {
            dataset: self.name.clone(),
            reason: e.to_string(),
        };

        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns).map_err(csv_err)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|v| v.to_string()))
                .map_err(csv_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, TradestatsError> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(buf)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Columns whose non-null values are all numeric (and at least one is).
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                let mut seen = false;
                for row in &self.rows {
                    match &row[*i] {
                        Value::Null => {}
                        Value::Int(_) | Value::Float(_) => seen = true,
                        _ => return false,
                    }
                }
                seen
            })
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Brings a freshly read source file into the shared shape: a leading
    /// unnamed index column is dropped and `pais` codes are zero-padded to
    /// three characters.
    pub fn normalized(mut self) -> Self {
        let unnamed_index = self
            .columns
            .first()
            .is_some_and(|c| c.trim().is_empty() || c.starts_with("Unnamed:"));
        if unnamed_index {
            self.columns.remove(0);
            for row in &mut self.rows {
                if !row.is_empty() {
                    row.remove(0);
                }
            }
        }

        if let Some(idx) = self.column_index(COUNTRY_CODE) {
            for row in &mut self.rows {
                let padded = match &row[idx] {
                    Value::Int(n) if *n >= 0 => Some(format!("{n:03}")),
                    Value::Text(s) if s.trim().chars().all(|c| c.is_ascii_digit()) => {
                        Some(format!("{:0>3}", s.trim()))
                    }
                    _ => None,
                };
                if let Some(code) = padded {
                    row[idx] = Value::Text(code);
                }
            }
        }
        self
    }

    /// Append (or overwrite) the source tag column with this dataset's name.
    pub fn with_source_tag(mut self) -> Self {
        let tag = Value::Text(self.name.clone());
        match self.column_index(SOURCE_TAG) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = tag.clone();
                }
            }
            None => {
                self.columns.push(SOURCE_TAG.to_string());
                for row in &mut self.rows {
                    row.push(tag.clone());
                }
            }
        }
        self
    }

    /// Stable sort by the given columns; columns not present are ignored.
    pub fn sort_by_columns(&mut self, columns: &[String]) {
        let indices: Vec<usize> = columns
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();
        if indices.is_empty() {
            return;
        }
        self.rows.sort_by(|a, b| {
            indices
                .iter()
                .map(|&i| a[i].cmp(&b[i]))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    /// Distinct textual values of a column in first-seen order.
    pub fn distinct_values(&self, column: &str) -> Vec<String> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };
        let mut seen = std::collections::HashSet::new();
        let mut values = Vec::new();
        for row in &self.rows {
            let v = row[idx].to_string();
            if seen.insert(v.clone()) {
                values.push(v);
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "flujo,año,pais,pais_nombre,provincia_nombre,value\n\
        E,2020,004,Afganistán,Madrid,100\n\
        I,2020,004,Afganistán,Barcelona,250.5\n\
        E,2021,008,Albania,Madrid,\n";

    #[test]
    fn parse_recognises_types() {
        assert_eq!(Value::parse("2020"), Value::Int(2020));
        assert_eq!(Value::parse("250.5"), Value::Float(250.5));
        assert_eq!(Value::parse(""), Value::Null);
        assert_eq!(Value::parse("Madrid"), Value::Text("Madrid".into()));
    }

    #[test]
    fn parse_keeps_zero_padded_codes_as_text() {
        assert!(matches!(Value::parse("004"), Value::Text(s) if s == "004"));
    }

    #[test]
    fn parse_keeps_zero_padded_decimals_as_text() {
        assert!(matches!(Value::parse("-007"), Value::Text(_)));
        assert!(matches!(Value::parse("004.5"), Value::Text(_)));
        assert_eq!(Value::parse("0.5"), Value::Float(0.5));
        assert_eq!(Value::parse("0"), Value::Int(0));
    }

    #[test]
    fn zero_padded_codes_survive_rewrite_and_filtering() {
        let ds = Dataset::from_csv_bytes("codes.csv", b"pais,value\n004,1\n").unwrap();
        assert_eq!(
            String::from_utf8(ds.to_csv_bytes().unwrap()).unwrap(),
            "pais,value\n004,1\n"
        );
        let kept = crate::domain::filter::FilterSpec::new()
            .with(COUNTRY_CODE, ["004"])
            .apply(&ds);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn parse_does_not_treat_words_as_floats() {
        assert!(matches!(Value::parse("inf"), Value::Text(_)));
        assert!(matches!(Value::parse("NaN"), Value::Text(_)));
    }

    #[test]
    fn int_and_float_compare_numerically() {
        assert_eq!(Value::Int(2020), Value::Float(2020.0));
        assert!(Value::Int(1) < Value::Float(1.5));
        assert!(Value::Null < Value::Int(0));
        assert!(Value::Int(99) < Value::Text("a".into()));
    }

    #[test]
    fn from_csv_reads_header_and_rows() {
        let ds = Dataset::from_csv_bytes("sample.csv", SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.name, "sample.csv");
        assert_eq!(ds.columns.len(), 6);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.get(1, "value"), Some(&Value::Float(250.5)));
        assert_eq!(ds.get(2, "value"), Some(&Value::Null));
        assert_eq!(ds.get(0, "pais"), Some(&Value::Text("004".into())));
    }

    #[test]
    fn from_csv_pads_short_records() {
        let ds = Dataset::from_csv_bytes("short.csv", b"a,b,c\n1,2\n").unwrap();
        assert_eq!(ds.rows[0], vec![Value::Int(1), Value::Int(2), Value::Null]);
    }

    #[test]
    fn from_csv_rejects_records_longer_than_the_header() {
        let err = Dataset::from_csv_bytes("long.csv", b"a,b\n1,2\n1,2,3\n").unwrap_err();
        assert!(
            matches!(err, TradestatsError::Csv { dataset, reason } if dataset == "long.csv" && reason.contains("record 2"))
        );
    }

    #[test]
    fn normalized_pads_codes_and_drops_index_column() {
        let ds = Dataset::from_csv_bytes("baci.csv", b",pais,value\n0,4,10\n1,724,20\n2,ES,30\n")
            .unwrap()
            .normalized();
        assert_eq!(ds.columns, vec!["pais", "value"]);
        assert_eq!(ds.get(0, COUNTRY_CODE), Some(&Value::Text("004".into())));
        assert_eq!(ds.get(1, COUNTRY_CODE), Some(&Value::Text("724".into())));
        assert_eq!(ds.get(2, COUNTRY_CODE), Some(&Value::Text("ES".into())));
        assert_eq!(ds.get(2, "value"), Some(&Value::Int(30)));
    }

    #[test]
    fn normalized_leaves_named_first_column_alone() {
        let ds = Dataset::from_csv_bytes("sample.csv", SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.clone().normalized(), ds);
    }

    #[test]
    fn from_csv_strips_byte_order_mark() {
        let ds = Dataset::from_csv_bytes("bom.csv", "\u{feff}año,value\n2020,1\n".as_bytes())
            .unwrap();
        assert_eq!(ds.columns[0], "año");
    }

    #[test]
    fn from_csv_rejects_invalid_utf8() {
        let err = Dataset::from_csv_bytes("bad.csv", b"a,b\n\xff,1\n").unwrap_err();
        assert!(matches!(err, TradestatsError::Csv { dataset, .. } if dataset == "bad.csv"));
    }

    #[test]
    fn write_csv_renders_values() {
        let ds = Dataset::from_rows(
            "out",
            &["a", "b", "c"],
            vec![vec![Value::Int(1), Value::Null, Value::Undefined]],
        );
        let bytes = ds.to_csv_bytes().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "a,b,c\n1,,undefined\n");
    }

    #[test]
    fn csv_text_survives_rewrite() {
        let ds = Dataset::from_csv_bytes("sample.csv", SAMPLE.as_bytes()).unwrap();
        let again = Dataset::from_csv_bytes("sample.csv", &ds.to_csv_bytes().unwrap()).unwrap();
        assert_eq!(ds, again);
    }

    #[test]
    fn numeric_columns_skip_text_and_empty() {
        let ds = Dataset::from_csv_bytes("sample.csv", SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.numeric_columns(), vec!["año", "value"]);
    }

    #[test]
    fn with_source_tag_appends_column() {
        let ds = Dataset::from_csv_bytes("comex", SAMPLE.as_bytes())
            .unwrap()
            .with_source_tag();
        assert_eq!(ds.columns.last().unwrap(), SOURCE_TAG);
        assert_eq!(ds.get(2, SOURCE_TAG), Some(&Value::Text("comex".into())));
    }

    #[test]
    fn sort_by_columns_is_stable() {
        let mut ds = Dataset::from_rows(
            "s",
            &["k", "v"],
            vec![
                vec![Value::Int(2), Value::from("first")],
                vec![Value::Int(1), Value::from("second")],
                vec![Value::Int(2), Value::from("third")],
            ],
        );
        ds.sort_by_columns(&["k".to_string()]);
        let order: Vec<String> = ds.rows.iter().map(|r| r[1].to_string()).collect();
        assert_eq!(order, vec!["second", "first", "third"]);
    }

    #[test]
    fn distinct_values_in_first_seen_order() {
        let ds = Dataset::from_csv_bytes("sample.csv", SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.distinct_values(PROVINCE), vec!["Madrid", "Barcelona"]);
        assert!(ds.distinct_values("missing").is_empty());
    }
}
