//! Workbench session: the ordered list of dataset selections a user builds
//! up, and loading them from a [`DatasetSource`].

use crate::domain::dataset::Dataset;
use crate::domain::error::TradestatsError;
use crate::domain::filter::FilterSpec;
use crate::domain::merge::concat;
use crate::ports::dataset_source::DatasetSource;
use std::str::FromStr;

/// Separator between allowed values inside one filter term.
pub const VALUE_SEPARATOR: char = '|';

/// One file (or folder, when the path ends in `/`) plus the filter to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSelection {
    pub label: String,
    pub path: String,
    pub filter: FilterSpec,
}

impl DatasetSelection {
    pub fn new(path: &str, filter: FilterSpec) -> Self {
        Self {
            label: default_label(path),
            path: path.to_string(),
            filter,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.path.ends_with('/')
    }
}

fn default_label(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let stem = match last.rfind('.') {
        Some(dot) if dot > 0 => &last[..dot],
        _ => last,
    };
    stem.to_string()
}

/// Parses `path?column=v1|v2&column2=v3`.
impl FromStr for DatasetSelection {
    type Err = TradestatsError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TradestatsError::InvalidSelection {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (path, query) = match input.split_once('?') {
            Some((p, q)) => (p.trim(), Some(q)),
            None => (input.trim(), None),
        };
        if path.is_empty() {
            return Err(invalid("empty path"));
        }

        let mut filter = FilterSpec::new();
        if let Some(query) = query {
            for term in query.split('&').filter(|t| !t.trim().is_empty()) {
                let (column, values) = term
                    .split_once('=')
                    .ok_or_else(|| invalid("filter term must be column=values"))?;
                let column = column.trim();
                if column.is_empty() {
                    return Err(invalid("empty filter column"));
                }
                let values: Vec<String> = values
                    .split(VALUE_SEPARATOR)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                if values.is_empty() {
                    return Err(invalid("filter term has no values"));
                }
                filter = filter.with(column, values);
            }
        }

        Ok(DatasetSelection::new(path, filter))
    }
}

#[derive(Debug)]
pub struct DatasetFailure {
    pub label: String,
    pub file: String,
    pub error: TradestatsError,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub datasets: Vec<Dataset>,
    pub failures: Vec<DatasetFailure>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkbenchSession {
    selections: Vec<DatasetSelection>,
    tag_source: bool,
}

impl WorkbenchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the source tag column to every loaded dataset.
    pub fn tag_source(mut self, enabled: bool) -> Self {
        self.tag_source = enabled;
        self
    }

    /// Appends a selection, making its label unique within the session.
    pub fn add(&mut self, mut selection: DatasetSelection) -> &DatasetSelection {
        let base = selection.label.clone();
        let mut n = 1;
        while self.selections.iter().any(|s| s.label == selection.label) {
            n += 1;
            selection.label = format!("{base}_{n}");
        }
        self.selections.push(selection);
        &self.selections[self.selections.len() - 1]
    }

    pub fn selections(&self) -> &[DatasetSelection] {
        &self.selections
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Fetches and filters every selection. A failing selection is recorded
    /// in the report and does not stop the others.
    pub fn load(&self, source: &dyn DatasetSource) -> LoadReport {
        let mut report = LoadReport::default();
        let mut listing: Option<Vec<String>> = None;

        for selection in &self.selections {
            let loaded = if selection.is_folder() {
                if listing.is_none() {
                    match source.list_files() {
                        Ok(files) => listing = Some(files),
                        Err(error) => {
                            tracing::warn!(file = %selection.path, %error, "listing failed");
                            report.failures.push(DatasetFailure {
                                label: selection.label.clone(),
                                file: selection.path.clone(),
                                error,
                            });
                            continue;
                        }
                    }
                }
                let files = listing.as_deref().unwrap_or_default();
                load_folder(selection, files, source, &mut report)
            } else {
                match load_file(&selection.path, source) {
                    Ok(ds) => Some(ds),
                    Err(error) => {
                        tracing::warn!(file = %selection.path, %error, "dataset unavailable");
                        report.failures.push(DatasetFailure {
                            label: selection.label.clone(),
                            file: selection.path.clone(),
                            error,
                        });
                        None
                    }
                }
            };

            if let Some(ds) = loaded {
                let mut filtered = selection.filter.apply(&ds);
                filtered.name = selection.label.clone();
                if self.tag_source {
                    filtered = filtered.with_source_tag();
                }
                tracing::info!(
                    dataset = %selection.label,
                    rows = filtered.len(),
                    columns = filtered.columns.len(),
                    "loaded"
                );
                report.datasets.push(filtered);
            }
        }

        report
    }
}

fn load_file(path: &str, source: &dyn DatasetSource) -> Result<Dataset, TradestatsError> {
    let bytes = source.fetch(path)?;
    Ok(Dataset::from_csv_bytes(path, &bytes)?.normalized())
}

fn load_folder(
    selection: &DatasetSelection,
    files: &[String],
    source: &dyn DatasetSource,
    report: &mut LoadReport,
) -> Option<Dataset> {
    let prefix = selection.path.as_str();
    let members: Vec<&String> = files
        .iter()
        .filter(|f| f.starts_with(prefix) && !f[prefix.len()..].contains('/'))
        .collect();

    if members.is_empty() {
        report.failures.push(DatasetFailure {
            label: selection.label.clone(),
            file: selection.path.clone(),
            error: TradestatsError::NotFound {
                path: selection.path.clone(),
            },
        });
        return None;
    }

    let mut parts = Vec::with_capacity(members.len());
    for file in members {
        match load_file(file, source) {
            Ok(ds) => parts.push(ds),
            Err(error) => {
                tracing::warn!(%file, %error, "skipping file in folder");
                report.failures.push(DatasetFailure {
                    label: selection.label.clone(),
                    file: file.clone(),
                    error,
                });
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(concat(&parts))
    }
}
