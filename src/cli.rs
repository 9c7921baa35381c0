//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::fs_catalog::FsCatalog;
use crate::domain::dataset::{CATEGORICAL_COLUMNS, Dataset};
use crate::domain::derive::{ExtraMetric, compute_derived_with, summarize};
use crate::domain::error::TradestatsError;
use crate::domain::merge::{MergeMode, merge};
use crate::domain::session::{DatasetSelection, LoadReport, WorkbenchSession};
use crate::domain::settings::{TOKEN_ENV, local_settings};
use crate::ports::config_port::ConfigPort;
use crate::ports::dataset_source::DatasetSource;

#[derive(Parser, Debug)]
#[command(
    name = "tradestats",
    about = "Trade statistics file service and dataset workbench"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the File Access Service
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List available data files
    List {
        #[arg(short, long)]
        config: PathBuf,
        /// Only files directly inside this folder, as bare names
        #[arg(long)]
        folder: Option<String>,
    },
    /// Merge two or more datasets
    Merge {
        #[arg(short, long)]
        config: PathBuf,
        /// Dataset selection: `path?column=v1|v2&column2=v3` (trailing `/` for a folder)
        #[arg(short, long = "dataset", required = true)]
        datasets: Vec<String>,
        #[arg(short, long, default_value = "concat")]
        mode: MergeMode,
        /// Join key column (outer mode); defaults to the shared categorical columns
        #[arg(short, long = "key")]
        keys: Vec<String>,
        /// Add a source_database column naming each row's dataset
        #[arg(long)]
        tag_source: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute sum, difference and percent change between two datasets
    Derive {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long = "dataset", required = true)]
        datasets: Vec<String>,
        /// Numeric column present in both datasets
        #[arg(long = "column", required = true)]
        columns: Vec<String>,
        /// Sort key columns; defaults to the shared categorical columns
        #[arg(short, long = "key")]
        keys: Vec<String>,
        /// Extra metric per column: mean or growth-rate
        #[arg(long = "metric")]
        metrics: Vec<ExtraMetric>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the distinct values of the filter columns of a dataset
    Options {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        dataset: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::List { config, folder } => run_list(&config, folder.as_deref()),
        Command::Merge {
            config,
            datasets,
            mode,
            keys,
            tag_source,
            output,
        } => run_merge(&config, &datasets, mode, &keys, tag_source, output.as_deref()),
        Command::Derive {
            config,
            datasets,
            columns,
            keys,
            metrics,
            output,
        } => run_derive(
            &config,
            &datasets,
            &columns,
            &keys,
            &metrics,
            output.as_deref(),
        ),
        Command::Options { config, dataset } => run_options(&config, &dataset),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TradestatsError> {
    tracing::debug!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

fn token_override() -> Option<String> {
    std::env::var(TOKEN_ENV).ok()
}

/// The remote service when `[client] base_url` is set, otherwise the local
/// `[server] data_folder`.
pub fn open_source(config: &dyn ConfigPort) -> Result<Box<dyn DatasetSource>, TradestatsError> {
    #[cfg(feature = "client")]
    {
        use crate::adapters::http_source::HttpDatasetSource;
        use crate::domain::settings::client_settings;

        let token = token_override();
        if let Some(settings) = client_settings(config, token.as_deref())? {
            tracing::info!(base_url = %settings.base_url, "using remote dataset source");
            return Ok(Box::new(HttpDatasetSource::new(&settings)?));
        }
    }

    #[cfg(not(feature = "client"))]
    if config.get_string("client", "base_url").is_some() {
        tracing::warn!("client feature disabled; ignoring [client] base_url");
    }

    let settings = local_settings(config)?;
    tracing::info!(root = %settings.data_folder.display(), "using local dataset source");
    Ok(Box::new(
        FsCatalog::new(settings.data_folder).with_extension(&settings.extension),
    ))
}

fn parse_selections(inputs: &[String]) -> Result<Vec<DatasetSelection>, TradestatsError> {
    inputs.iter().map(|s| s.parse()).collect()
}

fn build_session(selections: Vec<DatasetSelection>, tag_source: bool) -> WorkbenchSession {
    let mut session = WorkbenchSession::new().tag_source(tag_source);
    for selection in selections {
        session.add(selection);
    }
    session
}

fn warn_failures(report: &LoadReport) {
    for failure in &report.failures {
        eprintln!(
            "warning: skipping {} ({}): {}",
            failure.label, failure.file, failure.error
        );
    }
}

/// Categorical columns present in every dataset, in canonical order.
pub fn shared_categorical_columns(datasets: &[Dataset]) -> Vec<String> {
    CATEGORICAL_COLUMNS
        .iter()
        .filter(|c| datasets.iter().all(|d| d.has_column(c)))
        .map(|c| c.to_string())
        .collect()
}

fn resolve_keys(keys: &[String], datasets: &[Dataset]) -> Vec<String> {
    if keys.is_empty() {
        shared_categorical_columns(datasets)
    } else {
        keys.to_vec()
    }
}

fn write_output(dataset: &Dataset, output: Option<&Path>) -> Result<(), TradestatsError> {
    match output {
        Some(path) => {
            let file = File::create(path)?;
            dataset.write_csv(BufWriter::new(file))?;
            eprintln!(
                "Wrote {} rows x {} columns to {}",
                dataset.len(),
                dataset.columns.len(),
                path.display()
            );
        }
        None => dataset.write_csv(io::stdout().lock())?,
    }
    Ok(())
}

fn run_serve(config_path: &Path) -> Result<(), TradestatsError> {
    #[cfg(feature = "web")]
    {
        use crate::domain::settings::server_settings;

        let config = load_config(config_path)?;
        let token = token_override();
        let settings = server_settings(&config, token.as_deref())?;

        eprintln!("Serving {} on {}", settings.data_folder.display(), settings.listen);
        tokio::runtime::Runtime::new()?.block_on(crate::adapters::web::serve(&settings))
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        Err(TradestatsError::ConfigInvalid {
            section: "server".into(),
            key: "serve".into(),
            reason: "built without the web feature".into(),
        })
    }
}

fn run_list(config_path: &Path, folder: Option<&str>) -> Result<(), TradestatsError> {
    let config = load_config(config_path)?;
    let source = open_source(&config)?;
    let files = source.list_files()?;

    let shown: Vec<String> = match folder {
        Some(folder) => {
            let prefix = format!("{}/", folder.trim_matches('/'));
            let names: Vec<String> = files
                .iter()
                .filter_map(|f| f.strip_prefix(&prefix))
                .filter(|rest| !rest.contains('/'))
                .map(str::to_string)
                .collect();
            if names.is_empty() && !files.iter().any(|f| f.starts_with(&prefix)) {
                return Err(TradestatsError::NotFound {
                    path: folder.to_string(),
                });
            }
            names
        }
        None => files,
    };

    let mut out = io::stdout().lock();
    for file in &shown {
        writeln!(out, "{file}")?;
    }
    Ok(())
}

fn run_merge(
    config_path: &Path,
    inputs: &[String],
    mode: MergeMode,
    keys: &[String],
    tag_source: bool,
    output: Option<&Path>,
) -> Result<(), TradestatsError> {
    let config = load_config(config_path)?;
    let selections = parse_selections(inputs)?;
    let tag_source = tag_source || config.get_bool("workbench", "tag_source", false);
    let session = build_session(selections, tag_source);

    let source = open_source(&config)?;
    let report = session.load(source.as_ref());
    warn_failures(&report);
    if report.datasets.is_empty() {
        return Err(TradestatsError::NotFound {
            path: inputs.join(", "),
        });
    }

    let keys = resolve_keys(keys, &report.datasets);
    tracing::info!(
        %mode,
        datasets = report.datasets.len(),
        keys = ?keys,
        "merging"
    );
    let merged = merge(&report.datasets, mode, &keys)?;
    write_output(&merged, output)
}

fn run_derive(
    config_path: &Path,
    inputs: &[String],
    columns: &[String],
    keys: &[String],
    metrics: &[ExtraMetric],
    output: Option<&Path>,
) -> Result<(), TradestatsError> {
    if inputs.len() != 2 {
        return Err(TradestatsError::UnsupportedCardinality {
            mode: "derive".into(),
            inputs: inputs.len(),
        });
    }

    let config = load_config(config_path)?;
    let session = build_session(parse_selections(inputs)?, false);
    let source = open_source(&config)?;
    let mut report = session.load(source.as_ref());
    if !report.is_complete() {
        warn_failures(&report);
        return Err(report.failures.remove(0).error);
    }

    let [a, b] = report.datasets.as_slice() else {
        return Err(TradestatsError::UnsupportedCardinality {
            mode: "derive".into(),
            inputs: report.datasets.len(),
        });
    };
    let keys = resolve_keys(keys, &report.datasets);
    let derived = compute_derived_with(a, b, columns, &keys, metrics)?;

    if !derived.undefined.is_empty() {
        eprintln!(
            "warning: {} derived value(s) undefined (zero base)",
            derived.undefined.len()
        );
    }

    write_output(&derived.dataset, output)?;

    eprintln!("\n=== Summary Statistics ({} vs {}) ===", a.name, b.name);
    eprintln!(
        "{:<20} {:>14} {:>14} {:>14}",
        "column", "mean sum", "mean diff", "mean % chg"
    );
    for summary in summarize(&derived, columns) {
        let cell = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |x| format!("{x:.2}"));
        eprintln!(
            "{:<20} {:>14} {:>14} {:>14}",
            summary.column,
            cell(summary.mean_sum),
            cell(summary.mean_diff),
            cell(summary.mean_pct_change)
        );
    }
    Ok(())
}

fn run_options(config_path: &Path, input: &str) -> Result<(), TradestatsError> {
    let config = load_config(config_path)?;
    let selection: DatasetSelection = input.parse()?;
    let session = build_session(vec![selection], false);
    let source = open_source(&config)?;
    let mut report = session.load(source.as_ref());
    if !report.is_complete() {
        return Err(report.failures.remove(0).error);
    }

    let mut out = io::stdout().lock();
    for dataset in &report.datasets {
        for column in CATEGORICAL_COLUMNS {
            if !dataset.has_column(column) {
                continue;
            }
            let values = dataset.distinct_values(column);
            writeln!(out, "{column} ({}): {}", values.len(), values.join(" | "))?;
        }
        let measures = dataset.numeric_columns();
        writeln!(out, "numeric: {}", measures.join(", "))?;
    }
    Ok(())
}
