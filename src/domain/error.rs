//! Domain error types.

/// Top-level error type for tradestats.
#[derive(Debug, thiserror::Error)]
pub enum TradestatsError {
    #[error("unauthorized access")]
    Unauthorized,

    #[error("path escapes the data root: {requested}")]
    PathEscape { requested: String },

    #[error("'{path}' not found")]
    NotFound { path: String },

    #[error(
        "row count mismatch: {left} has {left_rows} rows, {right} has {right_rows} rows"
    )]
    RowCountMismatch {
        left: String,
        right: String,
        left_rows: usize,
        right_rows: usize,
    },

    #[error("{mode} merge needs exactly 2 datasets, got {inputs}")]
    UnsupportedCardinality { mode: String, inputs: usize },

    #[error("no common columns to join {left} and {right}")]
    NoCommonColumns { left: String, right: String },

    #[error("column '{column}' missing from {dataset}")]
    MissingColumn { dataset: String, column: String },

    #[error("non-numeric value in {dataset}, column '{column}', row {row}")]
    NonNumeric {
        dataset: String,
        column: String,
        row: usize,
    },

    #[error("invalid dataset selection '{input}': {reason}")]
    InvalidSelection { input: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("CSV error in {dataset}: {reason}")]
    Csv { dataset: String, reason: String },

    #[error("failed to fetch {file}: {reason}")]
    Fetch { file: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradestatsError> for std::process::ExitCode {
    fn from(err: &TradestatsError) -> Self {
        let code: u8 = match err {
            TradestatsError::Io(_) => 1,
            TradestatsError::ConfigParse { .. }
            | TradestatsError::ConfigMissing { .. }
            | TradestatsError::ConfigInvalid { .. }
            | TradestatsError::InvalidSelection { .. } => 2,
            TradestatsError::Csv { .. } | TradestatsError::Fetch { .. } => 3,
            TradestatsError::RowCountMismatch { .. }
            | TradestatsError::UnsupportedCardinality { .. }
            | TradestatsError::NoCommonColumns { .. }
            | TradestatsError::MissingColumn { .. }
            | TradestatsError::NonNumeric { .. } => 4,
            TradestatsError::NotFound { .. } => 5,
            TradestatsError::Unauthorized | TradestatsError::PathEscape { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
