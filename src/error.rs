//! Error types for the OFI / cross-impact pipeline.
//!
//! Every stage validates its own preconditions and fails fast. Numeric
//! degeneracies (zero-variance predictors, infinite log-returns) are handled
//! inside the stages and never surface here.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum Error {
    /// Required columns are absent from the input table.
    #[error("Input is missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// An event time could not be interpreted.
    #[error("Invalid event time: {0}")]
    Time(String),

    /// A resampling interval string could not be parsed.
    #[error("Invalid resampling interval: {0}")]
    Interval(String),

    /// Two rows share the same (ts_event, symbol) key where a unique key is required.
    #[error("Duplicate entry for ({ts_event}, {symbol})")]
    DuplicateKey {
        ts_event: DateTime<Utc>,
        symbol: String,
    },

    /// A regression target has fewer observations than cross-validation folds.
    #[error("Target {target} has {samples} samples, cannot split into {folds} folds")]
    InsufficientSamples {
        target: String,
        samples: usize,
        folds: usize,
    },

    /// A stage received no rows where at least one is required.
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A cell could not be parsed as its column's type.
    #[error("Invalid value '{value}' for column {column} at line {line}")]
    Value {
        line: u64,
        column: String,
        value: String,
    },

    #[error("CSV error at line {line}: {source}")]
    CsvLine {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Npy(#[from] ndarray_npy::WriteNpyError),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

impl Error {
    /// Whether this is a missing-columns failure.
    pub fn is_schema(&self) -> bool {
        matches!(self, Error::Schema { .. })
    }
}

/// Crate result alias
pub type Result<T> = std::result::Result<T, Error>;
