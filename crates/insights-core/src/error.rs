use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the insights engine.
///
/// Aggregation functions are total and never return these; they surface
/// from ingestion, filter construction and configuration only.
#[derive(Error, Debug)]
pub enum InsightsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A date or timestamp string did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// A raw row lacks a field required to build a record.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// A grouping field name is not one of the known record fields.
    #[error("Unknown record field: {0}")]
    InvalidField(String),

    /// A filter specification is structurally invalid.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// The input path does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No record files were found under the given directory.
    #[error("No record files found in {0}")]
    NoDataFiles(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the insights crates.
pub type Result<T> = std::result::Result<T, InsightsError>;
