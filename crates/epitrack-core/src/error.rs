use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the epitrack pipeline.
#[derive(Error, Debug)]
pub enum TrackError {
    /// A raw data file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV stream could not be parsed.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON document (figure-map configuration) could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A date string did not match the feed's expected format.
    #[error("Invalid date format: {0}")]
    DateParse(String),

    /// A format tag string is not one of the recognised publisher schemas.
    #[error("Unknown data format: {0}")]
    UnknownFormat(String),

    /// The expected raw-data directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

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

/// Convenience alias used throughout the epitrack crates.
pub type Result<T> = std::result::Result<T, TrackError>;
