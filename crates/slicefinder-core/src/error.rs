//! Error taxonomy for slice search.
//!
//! - `ConfigError`: rejected before the search touches the oracle.
//! - `OracleError`: the row oracle could not be read or scanned.
//! - `SearchError`: what `search` returns; every variant is fatal to the call.
//!
//! Running out of candidates or finding fewer than `k` slices is normal
//! termination and never surfaces here.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("k must be at least 1")]
    ZeroCapacity,

    #[error("alpha must be finite and > 0, got {0}")]
    InvalidAlpha(f64),

    #[error("w must lie in [0, 1], got {0}")]
    InvalidWeight(f64),

    #[error("admit threshold must be finite, got {0}")]
    InvalidAdmitThreshold(f64),

    #[error("max level must be at least 1")]
    ZeroMaxLevel,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("predicate column {column} is out of range (table has {columns} columns)")]
    ColumnOutOfRange { column: u32, columns: usize },

    #[error("predicate column {0} is listed more than once")]
    DuplicateColumn(u32),

    #[error("row {row} has an invalid error value {value} (must be finite and >= 0)")]
    InvalidRowError { row: u32, value: f64 },

    #[error("malformed table: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoding error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("oracle failure: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("dataset has no rows")]
    EmptyDataset,

    #[error("baseline error must be finite and > 0, got {0}")]
    DegenerateBaseline(f64),

    #[error("slice `{0}` has no bounded parents")]
    UnboundedParents(String),
}
