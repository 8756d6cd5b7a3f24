//! Error types
//!
//! Every error is fatal for a conversion run. [`Error`] is what
//! [`crate::transform::EventTransformer::transform`] and [`crate::run`]
//! return, the other types convert into it via `?`.

use std::path::PathBuf;

use thiserror::Error;

/// Math domain violations in the kinematic calculations
#[derive(Copy, Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("logarithm of non-positive value {0}")]
    Log(f64),

    #[error("inverse hyperbolic tangent of {0} outside (-1, 1)")]
    Atanh(f64),

    #[error("division by zero computing {0}")]
    DivisionByZero(&'static str),
}

/// Invalid run configuration
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid condition '{0}', expected one of 'train', 'val', 'test'")]
    InvalidCondition(String),
}

/// Failure to read an input table
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("input table '{table}' is missing column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("column '{column}' of '{table}' has unsupported type {datatype}")]
    InvalidColumnType {
        table: String,
        column: String,
        datatype: String,
    },

    #[error("column '{column}' of '{table}' has null or unconvertible values")]
    NullValues { table: String, column: String },

    #[error("no input table named '{0}'")]
    NotFound(String),

    #[cfg(feature = "parquet")]
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[cfg(feature = "parquet")]
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

/// Failure to persist an output chunk
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[cfg(feature = "parquet")]
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[cfg(feature = "parquet")]
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

/// Top-level conversion error
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("domain error in event {orig_idx}: {source}")]
    Domain {
        orig_idx: usize,
        source: DomainError,
    },

    #[error("write error: {0}")]
    Write(#[from] WriteError),
}
