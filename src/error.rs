// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for drySpring I/O and computation.
//!
//! All pipeline and format errors use [`Error`], with variants for each
//! failure mode. No external error crates — zero-dependency error type.

use std::fmt;
use std::path::PathBuf;

/// Errors produced by drySpring pipeline stages.
#[derive(Debug)]
pub enum Error {
    /// File I/O error with path context.
    Io {
        /// Path that caused the error.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// `.dsg` grid container format error (bad magic, truncated payload).
    GridFormat(String),
    /// No usable input files or the requested slice is outside the data.
    MissingInput(String),
    /// Companion arrays disagree on time/lat/lon axes.
    AxisMismatch(String),
    /// CSV read/write error for the tabular dataset.
    Csv(csv::Error),
    /// JSON (de)serialization error for headers and model artifacts.
    Json(serde_json::Error),
    /// Trained-model artifact is structurally invalid.
    Model(String),
    /// Chart rendering error.
    Plot(String),
    /// Invalid input parameters (dimensions, ranges, constraints).
    InvalidInput(String),
}

/// Result type alias for drySpring operations.
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::GridFormat(msg) => write!(f, "grid format error: {msg}"),
            Self::MissingInput(msg) => write!(f, "missing input: {msg}"),
            Self::AxisMismatch(msg) => write!(f, "axis mismatch: {msg}"),
            Self::Csv(e) => write!(f, "csv error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
            Self::Model(msg) => write!(f, "model error: {msg}"),
            Self::Plot(msg) => write!(f, "plot error: {msg}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl Error {
    /// Wrap an I/O error with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
