//! Error types for the batch signing planner.
//!
//! This module provides structured error types using thiserror. Per-file
//! and per-container failures are mostly recovered where they happen; the
//! variants here are the ones that reach a caller.

use std::path::PathBuf;
use thiserror::Error;

use crate::signing::MissingCertificate;

/// Main error type for signing-plan operations.
#[derive(Debug, Error)]
pub enum SignToolError {
    /// File I/O errors with the path that failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bounded reader refused or failed to read a file
    #[error("Read error on {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: crate::io::error::IoError,
    },

    /// Container could not be opened or walked as an archive
    #[error("Archive error on {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Container nesting went past the configured depth
    #[error("Container nesting too deep at {path} (limit {limit})")]
    ContainerDepthExceeded { path: PathBuf, limit: usize },

    /// One or more files have no resolvable certificate
    #[error("{} file(s) have no certificate; suggestions written to {}", .entries.len(), .report.display())]
    MissingCertificates {
        entries: Vec<MissingCertificate>,
        report: PathBuf,
    },

    /// Containers failed to unpack and strict container handling is on
    #[error("{} container(s) could not be unpacked: {}", .paths.len(), display_paths(.paths))]
    UnreadableContainers { paths: Vec<PathBuf> },

    /// Invalid configuration or input tables
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl SignToolError {
    /// Attach a path to a std I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for signing-plan operations
pub type Result<T> = std::result::Result<T, SignToolError>;
