//! Error types for the Outrider core.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for configuration loading and report output.
///
/// Scan and detection failures never surface here: the scanner records
/// them on the [`Server`](outrider_model::Server) and detectors fold them
/// into reason text. What remains is the filesystem boundary.
#[derive(Debug, Error)]
pub enum OutriderError {
    /// Host configuration file does not exist.
    #[error("Claude Desktop config not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Host configuration file could not be read.
    #[error("Failed to read config {}: {}", .path.display(), .source)]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Host configuration is not the expected JSON shape.
    #[error("Invalid config JSON in {}: {}", .path.display(), .source)]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No home directory to resolve the default config path against.
    #[error("Could not determine the home directory for the default config path")]
    NoHomeDirectory,

    /// Report serialization failed.
    #[error("Failed to serialize report: {0}")]
    ReportSerialize(#[from] serde_json::Error),

    /// Report could not be written to disk.
    #[error("Failed to write report to {}: {}", .path.display(), .source)]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Core result type.
pub type Result<T> = std::result::Result<T, OutriderError>;
