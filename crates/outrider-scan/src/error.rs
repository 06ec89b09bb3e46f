//! Error types for server scanning.
//!
//! Every variant aborts the current scan attempt and is eligible for retry.
//! After the retry budget is exhausted, the scanner folds the last error into
//! the server's terminal `error` status instead of propagating it, so one
//! misbehaving server can never abort a batch scan.

use thiserror::Error;

/// Errors that can end one scan attempt.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The executable could not be found (including Windows `npx` resolution).
    #[error("Executable not found: {0}")]
    ExecutableNotFound(String),

    /// The server process could not be spawned.
    #[error("Failed to launch server: {0}")]
    Launch(String),

    /// Writing a request to the server's stdin failed.
    #[error("Failed to write to server: {0}")]
    Write(String),

    /// Reading from the server's stdout failed.
    #[error("Failed to read from server: {0}")]
    Read(String),

    /// The server answered `initialize` with a protocol-level error.
    #[error("Initialization error: {0}")]
    Init(String),

    /// The server answered `tools/list` with a protocol-level error.
    #[error("Tools list error: {0}")]
    ToolsList(String),

    /// No response to `initialize` arrived within the read budget.
    #[error("No initialization response received")]
    NoInitResponse,

    /// No response to `tools/list` arrived within the read budget.
    #[error("No tools response received")]
    NoToolsResponse,

    /// The attempt exceeded the overall scan timeout.
    #[error("Server scan timed out after {0} seconds")]
    Timeout(u64),
}

/// Result type for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;
