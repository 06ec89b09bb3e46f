//! # Outrider Core - Scan Orchestration
//!
//! Ties the MCP Outrider workspace together: locate the Claude Desktop
//! configuration, scan every configured MCP server for its declared tools,
//! run the detection ensemble over what was found, and render the results
//! as a text summary or a JSON report.
//!
//! ## Pipeline
//!
//! ```text
//! claude_desktop_config.json
//!          │ config::load_servers
//!          ▼
//!    Vec<Server> ── ServerScanner::scan_all ──▶ annotated servers
//!                                                     │
//!                                    Ensemble::run    ▼
//!                               ◀─────────────── discovered tools
//!                              │
//!                              ▼
//!                     Vec<DeviationResult>
//!                              │
//!                              ▼
//!            report::summary_text / JsonReport
//! ```
//!
//! ## Failure policy
//!
//! Only the filesystem boundary returns errors from this crate: a missing
//! or malformed host configuration, or an unwritable report path. Scan
//! failures become per-server `error` statuses and detector capability
//! failures become reason text, so one broken server never aborts a run.

mod config;
mod error;
mod outrider;
mod report;

pub use config::{default_config_path, load_servers};
pub use error::{OutriderError, Result};
pub use outrider::{Outrider, OutriderConfig, ScanOutcome};
pub use report::{save, summary_text, JsonReport, ScanSummary};

// Re-export component types for convenience.
pub use outrider_detect::{
    ConsistencyDetector, CrossServerDetector, DetectionMethod, Detector, Ensemble,
    EnsembleConfig, HashEmbedder,
};
pub use outrider_model::{DeviationResult, Server, ServerStatus, Tool};
pub use outrider_scan::{ScanOptions, ServerScanner};
