//! Scan report rendering: human-readable text and machine-readable JSON.
//!
//! The text summary is plain text with no terminal coloring, safe to pipe
//! or save as-is. The JSON report serializes the model types directly, so
//! its shape follows the workspace serde derives.

use std::fs;
use std::path::Path;

use serde::Serialize;

use outrider_model::{DeviationResult, Server, ServerStatus};

use crate::error::{OutriderError, Result};

const RULE: &str = "============================================================";
const TOOL_PREVIEW_LIMIT: usize = 5;
const DESCRIPTION_PREVIEW_CHARS: usize = 60;

/// Aggregate counts across one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total_servers: usize,
    pub scanned_servers: usize,
    pub total_tools: usize,
    pub deviations_found: usize,
}

impl ScanSummary {
    /// Tallies servers and detection results.
    pub fn tally(servers: &[Server], results: &[DeviationResult]) -> Self {
        Self {
            total_servers: servers.len(),
            scanned_servers: servers.iter().filter(|s| s.is_scanned()).count(),
            total_tools: servers
                .iter()
                .filter(|s| s.is_scanned())
                .map(|s| s.tools.len())
                .sum(),
            deviations_found: results.iter().filter(|r| r.is_deviation).count(),
        }
    }
}

/// The machine-readable report.
///
/// `deviations` holds only flagged results; the full per-tool analysis is
/// available through the text summary's verbose mode instead.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub scan_summary: ScanSummary,
    pub servers: Vec<Server>,
    pub deviations: Vec<DeviationResult>,
}

impl JsonReport {
    /// Builds the report from one run's servers and results.
    pub fn build(servers: &[Server], results: &[DeviationResult]) -> Self {
        Self {
            scan_summary: ScanSummary::tally(servers, results),
            servers: servers.to_vec(),
            deviations: results.iter().filter(|r| r.is_deviation).cloned().collect(),
        }
    }

    /// Pretty-printed JSON rendering.
    pub fn to_pretty_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Renders the human-readable scan summary.
///
/// `verbose` additionally lists the `[OK]` analysis entries for tools that
/// were not flagged, which the normal rendering omits.
pub fn summary_text(servers: &[Server], results: &[DeviationResult], verbose: bool) -> String {
    let summary = ScanSummary::tally(servers, results);
    let mut lines: Vec<String> = Vec::new();

    lines.push(RULE.to_string());
    lines.push("MCP Server Scan Report".to_string());
    lines.push(RULE.to_string());
    lines.push(String::new());

    lines.push("Summary:".to_string());
    lines.push(format!("  Servers found: {}", summary.total_servers));
    lines.push(format!("  Successfully scanned: {}", summary.scanned_servers));
    let failed = servers
        .iter()
        .filter(|s| s.status == ServerStatus::Error)
        .count();
    if failed > 0 {
        lines.push(format!("  Failed scans: {failed}"));
    }
    lines.push(format!("  Total tools discovered: {}", summary.total_tools));
    lines.push(String::new());

    lines.push("Server Details:".to_string());
    for server in servers {
        let symbol = if server.is_scanned() { "✅" } else { "❌" };
        lines.push(String::new());
        lines.push(format!("{symbol} [{}]", server.name));
        lines.push(format!("  Status: {}", server.status));
        if let Some(message) = &server.error_message {
            lines.push(format!("  Error: {message}"));
        }
        if !server.tools.is_empty() {
            lines.push(format!("  Tools: {}", server.tools.len()));
            for tool in server.tools.iter().take(TOOL_PREVIEW_LIMIT) {
                lines.push(format!(
                    "    • {}: {}",
                    tool.name,
                    preview(&tool.description)
                ));
            }
            if server.tools.len() > TOOL_PREVIEW_LIMIT {
                lines.push(format!(
                    "    ... and {} more",
                    server.tools.len() - TOOL_PREVIEW_LIMIT
                ));
            }
        }
    }

    if results.is_empty() {
        lines.push(String::new());
        lines.push("No deviations detected".to_string());
        return lines.join("\n");
    }

    lines.push(String::new());
    lines.push("Detected Deviations:".to_string());
    lines.push(format!(
        "Total deviations found: {}",
        summary.deviations_found
    ));
    if summary.deviations_found > 0 {
        lines.push(String::new());
        lines.push("POTENTIAL SECURITY CONCERNS:".to_string());
        lines.push("The following tools may be malicious or unintended:".to_string());
    }

    for result in results {
        if result.is_deviation {
            lines.push(String::new());
            lines.push(format!(
                "[DEVIATION] {} (from {})",
                result.tool.name, result.tool.server_name
            ));
            lines.push(format!("  Confidence: {:.2}%", result.confidence * 100.0));
            lines.push("  Reason:".to_string());
            for line in result.reason.lines() {
                lines.push(format!("    {line}"));
            }
            if result.confidence > 0.8 {
                lines.push("  HIGH RISK: Review this tool immediately".to_string());
            }
            lines.push(format!(
                "  Recommendation: Investigate why this tool exists in the {} server",
                result.tool.server_name
            ));
        } else if verbose {
            lines.push(String::new());
            lines.push(format!(
                "[OK] {} (from {})",
                result.tool.name, result.tool.server_name
            ));
            lines.push(format!("  Confidence: {:.2}%", result.confidence * 100.0));
            lines.push(format!("  Analysis: {}", result.reason));
        }
    }

    lines.join("\n")
}

/// First line of a description, truncated for the per-server tool listing.
fn preview(description: &str) -> String {
    let first_line = description.lines().next().unwrap_or("");
    if first_line.chars().count() > DESCRIPTION_PREVIEW_CHARS {
        let truncated: String = first_line.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
        format!("{truncated}...")
    } else {
        first_line.to_string()
    }
}

/// Writes a rendered report to `path`.
pub fn save(contents: &str, path: &Path) -> Result<()> {
    fs::write(path, contents).map_err(|source| OutriderError::ReportWrite {
        path: path.to_path_buf(),
        source,
    })
}
