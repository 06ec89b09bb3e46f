//! Remote deviation-judge capability.
//!
//! A judge is an external reasoning service (typically a language model)
//! asked to assess one tool at a time. The trait returns *structured*
//! assessments rather than prose, so detectors convert sub-scores into
//! deviation signals with plain arithmetic instead of parsing text.
//!
//! Prompting, transport, and response parsing all live behind the trait;
//! nothing in this workspace talks to a judge directly. Whether a judge is
//! configured at all is decided by the caller (an API key being present),
//! and detectors treat a missing judge as a silently absent signal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use outrider_model::{Server, Tool};

use crate::error::Result;

/// Structured verdict on how consistent a tool is with its own server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyAssessment {
    /// How well the tool fits the server's apparent purpose, 0.0 to 1.0.
    pub server_alignment: f64,
    /// How consistent the description is with the tool's name, 0.0 to 1.0.
    pub description_consistency: f64,
    /// How well the tool matches the patterns of its sibling tools.
    pub pattern_conformity: f64,
    /// Specific red flags the judge noticed, free text.
    #[serde(default)]
    pub suspicion_indicators: Vec<String>,
    /// The judge's overall inconsistency verdict.
    pub is_inconsistent: bool,
    /// The judge's confidence in its own assessment, 0.0 to 1.0.
    pub confidence: f64,
    /// Brief explanation of the assessment.
    #[serde(default)]
    pub reasoning: String,
}

/// One alternative server and how well the tool would fit there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFit {
    /// Server name.
    pub server: String,
    /// Fit score, 0.0 to 1.0.
    pub fit: f64,
}

/// Structured verdict on whether a tool belongs to a different server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementAssessment {
    /// Fit with the server the tool currently lives in, 0.0 to 1.0.
    pub current_fit: f64,
    /// Name of the best-fitting server (may be the current one).
    pub best_server: String,
    /// Fit score for `best_server`.
    pub best_fit: f64,
    /// Other servers with a notable fit.
    #[serde(default)]
    pub other_high_fit: Vec<ServerFit>,
    /// The judge considers the placement suspicious.
    pub is_suspicious: bool,
    /// The judge's confidence in its own assessment, 0.0 to 1.0.
    pub confidence: f64,
    /// Brief explanation of the assessment.
    #[serde(default)]
    pub reasoning: String,
}

/// External verification capability for deviation detectors.
///
/// One assessment method per detector kind. Implementations may call out
/// over the network; both methods are fallible and a failure degrades the
/// judge signal to zero for the affected tool only.
#[async_trait]
pub trait DeviationJudge: Send + Sync {
    /// Assesses a tool's semantic consistency within its own server.
    ///
    /// `siblings` are the other tools of the same server, for context.
    async fn assess_consistency(
        &self,
        server_name: &str,
        tool: &Tool,
        siblings: &[Tool],
    ) -> Result<ConsistencyAssessment>;

    /// Assesses whether a tool would fit better under another server.
    ///
    /// `servers` is the full scanned corpus the judge may compare against.
    async fn assess_placement(
        &self,
        tool: &Tool,
        current_server: &str,
        servers: &[Server],
    ) -> Result<PlacementAssessment>;
}
