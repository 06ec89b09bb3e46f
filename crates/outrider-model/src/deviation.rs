//! # Deviation Judgments
//!
//! The output side of the domain model: one [`DeviationResult`] per tool per
//! ensemble run, carrying the combined verdict plus the structured
//! per-detector contributions that produced it.
//!
//! Results are immutable once created. Confidence is clamped to `[0, 1]` at
//! construction and the deviation flag is derived from the decision
//! threshold, so the two can never disagree.

use serde::{Deserialize, Serialize};

use crate::server::Tool;

/// Global decision threshold: a confidence at or above this value is a
/// deviation. Used everywhere a score becomes a verdict.
pub const DEVIATION_THRESHOLD: f64 = 0.6;

/// One detector's contribution to a combined judgment.
///
/// Downstream renderers consume these records instead of re-parsing the
/// concatenated `reason` prose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorContribution {
    /// Detector kind name, e.g. `CONSISTENCY_CHECK`.
    pub detector: String,

    /// The detector's own score for this tool, in `[0, 1]`.
    pub score: f64,

    /// The detector's explanation, one line per entry.
    pub reason_lines: Vec<String>,
}

impl DetectorContribution {
    /// Create a contribution record, clamping the score to `[0, 1]`.
    pub fn new(detector: impl Into<String>, score: f64, reason_lines: Vec<String>) -> Self {
        Self {
            detector: detector.into(),
            score: score.clamp(0.0, 1.0),
            reason_lines,
        }
    }
}

/// Final per-tool judgment produced by a detector or the ensemble.
///
/// # Fields
///
/// - `tool`: the judged tool (snapshot)
/// - `baseline_tools`: sibling tools from the same server at scan time
/// - `is_deviation`: decision, derived from confidence vs. threshold
/// - `confidence`: calibrated score in `[0, 1]`
/// - `reason`: human-readable explanation, possibly multi-section
/// - `contributions`: ordered per-detector records behind the combined score
///
/// # Example
///
/// ```rust
/// use outrider_model::{DeviationResult, Tool};
///
/// let tool = Tool::new("get_weather", "Fetch a weather forecast", "filesystem");
/// let result = DeviationResult::judged(tool, vec![], 0.82, 0.6, "Out of place");
/// assert!(result.is_deviation);
/// assert_eq!(result.confidence, 0.82);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationResult {
    /// The tool this judgment is about.
    pub tool: Tool,

    /// Sibling tools from the same server, snapshotted for context.
    pub baseline_tools: Vec<Tool>,

    /// True iff `confidence` met the decision threshold.
    pub is_deviation: bool,

    /// Combined confidence in `[0, 1]`.
    pub confidence: f64,

    /// Human-readable explanation.
    pub reason: String,

    /// Ordered per-detector contributions.
    #[serde(default)]
    pub contributions: Vec<DetectorContribution>,
}

impl DeviationResult {
    /// Create a judgment from a raw confidence and the decision threshold.
    ///
    /// The confidence is clamped to `[0, 1]` first; `is_deviation` is then
    /// `confidence >= threshold`, so a score exactly at the threshold counts
    /// as a deviation.
    pub fn judged(
        tool: Tool,
        baseline_tools: Vec<Tool>,
        confidence: f64,
        threshold: f64,
        reason: impl Into<String>,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            tool,
            baseline_tools,
            is_deviation: confidence >= threshold,
            confidence,
            reason: reason.into(),
            contributions: Vec::new(),
        }
    }

    /// Create a non-deviation judgment with zero confidence.
    pub fn clean(tool: Tool, baseline_tools: Vec<Tool>, reason: impl Into<String>) -> Self {
        Self {
            tool,
            baseline_tools,
            is_deviation: false,
            confidence: 0.0,
            reason: reason.into(),
            contributions: Vec::new(),
        }
    }

    /// Attach the per-detector contribution records.
    pub fn with_contributions(mut self, contributions: Vec<DetectorContribution>) -> Self {
        self.contributions = contributions;
        self
    }

    /// The `(server name, tool name)` identity of the judged tool.
    pub fn identity(&self) -> (&str, &str) {
        self.tool.identity()
    }
}
