//! Detector capability contract and shared scoring plumbing.
//!
//! The ensemble treats every detector opaquely through [`Detector`]: give it
//! the scanned corpus, get back one judgment per tool. What varies between
//! detectors is the heuristic; what must not vary is the output contract
//! (score in `[0, 1]`, structured multi-part reason text, one result per
//! tool identity).

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use outrider_model::{DeviationResult, Server, Tool};

use crate::error::DetectError;

/// Kind tag of the consistency detector.
pub const CONSISTENCY_CHECK: &str = "CONSISTENCY_CHECK";

/// Kind tag of the cross-server placement detector.
pub const CROSS_SERVER_ANALYSIS: &str = "CROSS_SERVER_ANALYSIS";

/// A pluggable per-tool anomaly scorer.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Stable kind tag, e.g. [`CONSISTENCY_CHECK`]. Used to look up the
    /// detector's ensemble weight and to tag its reason text.
    fn name(&self) -> &'static str;

    /// Whether at least one scoring capability was supplied at construction.
    fn is_available(&self) -> bool;

    /// Scores every tool of every scanned server.
    ///
    /// Capability failures degrade the affected signal to zero for that
    /// tool and are noted in its reason text; they never abort the run.
    async fn detect(&self, servers: &[Server]) -> Vec<DeviationResult>;
}

/// Selectable detection method, as requested by a caller.
///
/// `Consistency` and `CrossServer` name concrete detectors. `Multi` and
/// `AiEnhanced` are meta-selectors expanded by the ensemble to its full
/// active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    /// Tool-vs-own-server semantic consistency.
    Consistency,
    /// Tool placement across all scanned servers.
    CrossServer,
    /// All active detectors.
    Multi,
    /// All active detectors, with external judge verification where
    /// configured.
    #[serde(rename = "ai")]
    AiEnhanced,
}

impl DetectionMethod {
    /// The concrete detector kind this method names, if any.
    pub fn kind(self) -> Option<&'static str> {
        match self {
            DetectionMethod::Consistency => Some(CONSISTENCY_CHECK),
            DetectionMethod::CrossServer => Some(CROSS_SERVER_ANALYSIS),
            DetectionMethod::Multi | DetectionMethod::AiEnhanced => None,
        }
    }

    /// Whether this method expands to the full active detector set.
    pub fn is_meta(self) -> bool {
        self.kind().is_none()
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectionMethod::Consistency => "consistency",
            DetectionMethod::CrossServer => "cross-server",
            DetectionMethod::Multi => "multi",
            DetectionMethod::AiEnhanced => "ai",
        };
        write!(f, "{name}")
    }
}

impl FromStr for DetectionMethod {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consistency" => Ok(DetectionMethod::Consistency),
            "cross-server" => Ok(DetectionMethod::CrossServer),
            "multi" => Ok(DetectionMethod::Multi),
            "ai" | "ai-enhanced" => Ok(DetectionMethod::AiEnhanced),
            other => Err(DetectError::UnknownMethod(other.to_string())),
        }
    }
}

/// How a detector folds its embedding and judge signals into one score.
///
/// The historical behavior is `TakeMax`: the more alarming signal wins.
/// That bias favors sensitivity over precision, so `Blend` is offered for
/// deployments that prefer averaging the two opinions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScorePolicy {
    /// The larger of the two signals.
    TakeMax,
    /// Weighted average: `w * embedding + (1 - w) * judge`.
    Blend {
        /// Weight given to the embedding signal, 0.0 to 1.0.
        embedding_weight: f64,
    },
}

impl ScorePolicy {
    /// Combines the two signal scores under this policy.
    ///
    /// An absent capability contributes a zero signal, which under `Blend`
    /// scales the remaining signal by its weight.
    pub fn combine(self, embedding: f64, judge: f64) -> f64 {
        let combined = match self {
            ScorePolicy::TakeMax => embedding.max(judge),
            ScorePolicy::Blend { embedding_weight } => {
                let w = embedding_weight.clamp(0.0, 1.0);
                w * embedding + (1.0 - w) * judge
            }
        };
        combined.clamp(0.0, 1.0)
    }
}

impl Default for ScorePolicy {
    fn default() -> Self {
        ScorePolicy::TakeMax
    }
}

/// Per-tool signal scores and notes collected by a concrete detector.
///
/// Both shipped detectors assemble their reason text identically; this
/// struct holds the raw material and renders the shared shape.
#[derive(Debug, Default)]
pub(crate) struct SignalReport {
    pub embedding_score: f64,
    pub judge_score: f64,
    pub embedding_notes: Vec<String>,
    pub judge_notes: Vec<String>,
    /// An embedder was configured for this detector.
    pub has_embedder: bool,
    /// A judge was configured for this detector.
    pub has_judge: bool,
}

impl SignalReport {
    /// Folds the signals under the given policy.
    pub fn combined(&self, policy: ScorePolicy) -> f64 {
        policy.combine(self.embedding_score, self.judge_score)
    }

    /// Renders the structured reason lines.
    ///
    /// Empty output means "nothing to report"; the caller substitutes the
    /// detector's neutral reason.
    pub fn reason_lines(&self, combined: f64) -> Vec<String> {
        let mut lines = Vec::new();
        let any_score = self.embedding_score > 0.0 || self.judge_score > 0.0;

        if any_score {
            if self.has_judge {
                lines.push(format!(
                    "Detection scores - embedding: {:.2}, judge: {:.2} (combined: {:.2})",
                    self.embedding_score, self.judge_score, combined
                ));
            } else {
                lines.push(format!("Detection score - embedding: {combined:.2}"));
            }
        }

        if self.has_judge && self.has_embedder && any_score {
            let divergence = (self.embedding_score - self.judge_score).abs();
            if divergence >= 0.5 {
                lines.push(format!(
                    "Warning: embedding and judge scores diverge by {divergence:.2}; possible false positive"
                ));
            }
        }

        if !self.embedding_notes.is_empty() {
            if self.has_judge {
                lines.push("Embedding analysis:".to_string());
            } else {
                lines.push("Analysis:".to_string());
            }
            for note in &self.embedding_notes {
                lines.push(format!("  - {note}"));
            }
        }

        if !self.judge_notes.is_empty() {
            lines.push("Judge analysis:".to_string());
            for note in &self.judge_notes {
                lines.push(format!("  - {note}"));
            }
        }

        lines
    }

    /// Builds the final judgment for one tool, falling back to the
    /// detector's neutral reason when there is nothing to report.
    pub fn into_result(
        self,
        tool: Tool,
        baseline: Vec<Tool>,
        policy: ScorePolicy,
        threshold: f64,
        neutral_reason: &str,
    ) -> DeviationResult {
        let combined = self.combined(policy);
        let lines = self.reason_lines(combined);
        let reason = if lines.is_empty() {
            neutral_reason.to_string()
        } else {
            lines.join("\n")
        };
        DeviationResult::judged(tool, baseline, combined, threshold, reason)
    }
}
