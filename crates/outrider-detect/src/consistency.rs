//! Consistency detector: does a tool's description fit its own server?
//!
//! Two independent signals feed each judgment. The embedding signal
//! compares the tool's description against a server-plus-tool-name context
//! (plus, for servers with five or more tools, coherence with the sibling
//! tool set). The judge signal converts a structured external assessment
//! into a score ladder. The two are folded by the detector's
//! [`ScorePolicy`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use outrider_model::{DeviationResult, Server, Tool, DEVIATION_THRESHOLD};

use crate::detector::{Detector, ScorePolicy, SignalReport, CONSISTENCY_CHECK};
use crate::embedding::{centroid, cosine_similarity, TextEmbedder};
use crate::error::Result;
use crate::judge::{ConsistencyAssessment, DeviationJudge};
use crate::textproc::preprocess;

const NEUTRAL_REASON: &str = "Semantically consistent with server context";

/// Minimum tool count before the coherence signal is considered.
const COHERENCE_MIN_TOOLS: usize = 5;

/// Scores each tool's description against its server context.
pub struct ConsistencyDetector {
    embedder: Option<Arc<dyn TextEmbedder>>,
    judge: Option<Arc<dyn DeviationJudge>>,
    policy: ScorePolicy,
}

impl ConsistencyDetector {
    /// Creates a detector over the supplied capabilities.
    ///
    /// The detector is available iff at least one capability is present.
    pub fn new(
        embedder: Option<Arc<dyn TextEmbedder>>,
        judge: Option<Arc<dyn DeviationJudge>>,
    ) -> Self {
        Self {
            embedder,
            judge,
            policy: ScorePolicy::default(),
        }
    }

    /// Overrides the signal combination policy.
    pub fn with_policy(mut self, policy: ScorePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Embedding ladder: similarity between the `"{server} {tool}"` context
    /// and the tool's description.
    async fn context_signal(
        embedder: &dyn TextEmbedder,
        server_name: &str,
        tool: &Tool,
    ) -> Result<(f64, Vec<String>)> {
        let context = format!("{} {}", preprocess(server_name), preprocess(&tool.name));
        let context_embedding = embedder.embed(&context).await?;
        let description_embedding = embedder.embed(&preprocess(&tool.description)).await?;
        let similarity = cosine_similarity(&context_embedding, &description_embedding);

        let mut score = 0.0;
        let mut notes = Vec::new();
        if similarity < 0.2 {
            score += 0.8;
            notes.push(
                "Tool description is semantically unrelated to its context (server + tool name)"
                    .to_string(),
            );
        } else if similarity < 0.35 {
            score += 0.6;
            notes.push("Tool description has weak semantic alignment with its context".to_string());
        } else if similarity < 0.5 {
            score += 0.4;
            notes.push(
                "Tool description shows moderate semantic alignment with its context".to_string(),
            );
        }
        Ok((score, notes))
    }

    /// Blended coherence of each tool with the server's whole tool set.
    ///
    /// Keyed by tool name. Empty when any embedding call fails; the
    /// per-tool context signal still reports that failure.
    async fn coherence_scores(
        embedder: &dyn TextEmbedder,
        server: &Server,
    ) -> HashMap<String, f64> {
        let mut tool_texts = Vec::new();
        let mut tool_embeddings = Vec::new();
        for tool in &server.tools {
            let text = format!(
                "{}: {}",
                preprocess(&tool.name),
                preprocess(&tool.description)
            );
            match embedder.embed(&text).await {
                Ok(embedding) => {
                    tool_texts.push(text);
                    tool_embeddings.push(embedding);
                }
                Err(err) => {
                    debug!("[{}] coherence skipped: {}", server.name, err);
                    return HashMap::new();
                }
            }
        }

        let tool_centroid = centroid(&tool_embeddings);
        let server_context = format!(
            "Server {} provides: {}",
            preprocess(&server.name),
            tool_texts.join("; ")
        );
        let context_embedding = match embedder.embed(&server_context).await {
            Ok(embedding) => embedding,
            Err(err) => {
                debug!("[{}] coherence skipped: {}", server.name, err);
                return HashMap::new();
            }
        };

        let mut scores = HashMap::new();
        for (tool, embedding) in server.tools.iter().zip(&tool_embeddings) {
            let centroid_similarity = cosine_similarity(embedding, &tool_centroid);
            let context_similarity = cosine_similarity(embedding, &context_embedding);
            scores.insert(
                tool.name.clone(),
                0.7 * centroid_similarity + 0.3 * context_similarity,
            );
        }
        scores
    }

    /// Judge ladder over the structured consistency assessment.
    fn judge_signal(assessment: &ConsistencyAssessment) -> (f64, Vec<String>) {
        let mut score = 0.0;
        let mut notes = Vec::new();

        if assessment.server_alignment < 0.3 {
            score += 0.3;
            notes.push(format!(
                "Poor alignment with server purpose (score: {:.2})",
                assessment.server_alignment
            ));
        } else if assessment.server_alignment < 0.5 {
            score += 0.2;
            notes.push(format!(
                "Weak alignment with server purpose (score: {:.2})",
                assessment.server_alignment
            ));
        }

        if assessment.description_consistency < 0.3 {
            score += 0.3;
            notes.push(format!(
                "Description inconsistent with tool name (score: {:.2})",
                assessment.description_consistency
            ));
        } else if assessment.description_consistency < 0.5 {
            score += 0.2;
            notes.push(format!(
                "Description weakly matches tool name (score: {:.2})",
                assessment.description_consistency
            ));
        }

        if assessment.pattern_conformity < 0.3 {
            score += 0.2;
            notes.push(format!(
                "Does not follow server tool patterns (score: {:.2})",
                assessment.pattern_conformity
            ));
        }

        if !assessment.suspicion_indicators.is_empty() {
            score += 0.2 * assessment.suspicion_indicators.len() as f64;
            for indicator in assessment.suspicion_indicators.iter().take(2) {
                notes.push(format!("Suspicious: {indicator}"));
            }
        }

        if assessment.is_inconsistent {
            score += 0.3;
        }

        if !assessment.reasoning.is_empty() && score > 0.3 {
            notes.push(format!("Analysis: {}", assessment.reasoning));
        }

        ((score * assessment.confidence).min(1.0), notes)
    }
}

#[async_trait]
impl Detector for ConsistencyDetector {
    fn name(&self) -> &'static str {
        CONSISTENCY_CHECK
    }

    fn is_available(&self) -> bool {
        self.embedder.is_some() || self.judge.is_some()
    }

    async fn detect(&self, servers: &[Server]) -> Vec<DeviationResult> {
        let mut results = Vec::new();

        for server in servers {
            if !server.is_scanned() || server.tools.is_empty() {
                continue;
            }

            let coherence = match &self.embedder {
                Some(embedder) if server.tools.len() >= COHERENCE_MIN_TOOLS => {
                    Self::coherence_scores(embedder.as_ref(), server).await
                }
                _ => HashMap::new(),
            };

            for tool in &server.tools {
                let siblings: Vec<Tool> = server
                    .tools
                    .iter()
                    .filter(|t| *t != tool)
                    .cloned()
                    .collect();
                let mut report = SignalReport {
                    has_embedder: self.embedder.is_some(),
                    has_judge: self.judge.is_some(),
                    ..SignalReport::default()
                };

                if let Some(embedder) = &self.embedder {
                    match Self::context_signal(embedder.as_ref(), &server.name, tool).await {
                        Ok((score, notes)) => {
                            report.embedding_score = score;
                            report.embedding_notes = notes;
                        }
                        Err(err) => report.embedding_notes.push(err.to_string()),
                    }

                    if let Some(blended) = coherence.get(&tool.name) {
                        if *blended < 0.2 {
                            report.embedding_score += 0.4;
                            report
                                .embedding_notes
                                .push("Low semantic coherence with other tools in server".to_string());
                        } else if *blended < 0.4 {
                            report.embedding_score += 0.2;
                            report
                                .embedding_notes
                                .push("Below average semantic coherence".to_string());
                        }
                    }
                    report.embedding_score = report.embedding_score.min(1.0);
                }

                if let Some(judge) = &self.judge {
                    match judge.assess_consistency(&server.name, tool, &siblings).await {
                        Ok(assessment) => {
                            let (score, notes) = Self::judge_signal(&assessment);
                            report.judge_score = score;
                            report.judge_notes = notes;
                        }
                        Err(err) => report.judge_notes.push(err.to_string()),
                    }
                }

                debug!(
                    "[{}] {} consistency - embedding: {:.2}, judge: {:.2}",
                    server.name, tool.name, report.embedding_score, report.judge_score
                );

                results.push(report.into_result(
                    tool.clone(),
                    siblings,
                    self.policy,
                    DEVIATION_THRESHOLD,
                    NEUTRAL_REASON,
                ));
            }
        }

        results
    }
}
