//! Cross-server detector: would this tool fit better under another server?
//!
//! Every scanned server gets an embedding profile: the centroid of its
//! name (weighted three-fold) and one embedding per tool, each phrased
//! with the server context baked in. A tool whose own embedding lands
//! markedly closer to a *different* server's profile is a placement
//! deviation candidate. The judge signal asks the external judge the same
//! question over the full corpus and converts its structured answer into
//! a score ladder.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use outrider_model::{DeviationResult, Server, Tool, DEVIATION_THRESHOLD};

use crate::detector::{Detector, ScorePolicy, SignalReport, CROSS_SERVER_ANALYSIS};
use crate::embedding::{centroid, cosine_similarity, TextEmbedder};
use crate::error::Result;
use crate::judge::{DeviationJudge, PlacementAssessment};
use crate::textproc::preprocess;

const NEUTRAL_REASON: &str = "Fits well with current server";

/// Scores each tool's placement against every scanned server's profile.
pub struct CrossServerDetector {
    embedder: Option<Arc<dyn TextEmbedder>>,
    judge: Option<Arc<dyn DeviationJudge>>,
    policy: ScorePolicy,
}

impl CrossServerDetector {
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

    /// Builds one embedding profile per corpus server, in corpus order.
    ///
    /// The server name embedding is weighted three-fold against the tool
    /// embeddings so sparse servers still profile around their identity.
    async fn build_profiles(
        embedder: &dyn TextEmbedder,
        corpus: &[&Server],
    ) -> Result<Vec<(String, Vec<f32>)>> {
        let mut profiles = Vec::with_capacity(corpus.len());
        for server in corpus {
            let mut members = Vec::with_capacity(server.tools.len() + 3);
            let name_embedding = embedder.embed(&server.name).await?;
            for _ in 0..3 {
                members.push(name_embedding.clone());
            }
            let server_context = preprocess(&server.name);
            for tool in &server.tools {
                let text = format!(
                    "In {} server: {}: {}",
                    server_context,
                    preprocess(&tool.name),
                    preprocess(&tool.description)
                );
                members.push(embedder.embed(&text).await?);
            }
            profiles.push((server.name.clone(), centroid(&members)));
        }
        Ok(profiles)
    }

    /// Embedding ladder: does the tool land closer to another profile?
    async fn fit_signal(
        embedder: &dyn TextEmbedder,
        tool: &Tool,
        current_server: &str,
        profiles: &[(String, Vec<f32>)],
    ) -> Result<(f64, Vec<String>)> {
        let tool_text = format!(
            "{}: {}",
            preprocess(&tool.name),
            preprocess(&tool.description)
        );
        let tool_embedding = embedder.embed(&tool_text).await?;

        let mut current_similarity = 0.0;
        let mut best_server = "";
        let mut best_similarity = f64::NEG_INFINITY;
        for (name, profile) in profiles {
            let similarity = cosine_similarity(&tool_embedding, profile);
            if name == current_server {
                current_similarity = similarity;
            }
            // Strictly greater keeps the first profile on ties, so output
            // stays deterministic in corpus order.
            if similarity > best_similarity {
                best_server = name;
                best_similarity = similarity;
            }
        }

        let mut score = 0.0;
        let mut notes = Vec::new();
        if best_server != current_server && best_similarity > current_similarity {
            let fit_difference = best_similarity - current_similarity;
            if fit_difference > 0.3 && best_similarity > 0.6 {
                score = 0.8;
                notes.push(format!(
                    "Tool has stronger semantic alignment with '{best_server}' \
                     (similarity: {best_similarity:.2} vs current: {current_similarity:.2})"
                ));
            } else if fit_difference > 0.2 && best_similarity > 0.5 {
                score = 0.6;
                notes.push(format!(
                    "Tool shows better semantic fit with '{best_server}' \
                     ({best_similarity:.2} vs current: {current_similarity:.2})"
                ));
            } else if fit_difference > 0.15 && best_similarity > 0.4 {
                score = 0.4;
                notes.push(format!(
                    "Tool has slightly better alignment with '{best_server}' \
                     ({best_similarity:.2} vs current: {current_similarity:.2})"
                ));
            }
        }
        Ok((score, notes))
    }

    /// Judge ladder over the structured placement assessment.
    fn judge_signal(current_server: &str, assessment: &PlacementAssessment) -> (f64, Vec<String>) {
        let mut score = 0.0;
        let mut notes = Vec::new();

        if assessment.current_fit < 0.3 {
            score += 0.5;
            notes.push(format!(
                "Very poor fit with current server (judge: {:.2})",
                assessment.current_fit
            ));
        } else if assessment.current_fit < 0.5 {
            score += 0.3;
            notes.push(format!(
                "Poor fit with current server (judge: {:.2})",
                assessment.current_fit
            ));
        }

        if assessment.best_server != current_server {
            let fit_difference = assessment.best_fit - assessment.current_fit;
            if fit_difference >= 0.5 {
                score += 0.8;
                notes.push(format!(
                    "Much better fit with '{}' (judge: {:.2} vs {:.2}, diff: +{:.2})",
                    assessment.best_server,
                    assessment.best_fit,
                    assessment.current_fit,
                    fit_difference
                ));
            } else if fit_difference >= 0.3 {
                score += 0.6;
                notes.push(format!(
                    "Better fit with '{}' (judge: {:.2} vs {:.2}, diff: +{:.2})",
                    assessment.best_server,
                    assessment.best_fit,
                    assessment.current_fit,
                    fit_difference
                ));
            } else if fit_difference >= 0.2 {
                score += 0.4;
                notes.push(format!(
                    "Slightly better fit with '{}' (judge: {:.2} vs {:.2}, diff: +{:.2})",
                    assessment.best_server,
                    assessment.best_fit,
                    assessment.current_fit,
                    fit_difference
                ));
            }
        } else {
            for other in &assessment.other_high_fit {
                let lead = assessment.current_fit - other.fit;
                if lead < 0.2 {
                    score += 0.3;
                    notes.push(format!(
                        "Current server '{}' is not significantly better than '{}' (diff: {:+.2})",
                        current_server, other.server, lead
                    ));
                }
            }
        }

        for other in &assessment.other_high_fit {
            let diff_from_current = other.fit - assessment.current_fit;
            if diff_from_current >= -0.2
                && other.fit >= 0.6
                && assessment.best_server != other.server
            {
                score += 0.2;
                notes.push(format!(
                    "Also fits well with '{}' (judge: {:.2}, diff from current: {:+.2})",
                    other.server, other.fit, diff_from_current
                ));
            }
        }

        if assessment.is_suspicious {
            score += 0.4;
            notes.push("Judge flags tool as suspicious".to_string());
        }

        if !assessment.reasoning.is_empty() && !notes.is_empty() {
            notes.push(format!("Analysis: {}", assessment.reasoning));
        }

        ((score * assessment.confidence).min(1.0), notes)
    }
}

#[async_trait]
impl Detector for CrossServerDetector {
    fn name(&self) -> &'static str {
        CROSS_SERVER_ANALYSIS
    }

    fn is_available(&self) -> bool {
        self.embedder.is_some() || self.judge.is_some()
    }

    async fn detect(&self, servers: &[Server]) -> Vec<DeviationResult> {
        let corpus: Vec<&Server> = servers
            .iter()
            .filter(|s| s.is_scanned() && !s.tools.is_empty())
            .collect();

        let profiles = match &self.embedder {
            Some(embedder) => Some(Self::build_profiles(embedder.as_ref(), &corpus).await),
            None => None,
        };
        if let Some(Err(err)) = &profiles {
            debug!("server profiles unavailable: {}", err);
        }

        let corpus_servers: Vec<Server> = corpus.iter().map(|s| (*s).clone()).collect();

        let mut results = Vec::new();
        for server in &corpus {
            for tool in &server.tools {
                let mut report = SignalReport {
                    has_embedder: self.embedder.is_some(),
                    has_judge: self.judge.is_some(),
                    ..SignalReport::default()
                };

                if let Some(embedder) = &self.embedder {
                    match &profiles {
                        Some(Ok(profiles)) => {
                            match Self::fit_signal(embedder.as_ref(), tool, &server.name, profiles)
                                .await
                            {
                                Ok((score, notes)) => {
                                    report.embedding_score = score;
                                    report.embedding_notes = notes;
                                }
                                Err(err) => report.embedding_notes.push(err.to_string()),
                            }
                        }
                        Some(Err(err)) => report.embedding_notes.push(err.to_string()),
                        None => {}
                    }
                }

                if let Some(judge) = &self.judge {
                    match judge
                        .assess_placement(tool, &server.name, &corpus_servers)
                        .await
                    {
                        Ok(assessment) => {
                            let (score, notes) = Self::judge_signal(&server.name, &assessment);
                            report.judge_score = score;
                            report.judge_notes = notes;
                        }
                        Err(err) => report.judge_notes.push(err.to_string()),
                    }
                }

                debug!(
                    "[{}] {} placement - embedding: {:.2}, judge: {:.2}",
                    server.name, tool.name, report.embedding_score, report.judge_score
                );

                let baseline: Vec<Tool> = server
                    .tools
                    .iter()
                    .filter(|t| *t != tool)
                    .cloned()
                    .collect();
                results.push(report.into_result(
                    tool.clone(),
                    baseline,
                    self.policy,
                    DEVIATION_THRESHOLD,
                    NEUTRAL_REASON,
                ));
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectError;
    use crate::judge::ServerFit;

    struct StubEmbedder;

    #[async_trait]
    impl TextEmbedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("alpha") {
                Ok(vec![1.0, 0.0, 0.0])
            } else if text.contains("omega") {
                Ok(vec![0.0, 1.0, 0.0])
            } else {
                Ok(vec![0.0, 0.0, 1.0])
            }
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl TextEmbedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(DetectError::Embedding("model not loaded".to_string()))
        }
    }

    struct StubJudge {
        assessment: PlacementAssessment,
    }

    #[async_trait]
    impl DeviationJudge for StubJudge {
        async fn assess_consistency(
            &self,
            _server_name: &str,
            _tool: &Tool,
            _siblings: &[Tool],
        ) -> Result<crate::judge::ConsistencyAssessment> {
            Err(DetectError::Judge("not under test".to_string()))
        }

        async fn assess_placement(
            &self,
            _tool: &Tool,
            _current_server: &str,
            _servers: &[Server],
        ) -> Result<PlacementAssessment> {
            Ok(self.assessment.clone())
        }
    }

    fn scanned_server(name: &str, tools: Vec<Tool>) -> Server {
        let mut server = Server::new(name, "echo");
        server.mark_scanned(tools);
        server
    }

    fn two_server_corpus() -> Vec<Server> {
        vec![
            scanned_server(
                "alpha_files",
                vec![Tool::new("alpha_read", "alpha data read", "alpha_files")],
            ),
            scanned_server(
                "omega_weather",
                vec![Tool::new("misplaced", "alpha data read", "omega_weather")],
            ),
        ]
    }

    #[test]
    fn test_available_iff_any_capability() {
        assert!(!CrossServerDetector::new(None, None).is_available());
        assert!(CrossServerDetector::new(Some(Arc::new(StubEmbedder)), None).is_available());
    }

    #[tokio::test]
    async fn test_tool_closer_to_other_server_flagged() {
        let detector = CrossServerDetector::new(Some(Arc::new(StubEmbedder)), None);
        let results = detector.detect(&two_server_corpus()).await;
        assert_eq!(results.len(), 2);

        let native = &results[0];
        assert!(!native.is_deviation);
        assert_eq!(native.reason, NEUTRAL_REASON);

        let misplaced = &results[1];
        assert!(misplaced.is_deviation);
        assert_eq!(misplaced.confidence, 0.8);
        assert!(misplaced
            .reason
            .contains("stronger semantic alignment with 'alpha_files'"));
    }

    #[tokio::test]
    async fn test_single_server_corpus_never_flags() {
        let detector = CrossServerDetector::new(Some(Arc::new(StubEmbedder)), None);
        let corpus = vec![scanned_server(
            "omega_weather",
            vec![Tool::new("misplaced", "alpha data read", "omega_weather")],
        )];

        let results = detector.detect(&corpus).await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].is_deviation);
    }

    #[tokio::test]
    async fn test_judge_much_better_fit_ladder() {
        let judge = StubJudge {
            assessment: PlacementAssessment {
                current_fit: 0.4,
                best_server: "filesystem".to_string(),
                best_fit: 0.9,
                other_high_fit: vec![],
                is_suspicious: false,
                confidence: 1.0,
                reasoning: "clearly misplaced".to_string(),
            },
        };
        let detector = CrossServerDetector::new(None, Some(Arc::new(judge)));
        let corpus = vec![scanned_server(
            "weather",
            vec![Tool::new("read_file", "Read a file", "weather")],
        )];

        let results = detector.detect(&corpus).await;
        let result = &results[0];

        // 0.3 (poor current fit) + 0.8 (much better fit elsewhere), capped.
        assert_eq!(result.confidence, 1.0);
        assert!(result.is_deviation);
        assert!(result.reason.contains("Poor fit with current server (judge: 0.40)"));
        assert!(result
            .reason
            .contains("Much better fit with 'filesystem' (judge: 0.90 vs 0.40, diff: +0.50)"));
        assert!(result.reason.contains("Analysis: clearly misplaced"));
    }

    #[tokio::test]
    async fn test_judge_near_tie_accumulates_soft_signals() {
        let judge = StubJudge {
            assessment: PlacementAssessment {
                current_fit: 0.7,
                best_server: "files".to_string(),
                best_fit: 0.7,
                other_high_fit: vec![ServerFit {
                    server: "backup".to_string(),
                    fit: 0.65,
                }],
                is_suspicious: false,
                confidence: 1.0,
                reasoning: String::new(),
            },
        };
        let detector = CrossServerDetector::new(None, Some(Arc::new(judge)));
        let corpus = vec![scanned_server(
            "files",
            vec![Tool::new("read_file", "Read a file", "files")],
        )];

        let results = detector.detect(&corpus).await;
        let result = &results[0];

        // 0.3 (near tie) + 0.2 (second high fit): suspicious but not decisive.
        assert!(!result.is_deviation);
        assert!((result.confidence - 0.5).abs() < 1e-9);
        assert!(result
            .reason
            .contains("Current server 'files' is not significantly better than 'backup'"));
        assert!(result.reason.contains("Also fits well with 'backup'"));
    }

    #[tokio::test]
    async fn test_profile_failure_noted_per_tool() {
        let detector = CrossServerDetector::new(Some(Arc::new(FailingEmbedder)), None);
        let results = detector.detect(&two_server_corpus()).await;

        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(!result.is_deviation);
            assert_eq!(result.confidence, 0.0);
            assert!(result.reason.contains("Embedding failed: model not loaded"));
        }
    }

    #[tokio::test]
    async fn test_skips_unscanned_servers() {
        let mut broken = Server::new("broken", "echo");
        broken.mark_error("spawn failed");

        let detector = CrossServerDetector::new(Some(Arc::new(StubEmbedder)), None);
        let results = detector.detect(&[broken]).await;
        assert!(results.is_empty());
    }
}
