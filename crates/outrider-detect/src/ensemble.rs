//! Detection ensemble: selects, runs, and combines the active detectors.
//!
//! Availability is resolved exactly once, at construction. The set of
//! active detectors is immutable input to every run; a capability that
//! disappears mid-process does not change the roster.
//!
//! A single selected method passes its raw judgments through untouched
//! (annotated with its contribution). Multiple methods are combined per
//! tool: every detector that flagged the tool contributes its confidence
//! scaled by a per-kind weight, the contributions are averaged, and
//! agreement between distinct detectors earns a multiplicative boost
//! before the global threshold decides.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use outrider_model::{DetectorContribution, DeviationResult, Server, DEVIATION_THRESHOLD};

use crate::detector::{DetectionMethod, Detector, CONSISTENCY_CHECK, CROSS_SERVER_ANALYSIS};

const NEUTRAL_REASON: &str = "No deviation detected by selected methods";

/// Tuning knobs for combining detector verdicts.
#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    /// Per-detector-kind confidence weights; kinds not listed weigh 1.0.
    pub weights: HashMap<String, f64>,
    /// Combined confidence at or above this value is a deviation.
    pub deviation_threshold: f64,
    /// Extra credit per additional agreeing detector.
    pub agreement_boost: f64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert(CONSISTENCY_CHECK.to_string(), 1.2);
        weights.insert(CROSS_SERVER_ANALYSIS.to_string(), 1.1);
        Self {
            weights,
            deviation_threshold: DEVIATION_THRESHOLD,
            agreement_boost: 0.1,
        }
    }
}

impl EnsembleConfig {
    fn weight(&self, kind: &str) -> f64 {
        self.weights.get(kind).copied().unwrap_or(1.0)
    }
}

/// What a run produced.
///
/// `NoMethodsAvailable` is a warning outcome, not an error: the requested
/// methods named no active detector, so nothing was scored.
#[derive(Debug)]
pub enum EnsembleOutcome {
    Ran(Vec<DeviationResult>),
    NoMethodsAvailable,
}

impl EnsembleOutcome {
    /// Unwraps into the result list; the warning outcome yields an empty one.
    pub fn into_results(self) -> Vec<DeviationResult> {
        match self {
            EnsembleOutcome::Ran(results) => results,
            EnsembleOutcome::NoMethodsAvailable => Vec::new(),
        }
    }
}

/// Runs detector subsets and merges their per-tool verdicts.
pub struct Ensemble {
    detectors: Vec<Arc<dyn Detector>>,
    config: EnsembleConfig,
}

impl Ensemble {
    /// Builds the ensemble, dropping detectors whose capabilities are absent.
    pub fn new(detectors: Vec<Arc<dyn Detector>>, config: EnsembleConfig) -> Self {
        let detectors = detectors
            .into_iter()
            .filter(|detector| {
                if detector.is_available() {
                    true
                } else {
                    warn!(
                        "{} detector is not available and will be skipped",
                        detector.name()
                    );
                    false
                }
            })
            .collect();
        Self { detectors, config }
    }

    /// Kinds of the detectors that survived the availability check.
    pub fn active_kinds(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Expands the requested methods into active detectors, deduplicated,
    /// in request order. Meta-selectors expand to the full active roster.
    fn select(&self, methods: &[DetectionMethod]) -> Vec<Arc<dyn Detector>> {
        let mut selected: Vec<Arc<dyn Detector>> = Vec::new();
        for method in methods {
            match method.kind() {
                None => {
                    for detector in &self.detectors {
                        if !selected.iter().any(|s| s.name() == detector.name()) {
                            selected.push(Arc::clone(detector));
                        }
                    }
                }
                Some(kind) => {
                    for detector in &self.detectors {
                        if detector.name() == kind
                            && !selected.iter().any(|s| s.name() == kind)
                        {
                            selected.push(Arc::clone(detector));
                        }
                    }
                }
            }
        }
        selected
    }

    /// Runs the requested methods over the scanned corpus.
    pub async fn run(&self, servers: &[Server], methods: &[DetectionMethod]) -> EnsembleOutcome {
        let selected = self.select(methods);
        if selected.is_empty() {
            let requested: Vec<String> = methods.iter().map(ToString::to_string).collect();
            warn!(
                "no active detectors match requested methods: {}",
                requested.join(", ")
            );
            return EnsembleOutcome::NoMethodsAvailable;
        }

        if selected.len() == 1 {
            let detector = &selected[0];
            debug!("running {} detector", detector.name());
            let results = detector
                .detect(servers)
                .await
                .into_iter()
                .map(|result| {
                    let contribution = DetectorContribution::new(
                        detector.name(),
                        result.confidence,
                        result.reason.lines().map(str::to_string).collect(),
                    );
                    result.with_contributions(vec![contribution])
                })
                .collect();
            return EnsembleOutcome::Ran(results);
        }

        let mut order: Vec<(String, String)> = Vec::new();
        let mut grouped: HashMap<(String, String), Vec<(&'static str, DeviationResult)>> =
            HashMap::new();
        for detector in &selected {
            debug!("running {} detector", detector.name());
            for result in detector.detect(servers).await {
                let (server, tool) = result.identity();
                let identity = (server.to_string(), tool.to_string());
                if !grouped.contains_key(&identity) {
                    order.push(identity.clone());
                }
                grouped
                    .entry(identity)
                    .or_default()
                    .push((detector.name(), result));
            }
        }

        let mut results = Vec::with_capacity(order.len());
        for identity in order {
            if let Some(entries) = grouped.remove(&identity) {
                if let Some(combined) = self.combine(entries) {
                    results.push(combined);
                }
            }
        }
        EnsembleOutcome::Ran(results)
    }

    /// Merges one tool's verdicts from every selected detector.
    fn combine(
        &self,
        entries: Vec<(&'static str, DeviationResult)>,
    ) -> Option<DeviationResult> {
        let mut weighted = Vec::new();
        let mut tagged_reasons = Vec::new();
        let mut contributions = Vec::new();
        for (kind, result) in &entries {
            if result.is_deviation {
                weighted.push(result.confidence * self.config.weight(kind));
                tagged_reasons.push(format!("{}: {}", kind, result.reason));
                contributions.push(DetectorContribution::new(
                    *kind,
                    result.confidence,
                    result.reason.lines().map(str::to_string).collect(),
                ));
            }
        }

        let (_, first) = entries.into_iter().next()?;
        if weighted.is_empty() {
            return Some(DeviationResult::clean(
                first.tool,
                first.baseline_tools,
                NEUTRAL_REASON,
            ));
        }

        let mean = weighted.iter().sum::<f64>() / weighted.len() as f64;
        let agreeing = weighted.len();
        let confidence = if agreeing > 1 {
            (mean * (1.0 + self.config.agreement_boost * (agreeing - 1) as f64)).min(1.0)
        } else {
            mean
        };
        let reason = format!(
            "Detected by {} method(s): {}",
            agreeing,
            tagged_reasons.join("; ")
        );
        Some(
            DeviationResult::judged(
                first.tool,
                first.baseline_tools,
                confidence,
                self.config.deviation_threshold,
                reason,
            )
            .with_contributions(contributions),
        )
    }
}
