//! # Outrider Detect - Tool Deviation Analysis
//!
//! Scores every discovered MCP tool for deviation from its declared home:
//! does the tool's description belong on the server that exposes it, and
//! would it fit better under a different server in the same configuration?
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           ENSEMBLE                             │
//! │   method selection · per-kind weights · agreement boost        │
//! ├───────────────────────────────┬────────────────────────────────┤
//! │     CONSISTENCY DETECTOR      │     CROSS-SERVER DETECTOR      │
//! │  tool vs own server context,  │  tool vs every server profile, │
//! │  server coherence (≥5 tools)  │  best-fit comparison           │
//! ├───────────────────────────────┴────────────────────────────────┤
//! │                     INJECTED CAPABILITIES                      │
//! │   TextEmbedder (vector similarity) · DeviationJudge (external  │
//! │   assessment); either may be absent, detectors degrade         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scoring model
//!
//! Each detector folds an embedding signal and a judge signal into one
//! confidence per tool (policy: take the maximum, or blend). The ensemble
//! then weights each flagging detector's confidence by its kind, averages,
//! and boosts agreement between distinct detectors, capped at 1.0. A
//! combined confidence at or above the global threshold (0.6) is a
//! deviation.
//!
//! Detectors never fail a run: a missing or erroring capability degrades
//! that signal to zero and the failure is recorded in the result's reason
//! text. Availability is resolved once, when the [`Ensemble`] is built.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use outrider_detect::{
//!     ConsistencyDetector, CrossServerDetector, DetectionMethod, Detector,
//!     Ensemble, EnsembleConfig, HashEmbedder,
//! };
//!
//! # async fn run(servers: Vec<outrider_model::Server>) {
//! let embedder = Arc::new(HashEmbedder::new());
//! let detectors: Vec<Arc<dyn Detector>> = vec![
//!     Arc::new(ConsistencyDetector::new(Some(embedder.clone()), None)),
//!     Arc::new(CrossServerDetector::new(Some(embedder), None)),
//! ];
//! let ensemble = Ensemble::new(detectors, EnsembleConfig::default());
//!
//! let outcome = ensemble.run(&servers, &[DetectionMethod::Multi]).await;
//! for result in outcome.into_results() {
//!     if result.is_deviation {
//!         println!("{}: {:.0}%", result.tool.name, result.confidence * 100.0);
//!     }
//! }
//! # }
//! ```

pub mod consistency;
pub mod crossserver;
pub mod detector;
pub mod embedding;
pub mod ensemble;
pub mod error;
pub mod judge;
pub mod textproc;

pub use consistency::ConsistencyDetector;
pub use crossserver::CrossServerDetector;
pub use detector::{
    DetectionMethod, Detector, ScorePolicy, CONSISTENCY_CHECK, CROSS_SERVER_ANALYSIS,
};
pub use embedding::{cosine_similarity, HashEmbedder, TextEmbedder};
pub use ensemble::{Ensemble, EnsembleConfig, EnsembleOutcome};
pub use error::{DetectError, Result};
pub use judge::{
    ConsistencyAssessment, DeviationJudge, PlacementAssessment, ServerFit,
};
