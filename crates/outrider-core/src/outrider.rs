//! The Outrider orchestration facade.
//!
//! One entry point wiring the workspace together: locate and parse the
//! host configuration, scan every configured server, run the detection
//! ensemble over the discovered tools, and hand back everything a report
//! needs.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use outrider_detect::{DetectionMethod, Detector, Ensemble, EnsembleConfig, EnsembleOutcome};
use outrider_model::{DeviationResult, Server};
use outrider_scan::{ScanOptions, ServerScanner};

use crate::config;
use crate::error::Result;
use crate::report::{self, JsonReport};

/// Configuration for a full Outrider run.
#[derive(Debug, Clone)]
pub struct OutriderConfig {
    /// Explicit host config path; the platform-conventional path when `None`.
    pub config_path: Option<PathBuf>,

    /// Scanner tuning.
    pub scan: ScanOptions,

    /// Detection methods to run.
    pub methods: Vec<DetectionMethod>,

    /// Ensemble weights and thresholds.
    pub ensemble: EnsembleConfig,
}

impl Default for OutriderConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            scan: ScanOptions::default(),
            methods: vec![DetectionMethod::Multi],
            ensemble: EnsembleConfig::default(),
        }
    }
}

/// Everything one run produced: annotated servers plus per-tool judgments.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Servers in configuration order, each with a terminal scan status.
    pub servers: Vec<Server>,

    /// One judgment per discovered tool, in first-seen order.
    pub results: Vec<DeviationResult>,
}

impl ScanOutcome {
    /// Number of flagged tools.
    pub fn deviation_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_deviation).count()
    }

    /// Human-readable rendering.
    pub fn summary_text(&self, verbose: bool) -> String {
        report::summary_text(&self.servers, &self.results, verbose)
    }

    /// Pretty-printed JSON rendering.
    pub fn json_string(&self) -> Result<String> {
        JsonReport::build(&self.servers, &self.results).to_pretty_string()
    }
}

/// Unified facade over configuration, scanning, and detection.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use outrider_core::{Outrider, OutriderConfig};
/// use outrider_detect::{ConsistencyDetector, CrossServerDetector, Detector, HashEmbedder};
///
/// # async fn run() -> outrider_core::Result<()> {
/// let embedder = Arc::new(HashEmbedder::new());
/// let detectors: Vec<Arc<dyn Detector>> = vec![
///     Arc::new(ConsistencyDetector::new(Some(embedder.clone()), None)),
///     Arc::new(CrossServerDetector::new(Some(embedder), None)),
/// ];
///
/// let outrider = Outrider::new(OutriderConfig::default(), detectors);
/// let outcome = outrider.run().await?;
/// println!("{}", outcome.summary_text(false));
/// # Ok(())
/// # }
/// ```
pub struct Outrider {
    config: OutriderConfig,
    scanner: ServerScanner,
    ensemble: Ensemble,
}

impl Outrider {
    /// Builds the facade over the supplied detectors.
    ///
    /// Detector availability is resolved here, once; detectors missing
    /// their capabilities are dropped from every subsequent run.
    pub fn new(config: OutriderConfig, detectors: Vec<Arc<dyn Detector>>) -> Self {
        let scanner = ServerScanner::new(config.scan.clone());
        let ensemble = Ensemble::new(detectors, config.ensemble.clone());
        info!(
            "Outrider initialized with {} active detector(s)",
            ensemble.active_kinds().len()
        );
        Self {
            config,
            scanner,
            ensemble,
        }
    }

    /// Loads the host configuration, scans every server, runs detection.
    ///
    /// Only configuration problems fail the run; scan and detection
    /// failures are recorded in the outcome itself.
    pub async fn run(&self) -> Result<ScanOutcome> {
        let path = match &self.config.config_path {
            Some(path) => path.clone(),
            None => config::default_config_path()?,
        };
        debug!("loading host config from {}", path.display());
        let descriptors = config::load_servers(&path)?;
        info!("Found {} MCP servers", descriptors.len());
        Ok(self.run_with_servers(descriptors).await)
    }

    /// Scans pre-built descriptors and runs detection over the results.
    pub async fn run_with_servers(&self, descriptors: Vec<Server>) -> ScanOutcome {
        let servers = self.scanner.scan_all(descriptors).await;
        let results = match self.ensemble.run(&servers, &self.config.methods).await {
            EnsembleOutcome::Ran(results) => results,
            EnsembleOutcome::NoMethodsAvailable => {
                warn!("no detection methods were available; reporting scan results only");
                Vec::new()
            }
        };
        ScanOutcome { servers, results }
    }
}
