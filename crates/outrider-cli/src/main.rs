//! MCP Outrider CLI - scan configured MCP servers for tool deviations

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use tracing::debug;

use outrider_core::{
    ConsistencyDetector, CrossServerDetector, DetectionMethod, Detector, HashEmbedder, Outrider,
    OutriderConfig, ScanOptions,
};

#[derive(Parser)]
#[command(name = "outrider")]
#[command(about = "MCP Outrider - Detect tool deviations in MCP servers")]
struct Cli {
    /// Path to the Claude Desktop config file (auto-detected if not provided)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Timeout for scanning each server, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,

    /// Scan retry attempts after the first failure
    #[arg(long, value_name = "N", default_value_t = 2)]
    retries: u32,

    /// Detection methods: consistency, cross-server, multi, ai (default: multi)
    #[arg(long, value_name = "METHOD", num_args = 1..)]
    methods: Vec<DetectionMethod>,

    /// Enable LLM-backed judgment (requires an API key)
    #[arg(long)]
    use_ai: bool,

    /// API key for LLM judgment (falls back to the OPENAI_API_KEY env var)
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Output format for the report
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Write the report to this file as well
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Verbose logging, plus per-tool analysis in text reports
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Explicit methods win; `--use-ai` upgrades the default to the AI set.
fn resolve_methods(cli: &Cli) -> Vec<DetectionMethod> {
    if !cli.methods.is_empty() {
        cli.methods.clone()
    } else if cli.use_ai {
        vec![DetectionMethod::AiEnhanced]
    } else {
        vec![DetectionMethod::Multi]
    }
}

fn detectors() -> Vec<Arc<dyn Detector>> {
    let embedder = Arc::new(HashEmbedder::new());
    vec![
        Arc::new(ConsistencyDetector::new(Some(embedder.clone()), None)),
        Arc::new(CrossServerDetector::new(Some(embedder), None)),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let api_key = cli
        .api_key
        .clone()
        .or_else(|| env::var("OPENAI_API_KEY").ok());
    if cli.use_ai && api_key.is_none() {
        bail!("--use-ai requires an API key; pass --api-key or set OPENAI_API_KEY");
    }

    let methods = resolve_methods(&cli);
    let names: Vec<String> = methods.iter().map(|m| m.to_string()).collect();
    debug!("detection methods: {}", names.join(", "));

    let config = OutriderConfig {
        config_path: cli.config.clone(),
        scan: ScanOptions {
            timeout: Duration::from_secs(cli.timeout),
            retries: cli.retries,
            ..ScanOptions::default()
        },
        methods,
        ..OutriderConfig::default()
    };

    let outrider = Outrider::new(config, detectors());
    let outcome = outrider.run().await?;

    let report = match cli.output {
        OutputFormat::Text => outcome.summary_text(cli.debug),
        OutputFormat::Json => outcome.json_string()?,
    };
    println!("{report}");

    if let Some(path) = &cli.save {
        outrider_core::save(&report, path)?;
        println!("Report saved to: {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).unwrap()
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let cli = parse(&["outrider"]);
        assert!(cli.config.is_none());
        assert_eq!(cli.timeout, 30);
        assert_eq!(cli.retries, 2);
        assert!(cli.methods.is_empty());
        assert!(!cli.use_ai);
        assert_eq!(cli.output, OutputFormat::Text);
        assert_eq!(resolve_methods(&cli), vec![DetectionMethod::Multi]);
    }

    #[test]
    fn test_explicit_methods_parse_and_win_over_use_ai() {
        let cli = parse(&[
            "outrider",
            "--use-ai",
            "--methods",
            "consistency",
            "cross-server",
        ]);
        assert_eq!(
            resolve_methods(&cli),
            vec![DetectionMethod::Consistency, DetectionMethod::CrossServer]
        );
    }

    #[test]
    fn test_use_ai_upgrades_default_method_set() {
        let cli = parse(&["outrider", "--use-ai", "--api-key", "sk-test"]);
        assert_eq!(resolve_methods(&cli), vec![DetectionMethod::AiEnhanced]);
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let result = Cli::try_parse_from(["outrider", "--methods", "entropy"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_json_output_flag_parses() {
        let cli = parse(&["outrider", "--output", "json", "--save", "out.json"]);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.save, Some(PathBuf::from("out.json")));
    }
}
