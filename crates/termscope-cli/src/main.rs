//! termscope command line.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use termscope_core::{parse_input_url, parse_privacy_analysis, RubricValidator};
use termscope_runtime::{RuntimeConfig, TermsScope};
use tracing::info;

const DEFAULT_FILTER: &str = "termscope_core=info,termscope_runtime=info,termscope_cli=info";
const VERBOSE_FILTER: &str = "termscope_core=debug,termscope_runtime=debug,termscope_cli=debug";

#[derive(Parser)]
#[command(
    name = "termscope",
    about = "Find a website's privacy policy and score it against a strict privacy rubric",
    version
)]
struct Cli {
    /// Runtime config file (YAML or JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging. RUST_LOG overrides this.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover privacy policy and terms pages.
    Discover {
        /// Site URL or bare host, e.g. example.com
        url: String,
    },

    /// Discover policy pages and analyze them with the configured LLM.
    Analyze {
        /// Site URL or bare host, e.g. example.com
        url: String,

        /// Include token usage and estimated cost in the output.
        #[arg(long)]
        usage: bool,
    },

    /// Show how a link would be scored during discovery.
    Classify {
        /// Link URL.
        url: String,

        /// Anchor text of the link.
        #[arg(short, long, default_value = "")]
        anchor: String,
    },

    /// Check an analysis JSON document against the schema and rubric.
    Validate {
        /// Path to the analysis, or "-" for stdin.
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if cli.verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Discover { url } => {
            let scope = TermsScope::builder()
                .config(config)
                .discovery_only()
                .build()?;
            let check = scope.check_terms(&url).await?;
            print_json(&check)?;
        }

        Commands::Analyze { url, usage } => {
            let scope = TermsScope::builder()
                .config(config)
                .build()
                .context("Failed to set up analysis")?;
            let report = scope.analyze_with_report(&url).await?;
            info!(
                llm_calls = report.usage.llm_calls,
                total_tokens = report.usage.total_tokens,
                estimated_cost = report.usage.estimated_cost,
                pages_fetched = report.crawl.pages_fetched,
                "Analysis finished"
            );
            if usage {
                print_json(&json!({
                    "result": report.result,
                    "usage": report.usage,
                }))?;
            } else {
                print_json(&report.result)?;
            }
        }

        Commands::Classify { url, anchor } => {
            let url = parse_input_url(&url)?;
            let classifier = config.build_classifier()?;
            print_json(&classifier.explain(&url, &anchor))?;
        }

        Commands::Validate { file } => {
            let text = read_input(&file)?;
            let analysis = parse_privacy_analysis(&text)
                .with_context(|| format!("{} is not a valid analysis", file))?;

            let validator = RubricValidator::new();
            let assessment = validator.assess(&analysis);
            let band = assessment.band();
            let validated = validator.validate(analysis);
            print_json(&json!({
                "analysis": validated,
                "assessment": assessment,
                "band": band,
            }))?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
