//! Medical Risk Predictor CLI
//!
//! A command-line tool for listing clinical domains and their models,
//! running predictions over local artifacts, and verifying artifact sets.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{ArgGroup, Args, Parser, Subcommand};
use commands::{catalog, predict, verify};
use predictor_lib::{ArtifactStore, DomainId};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Medical Risk Predictor CLI
#[derive(Parser)]
#[command(name = "mrp")]
#[command(author, version, about = "CLI for Medical Risk Predictor", long_about = None)]
pub struct Cli {
    /// Artifact directory (can also be set via MRP_ARTIFACTS env var)
    #[arg(long, env = "MRP_ARTIFACTS")]
    pub artifacts: Option<PathBuf>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List supported domains
    Domains,

    /// Show the canonical feature order of a domain
    Features {
        /// Domain id (e.g. heart, parkinsons-severity)
        domain: DomainId,
    },

    /// Show the models of a domain
    Models {
        /// Domain id
        domain: DomainId,
    },

    /// Run a prediction
    Predict(PredictArgs),

    /// Load every artifact and report problems
    Verify {
        /// Only verify these domains
        #[arg(long, value_delimiter = ',')]
        domains: Vec<DomainId>,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("input").required(true).args(["set", "file", "named", "positional"])))]
pub struct PredictArgs {
    /// Domain id
    domain: DomainId,

    /// Model display name, e.g. "Random Forest"
    #[arg(long, short)]
    model: String,

    /// Feature value as name=value (repeatable)
    #[arg(long, value_parser = predict::parse_assignment)]
    set: Vec<(String, String)>,

    /// Feature file (.txt or .csv)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Data row of a CSV file to use, 0-based
    #[arg(long, default_value_t = 0, requires = "file")]
    row: usize,

    /// JSON object of named features from a signal extractor
    #[arg(long)]
    named: Option<PathBuf>,

    /// JSON array of positional features from an image extractor
    #[arg(long)]
    positional: Option<PathBuf>,
}

impl PredictArgs {
    fn source(self) -> predict::InputSource {
        if let Some(path) = self.file {
            predict::InputSource::File {
                path,
                row: self.row,
            }
        } else if let Some(path) = self.named {
            predict::InputSource::Named(path)
        } else if let Some(path) = self.positional {
            predict::InputSource::Positional(path)
        } else {
            predict::InputSource::Manual(self.set)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .compact()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .init();
    }

    let config = config::Config::load()?;
    let store = ArtifactStore::new(config.artifact_root(cli.artifacts));
    let format = config.format(cli.format);

    // Execute command
    match cli.command {
        Commands::Domains => catalog::list_domains(&store, format)?,
        Commands::Features { domain } => catalog::show_features(&store, domain, format)?,
        Commands::Models { domain } => catalog::show_models(&store, domain, format)?,
        Commands::Predict(args) => {
            let domain = args.domain;
            let model = args.model.clone();
            predict::run_prediction(&store, domain, &model, &args.source(), format)?;
        }
        Commands::Verify { domains } => {
            let domains = if domains.is_empty() {
                DomainId::ALL.to_vec()
            } else {
                domains
            };
            verify::verify_artifacts(&store, &domains, format)?;
        }
    }

    Ok(())
}
