//! Sprig CLI - Query node documents with path selectors

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{completions, config as config_cmd, explain, functions, query, sort};
use config::Config;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "sprig")]
#[command(author, version, about = "Query trees and graphs with path selectors")]
pub struct Cli {
    /// Output format: table, json (defaults to the configured format)
    #[arg(short, long, global = true)]
    pub format: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Output format from the flag, falling back to the config file
    pub fn output_format(&self, config: &Config) -> OutputFormat {
        OutputFormat::from(self.format.as_deref().unwrap_or(&config.format))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a selector against a document
    Query(query::QueryArgs),
    /// Show the compiled stages of a selector
    Explain(explain::ExplainArgs),
    /// Print the reachable nodes of a graph in dependency order
    Sort(sort::SortArgs),
    /// List the registered filter functions
    Functions,
    /// Manage CLI configuration
    Config(config_cmd::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting sprig CLI");

    let config = Config::load();

    match &cli.command {
        Commands::Query(args) => query::run(args, &cli, &config).await?,
        Commands::Explain(args) => explain::run(args, &cli, &config)?,
        Commands::Sort(args) => sort::run(args, &cli, &config).await?,
        Commands::Functions => functions::run(&cli, &config)?,
        Commands::Config(args) => config_cmd::run(args).await?,
        Commands::Completions(args) => completions::run(args)?,
    }

    Ok(())
}
