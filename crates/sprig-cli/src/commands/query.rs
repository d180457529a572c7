//! Query command

use std::path::PathBuf;

use clap::Args;
use sprig_core::{CompiledPattern, NodeQueryFinder, NodeView, Strategy};

use super::io::load_document;
use crate::config::Config;
use crate::output::{format_nodes, OutputFormat};
use crate::Cli;

#[derive(Args)]
pub struct QueryArgs {
    /// Selector to evaluate
    pub selector: String,

    /// Document to query (.json or .toml)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Expand descendants depth-first
    #[arg(long)]
    pub dfs: bool,

    /// Maximum number of matches to print
    #[arg(short, long)]
    pub limit: Option<usize>,
}

pub async fn run(args: &QueryArgs, cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let document = load_document(&args.input).await?;
    let pattern = CompiledPattern::compile(&args.selector)?;

    let strategy = if args.dfs {
        Strategy::DepthFirst
    } else {
        config.strategy
    };

    let matches = NodeQueryFinder::new(&document.graph, &pattern)
        .with_strategy(strategy)
        .with_node_limit(config.node_limit)
        .find(document.origin);

    tracing::info!("Selector '{}' matched {} nodes", args.selector, matches.len());

    let views = matches
        .iter()
        .take(args.limit.unwrap_or(usize::MAX))
        .map(|id| NodeView::of(&document.graph, *id))
        .collect::<Result<Vec<_>, _>>()?;

    let format = cli.output_format(config);
    if views.is_empty() && format == OutputFormat::Table {
        println!("No matches for '{}'", args.selector);
    } else {
        print!("{}", format_nodes(&views, format));
    }

    Ok(())
}
