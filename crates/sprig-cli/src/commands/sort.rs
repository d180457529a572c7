//! Topological sort command

use std::path::PathBuf;

use clap::Args;
use sprig_core::{Error, NodeView, TopologicalSorter};

use super::io::load_document;
use crate::config::Config;
use crate::output::format_nodes;
use crate::Cli;

#[derive(Args)]
pub struct SortArgs {
    /// Graph document (.json or .toml)
    #[arg(short, long)]
    pub input: PathBuf,
}

pub async fn run(args: &SortArgs, cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let document = load_document(&args.input).await?;
    let graph = &document.graph;

    let limit = config.node_limit;
    let sorted = match TopologicalSorter::sort_from_limited(graph, document.origin, limit) {
        Ok(sorted) => sorted,
        Err(Error::CycleDetected { remaining }) => {
            eprintln!("Nodes on or behind a cycle:");
            for id in &remaining {
                eprintln!("  {}", graph.path(*id));
            }
            anyhow::bail!("Cycle detected among {} nodes", remaining.len());
        }
        Err(e) => return Err(e.into()),
    };

    let views = sorted
        .iter()
        .map(|id| NodeView::of(graph, *id))
        .collect::<Result<Vec<_>, _>>()?;
    print!("{}", format_nodes(&views, cli.output_format(config)));

    Ok(())
}
