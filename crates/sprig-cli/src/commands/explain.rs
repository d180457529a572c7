//! Explain command

use clap::Args;
use serde_json::json;
use sprig_core::CompiledPattern;

use crate::config::Config;
use crate::output::{to_json, OutputFormat};
use crate::Cli;

#[derive(Args)]
pub struct ExplainArgs {
    /// Selector to compile
    pub selector: String,
}

pub fn run(args: &ExplainArgs, cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let pattern = CompiledPattern::compile(&args.selector)?;

    match cli.output_format(config) {
        OutputFormat::Table => println!("{}", pattern),
        OutputFormat::Json => {
            let stages: Vec<_> = pattern
                .stages()
                .iter()
                .map(|stage| {
                    json!({
                        "relation": stage.relation(),
                        "filters": stage.filters().iter().map(|f| f.to_string()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!(
                "{}",
                to_json(&json!({ "selector": pattern.source(), "stages": stages }))
            );
        }
    }

    Ok(())
}
