//! Filter function listing

use sprig_core::FilterRegistry;

use crate::config::Config;
use crate::output::{to_json, OutputFormat};
use crate::Cli;

pub fn run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let names = FilterRegistry::snapshot()?.names();

    match cli.output_format(config) {
        OutputFormat::Json => println!("{}", to_json(&names)),
        OutputFormat::Table => {
            for name in names {
                println!("{}()", name);
            }
        }
    }
    Ok(())
}
