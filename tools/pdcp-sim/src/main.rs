use std::fs;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use config::{CmdLine, Config};
use engine::Simulation;

pub mod channel;
pub mod config;
pub mod engine;

fn main() -> Result<()> {
    let cmd_line = CmdLine::parse();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(cmd_line.log_level.unwrap_or(tracing::Level::ERROR))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("failed to install log subscriber: {}", e))?;

    let cfg = Config::load(&cmd_line).context("failed to load configuration")?;
    let report = Simulation::try_new(&cfg)
        .context("failed to set up simulation")?
        .run();
    report.log_summary();

    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    match &cmd_line.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write report to: {}", path))?,
        None => println!("{}", json),
    }
    Ok(())
}
