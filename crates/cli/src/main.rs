//! `wms` binary entry point.

use anyhow::Result;
use clap::Parser;

use wms_cli::Cli;
use wms_infra::RunnerConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config(RunnerConfig::from_env());

    wms_observability::init(config.log_format);

    let report = wms_cli::commands::run(&cli, &config)?;
    if !report.success() {
        std::process::exit(2);
    }
    Ok(())
}
