mod cli;
mod logging;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use catalogue_engine::{
    query_binary, EngineConfig, EngineHandle, ProcessInvoker, ResolveOptions,
    DEFAULT_INVOKE_TIMEOUT, DEFAULT_VERSION_FLAG,
};
use catalogue_logging::catalogue_info;
use clap::Parser;

use crate::cli::{Cli, Command, GlobalArgs};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(&cli.global, &cli.command);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Scrape => {
            let (report, catalogue) = engine(&cli.global)?.scrape().context("scrape failed")?;
            catalogue_info!(
                "Scraped {} version(s); catalogue lists {} export and {} browser release(s)",
                report.fetched.len(),
                catalogue.export.records.len(),
                catalogue.browser.records.len()
            );
        }
        Command::Resolve(args) => {
            let options = ResolveOptions {
                os_filter: args.os_filter,
                all_versions: args.all_versions,
            };
            let (report, _) = engine(&cli.global)?
                .resolve(&options)
                .context("resolve failed")?;
            catalogue_info!(
                "Resolved {} daemon version(s), {} skipped",
                report.resolved.len(),
                report.skipped.len()
            );
        }
        Command::Rebuild => {
            engine(&cli.global)?.rebuild().context("rebuild failed")?;
        }
        Command::DaemonVersion(args) => print_daemon_version(&args.binary)?,
    }
    Ok(())
}

fn engine(global: &GlobalArgs) -> Result<EngineHandle> {
    let mut config = EngineConfig::default_with_data_dir(global.data_dir.clone());
    config.base_url = global.base_url.clone();
    EngineHandle::new(config).context("failed to start engine")
}

fn print_daemon_version(binary: &Path) -> Result<()> {
    let version = query_binary(
        &ProcessInvoker,
        binary,
        DEFAULT_VERSION_FLAG,
        DEFAULT_INVOKE_TIMEOUT,
    )
    .with_context(|| format!("cannot read daemon version from {}", binary.display()))?;
    println!("{version}");
    Ok(())
}
