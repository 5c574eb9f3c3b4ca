//! Command line arguments for `tor-catalogue`.

use std::path::PathBuf;

use catalogue_engine::DEFAULT_BASE_URL;
use clap::{Args, Parser, Subcommand};

/// Catalogue release artifacts published on the Tor package archive.
#[derive(Parser, Debug)]
#[command(name = "tor-catalogue")]
#[command(version, about)]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Scrape the archive and publish JSON under ./data/json:\n",
    "    $ tor-catalogue scrape\n\n",
    "  Resolve daemon versions of the newest Linux expert bundles:\n",
    "    $ OS_FILTER=linux tor-catalogue resolve\n\n",
    "  Print the version reported by a local binary:\n",
    "    $ tor-catalogue daemon-version ./tor/tor",
))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory holding `cache/` and `json/`.
    #[arg(long, global = true, value_name = "DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Top-level listing of the release archive.
    #[arg(long, global = true, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Also write the log to this file.
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log debug output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scrape the archive, merge into the cache and rebuild the catalogue.
    Scrape,

    /// Run downloaded daemon binaries to record their versions, then rebuild.
    Resolve(ResolveArgs),

    /// Regenerate the published JSON from the cache without network access.
    Rebuild,

    /// Print the daemon version reported by a local binary.
    DaemonVersion(DaemonVersionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Only files whose name contains this token, e.g. `linux`.
    #[arg(long, env = "OS_FILTER", value_name = "TOKEN")]
    pub os_filter: Option<String>,

    /// Visit every export version instead of only the newest.
    #[arg(long)]
    pub all_versions: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DaemonVersionArgs {
    /// Path to the daemon binary.
    pub binary: PathBuf,
}
