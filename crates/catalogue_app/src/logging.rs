//! Logger setup for the command line binary.
//!
//! The terminal logger writes info and debug lines to stdout, so commands whose
//! stdout is machine-read only log warnings there.

use catalogue_logging::LogDestination;
use log::LevelFilter;

use crate::cli::{Command, GlobalArgs};

pub fn initialize(global: &GlobalArgs, command: &Command) {
    let mut level = if global.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let quiet_stdout = matches!(command, Command::DaemonVersion(_));

    let destination = match (&global.log_file, quiet_stdout) {
        (Some(path), true) => LogDestination::File(path.clone()),
        (Some(path), false) => LogDestination::Both(path.clone()),
        (None, true) => {
            level = LevelFilter::Warn;
            LogDestination::Terminal
        }
        (None, false) => LogDestination::Terminal,
    };
    catalogue_logging::initialize(destination, level);
}
