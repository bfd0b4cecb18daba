//! cli
//!
//! Command-line interface layer for baseliner.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the log subscriber
//! - Assemble the run configuration and delegate to command handlers
//! - Map outcomes to exit codes
//!
//! # Architecture
//!
//! The CLI layer is thin. It is the only place that reads the process
//! environment or talks to the terminal; the [`crate::engine`] receives a
//! fully assembled [`RunConfig`](crate::core::config::RunConfig) and a
//! confirmation policy.
//!
//! # Exit Codes
//!
//! - `0`: every project reconciled
//! - `1`: at least one project failed
//! - `2`: fatal error (see `main.rs`)

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::ui::output::Verbosity;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    commands::dispatch(cli.command, cli.config_file.as_deref(), verbosity)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the crate logs at `info`, or at
/// `debug` with `--debug`. Logs go to stderr.
fn init_logging(debug: bool) {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(if debug {
            "baseliner=debug"
        } else {
            "baseliner=info"
        }),
    };

    // Already installed when embedded in a host that set one up
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
