//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads the config file and merges it with environment and flags
//! 2. Calls the engine to execute the command
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! `apply` talks to the platform over HTTP. Handlers stay synchronous and
//! build a `tokio` runtime to drive the engine.

mod apply;
mod completion;
mod config_cmd;

pub use apply::apply;
pub use completion::completion;
pub use config_cmd::config;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::args::Command;
use crate::core::config::{Baseline, BaselineOverrides, ConfigError, FileConfig, DEFAULT_URL};
use crate::ui::output::Verbosity;

/// Dispatch a command to its handler.
pub fn dispatch(
    command: Command,
    config_file: Option<&Path>,
    verbosity: Verbosity,
) -> Result<ExitCode> {
    match command {
        Command::Apply(args) => apply(&args, config_file, verbosity),
        Command::Config { url, baseline } => config(url, &baseline, config_file),
        Command::Completion { shell } => completion(shell),
    }
}

/// Load the config file, if any.
fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let (file, path) = FileConfig::load(explicit).context("Failed to load config")?;
    match path {
        Some(path) => debug!(path = %path.display(), "Loaded config file"),
        None => debug!("No config file found, using defaults"),
    }
    Ok(file)
}

/// Build the baseline from defaults, the file layer and the flag layer.
fn resolve_baseline(
    file: &FileConfig,
    flags: &BaselineOverrides,
) -> Result<Baseline, ConfigError> {
    let mut baseline = Baseline::default();
    baseline.apply(&file.baseline)?;
    baseline.apply(flags)?;
    baseline.validate()?;
    Ok(baseline)
}

/// The platform URL: flag or environment, then the file, then the default.
fn resolve_url(flag: Option<String>, file: &FileConfig) -> String {
    flag.filter(|u| !u.trim().is_empty())
        .or_else(|| file.url.clone())
        .unwrap_or_else(|| DEFAULT_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_precedence() {
        let file = FileConfig {
            url: Some("https://file.example.com".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_url(Some("https://flag.example.com".into()), &file),
            "https://flag.example.com"
        );
        assert_eq!(resolve_url(None, &file), "https://file.example.com");
        assert_eq!(resolve_url(Some("  ".into()), &file), "https://file.example.com");
        assert_eq!(resolve_url(None, &FileConfig::default()), DEFAULT_URL);
    }

    #[test]
    fn flags_override_file_baseline() {
        let file = FileConfig {
            baseline: BaselineOverrides {
                approvals_before_merge: Some(3),
                trunk: Some("main".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let flags = BaselineOverrides {
            approvals_before_merge: Some(2),
            ..Default::default()
        };

        let baseline = resolve_baseline(&file, &flags).unwrap();
        assert_eq!(baseline.merge_policy.approvals_before_merge, 2);
        assert_eq!(baseline.trunk.as_str(), "main");
    }

    #[test]
    fn invalid_combination_rejected() {
        let flags = BaselineOverrides {
            default_branch: Some("hotfix".into()),
            ..Default::default()
        };
        let err = resolve_baseline(&FileConfig::default(), &flags).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
