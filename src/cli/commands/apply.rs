//! apply command - Reconcile a group's projects against the baseline

use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use tracing::debug;

use super::{load_file_config, resolve_baseline, resolve_url};
use crate::cli::args::ApplyArgs;
use crate::core::config::{ConfigError, FileConfig, GroupMatch, OnExisting, RunConfig};
use crate::engine::{self, ConfirmationPolicy};
use crate::platform::create_platform;
use crate::ui::output::{print_report, Verbosity};
use crate::ui::prompts::{self, StdinPrompt};

/// Run `apply`.
///
/// Returns exit code 1 when at least one project failed. Fatal errors are
/// returned as `Err`.
pub fn apply(args: &ApplyArgs, config_file: Option<&Path>, verbosity: Verbosity) -> Result<ExitCode> {
    let file = load_file_config(config_file)?;
    let mut config = build_run_config(args, &file)?;

    if config.on_existing == OnExisting::Prompt && !prompts::is_interactive() {
        bail!(ConfigError::InvalidValue(
            "--on-existing prompt needs an interactive terminal; use overwrite or skip".into()
        ));
    }
    if config.token.is_empty() {
        config.token = prompt_token()?;
    }
    debug!(?config, "Resolved run configuration");

    let platform = create_platform(&config.url, &config.token)?;
    let mut policy = ConfirmationPolicy::from_mode(config.on_existing, || Box::new(StdinPrompt));

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(engine::run(platform.as_ref(), &config, &mut policy))?;

    print_report(&report, args.json, verbosity).context("Failed to write report")?;

    if report.has_failures() {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Merge flags, environment and the config file into a run configuration.
///
/// The token is left empty when neither the flag nor the environment set it.
fn build_run_config(args: &ApplyArgs, file: &FileConfig) -> Result<RunConfig, ConfigError> {
    let group = args.group.trim();
    if group.is_empty() {
        return Err(ConfigError::Missing("group name"));
    }

    let group_match = if args.first_match {
        GroupMatch::First
    } else {
        file.group_match.unwrap_or_default()
    };

    Ok(RunConfig {
        url: resolve_url(args.url.clone(), file),
        token: args
            .token
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        group: group.to_string(),
        create_group: args.create_group,
        projects: args.projects.clone(),
        baseline: resolve_baseline(file, &args.baseline.overrides())?,
        on_existing: args.on_existing.or(file.on_existing).unwrap_or_default(),
        group_match,
    })
}

/// Ask for the token on the terminal.
fn prompt_token() -> Result<String> {
    if !prompts::is_interactive() {
        bail!(ConfigError::Missing(
            "access token (set GITLAB_ACCESS_TOKEN or pass --token)"
        ));
    }
    let token = prompts::password("GitLab access token: ").context("Failed to read token")?;
    if token.is_empty() {
        bail!(ConfigError::Missing("access token"));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::BaselineArgs;
    use crate::core::config::{BaselineOverrides, DEFAULT_URL};

    fn args() -> ApplyArgs {
        ApplyArgs {
            group: "Team".into(),
            create_group: false,
            projects: vec!["api".into()],
            url: None,
            token: None,
            on_existing: None,
            first_match: false,
            json: false,
            baseline: BaselineArgs::default(),
        }
    }

    #[test]
    fn defaults_when_nothing_configured() {
        let config = build_run_config(&args(), &FileConfig::default()).unwrap();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.token, "");
        assert_eq!(config.on_existing, OnExisting::Prompt);
        assert_eq!(config.group_match, GroupMatch::Exact);
        assert_eq!(config.baseline.default_branch.as_str(), "develop");
    }

    #[test]
    fn file_values_fill_gaps() {
        let file = FileConfig {
            url: Some("https://gitlab.example.com".into()),
            on_existing: Some(OnExisting::Skip),
            group_match: Some(GroupMatch::First),
            baseline: BaselineOverrides {
                approvals_before_merge: Some(2),
                ..Default::default()
            },
        };
        let config = build_run_config(&args(), &file).unwrap();
        assert_eq!(config.url, "https://gitlab.example.com");
        assert_eq!(config.on_existing, OnExisting::Skip);
        assert_eq!(config.group_match, GroupMatch::First);
        assert_eq!(config.baseline.merge_policy.approvals_before_merge, 2);
    }

    #[test]
    fn flags_beat_file() {
        let file = FileConfig {
            on_existing: Some(OnExisting::Skip),
            ..Default::default()
        };
        let mut args = args();
        args.on_existing = Some(OnExisting::Overwrite);
        args.first_match = true;
        args.token = Some(" glpat-abc \n".into());
        args.baseline.trunk = Some("main".into());

        let config = build_run_config(&args, &file).unwrap();
        assert_eq!(config.on_existing, OnExisting::Overwrite);
        assert_eq!(config.group_match, GroupMatch::First);
        assert_eq!(config.token, "glpat-abc");
        assert_eq!(config.baseline.trunk.as_str(), "main");
    }

    #[test]
    fn blank_group_rejected() {
        let mut args = args();
        args.group = "  ".into();
        assert!(matches!(
            build_run_config(&args, &FileConfig::default()),
            Err(ConfigError::Missing(_))
        ));
    }

    #[test]
    fn invalid_baseline_rejected_before_connecting() {
        let mut args = args();
        args.baseline.branches = Some(vec!["bad..name".into()]);
        assert!(matches!(
            build_run_config(&args, &FileConfig::default()),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
