//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug` / `-d`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--config <path>`: Read settings from this file
//!
//! # Environment
//!
//! Every baseline flag has a `GITLAB_*` environment variable counterpart.
//! clap resolves flag-over-environment; the config file sits below both.

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::config::{BaselineOverrides, OnExisting};

/// baseliner - Reconcile GitLab projects against a branch and policy baseline
#[derive(Parser, Debug)]
#[command(name = "baseliner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging and a more detailed summary
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Read settings from this config file
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or update projects so they match the baseline
    #[command(
        name = "apply",
        long_about = "Create or update projects so they match the baseline.\n\n\
            Resolves the target group (optionally creating it), then for every \
            requested project either creates it or, after confirmation, updates \
            its merge settings. Each project then gets the managed branches, the \
            default branch, the push rule and the protected-branch rules.\n\n\
            Failures are scoped to the project or step they concern. The exit \
            code is 1 when any project failed and 2 when the run could not start.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Create two projects in an existing group
    baseliner apply -g Platform -p api web

    # Create the group too, overwriting existing projects without asking
    baseliner apply -g \"New Team\" -c -p api --on-existing overwrite

    # Use a self-hosted instance and a main trunk
    baseliner apply -u https://gitlab.example.com -g Platform -p api --trunk main --branches develop

    # Machine-readable report for scripting
    baseliner apply -g Platform -p api --on-existing skip --json

COMMON SCENARIOS:
    Re-running after a partial failure:
        baseliner apply -g Platform -p api web --on-existing overwrite
        # projects already in line report 'unchanged' and issue no writes"
    )]
    Apply(ApplyArgs),

    /// Print the resolved baseline as TOML
    #[command(
        name = "config",
        long_about = "Print the resolved settings as TOML.\n\n\
            Shows the result of merging defaults, the config file, environment \
            variables and flags, exactly as `apply` would see it. The access \
            token is never printed.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Show what apply would use
    baseliner config

    # Check the effect of an override
    GITLAB_APPROVALS_BEFORE_MERGE=2 baseliner config

    # Seed a config file
    baseliner config > ~/.baseliner/config.toml"
    )]
    Config {
        /// GitLab URL
        #[arg(short, long, env = "GITLAB_URL")]
        url: Option<String>,

        #[command(flatten)]
        baseline: BaselineArgs,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for `apply`.
#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    /// Target group name
    #[arg(short, long)]
    pub group: String,

    /// Create the group if it does not exist
    #[arg(short, long)]
    pub create_group: bool,

    /// Project names to create or update
    #[arg(short, long, num_args = 1.., required = true, value_name = "NAME")]
    pub projects: Vec<String>,

    /// GitLab URL
    #[arg(short, long, env = "GITLAB_URL")]
    pub url: Option<String>,

    /// Personal access token (prompted for when missing and stdin is a terminal)
    #[arg(short, long, env = "GITLAB_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// What to do with projects that already exist
    #[arg(long, value_enum, value_name = "MODE")]
    pub on_existing: Option<OnExisting>,

    /// Take the first group search result instead of requiring an exact match
    #[arg(long)]
    pub first_match: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub baseline: BaselineArgs,
}

/// Baseline overrides shared by `apply` and `config`.
#[derive(Args, Debug, Clone, Default)]
pub struct BaselineArgs {
    /// Branches every project must have (comma-separated)
    #[arg(
        long,
        env = "GITLAB_DEFAULT_BRANCHES",
        value_delimiter = ',',
        value_name = "BRANCH,..."
    )]
    pub branches: Option<Vec<String>>,

    /// Branch to set as the project default
    #[arg(short = 'b', long = "branch", env = "GITLAB_DEFAULT_BRANCH")]
    pub default_branch: Option<String>,

    /// The platform's initial branch
    #[arg(long, env = "GITLAB_TRUNK_BRANCH")]
    pub trunk: Option<String>,

    /// Create new projects with an initial README commit
    #[arg(
        long,
        env = "GITLAB_INITIALIZE_WITH_README",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub initialize_with_readme: Option<bool>,

    /// Only allow merges once the pipeline succeeded
    #[arg(
        long = "only-allow-merge-if-pipeline-succeeds",
        env = "GITLAB_ONLY_ALLOW_MERGE_IF_PIPELINE_SUCCEEDS",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub pipeline_must_succeed: Option<bool>,

    /// Only allow merges once all discussions are resolved
    #[arg(
        long = "only-allow-merge-if-all-discussions-are-resolved",
        env = "GITLAB_ONLY_ALLOW_MERGE_IF_ALL_DISCUSSIONS_ARE_RESOLVED",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub discussions_must_be_resolved: Option<bool>,

    /// Approvals required before a merge request can be merged
    #[arg(long, env = "GITLAB_APPROVALS_BEFORE_MERGE", value_name = "N")]
    pub approvals_before_merge: Option<u32>,

    /// Commit author emails must match this regex
    #[arg(long, env = "GITLAB_AUTHOR_EMAIL_REGEX", value_name = "REGEX")]
    pub author_email_regex: Option<String>,

    /// Pushed branch names must match this regex
    #[arg(long, env = "GITLAB_BRANCH_NAME_REGEX", value_name = "REGEX")]
    pub branch_name_regex: Option<String>,

    /// Forbid deleting tags
    #[arg(
        long,
        env = "GITLAB_DENY_DELETE_TAG",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub deny_delete_tag: Option<bool>,
}

impl BaselineArgs {
    /// The flag and environment layer as baseline overrides.
    pub fn overrides(&self) -> BaselineOverrides {
        BaselineOverrides {
            branches: self.branches.clone(),
            default_branch: self.default_branch.clone(),
            trunk: self.trunk.clone(),
            initialize_with_readme: self.initialize_with_readme,
            pipeline_must_succeed: self.pipeline_must_succeed,
            discussions_must_be_resolved: self.discussions_must_be_resolved,
            approvals_before_merge: self.approvals_before_merge,
            author_email_regex: self.author_email_regex.clone(),
            branch_name_regex: self.branch_name_regex.clone(),
            deny_delete_tag: self.deny_delete_tag,
        }
    }
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    fn apply(args: &[&str]) -> ApplyArgs {
        let mut argv = vec!["baseliner", "apply"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Apply(args) => args,
            other => panic!("expected apply, got {:?}", other),
        }
    }

    #[test]
    fn parse_apply_minimal() {
        let args = apply(&["-g", "Team", "-p", "api", "web"]);
        assert_eq!(args.group, "Team");
        assert_eq!(args.projects, vec!["api", "web"]);
        assert!(!args.create_group);
        assert!(args.on_existing.is_none());
    }

    #[test]
    fn parse_apply_full() {
        let args = apply(&[
            "-g",
            "Team",
            "-c",
            "-p",
            "api",
            "--on-existing",
            "skip",
            "--first-match",
            "--json",
            "--branches",
            "develop,qa",
            "-b",
            "qa",
            "--only-allow-merge-if-pipeline-succeeds",
            "yes",
            "--deny-delete-tag",
            "off",
            "--approvals-before-merge",
            "2",
        ]);
        assert!(args.create_group);
        assert_eq!(args.on_existing, Some(OnExisting::Skip));
        assert!(args.first_match);
        assert!(args.json);

        let overrides = args.baseline.overrides();
        assert_eq!(
            overrides.branches,
            Some(vec!["develop".to_string(), "qa".to_string()])
        );
        assert_eq!(overrides.default_branch.as_deref(), Some("qa"));
        assert_eq!(overrides.pipeline_must_succeed, Some(true));
        assert_eq!(overrides.deny_delete_tag, Some(false));
        assert_eq!(overrides.approvals_before_merge, Some(2));
        assert_eq!(overrides.trunk, None);
    }

    #[test]
    fn apply_requires_group_and_projects() {
        assert!(Cli::try_parse_from(["baseliner", "apply", "-p", "api"]).is_err());
        assert!(Cli::try_parse_from(["baseliner", "apply", "-g", "Team"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["baseliner", "config", "--debug", "--config", "x.toml"]).unwrap();
        assert!(cli.debug);
        assert_eq!(cli.config_file, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn bare_switches_mean_true() {
        let args = apply(&[
            "-g",
            "Team",
            "--initialize-with-readme",
            "--deny-delete-tag",
            "--only-allow-merge-if-all-discussions-are-resolved",
            "-p",
            "api",
            "--only-allow-merge-if-pipeline-succeeds",
        ]);
        let overrides = args.baseline.overrides();
        assert_eq!(overrides.initialize_with_readme, Some(true));
        assert_eq!(overrides.deny_delete_tag, Some(true));
        assert_eq!(overrides.discussions_must_be_resolved, Some(true));
        assert_eq!(overrides.pipeline_must_succeed, Some(true));
        assert_eq!(args.projects, vec!["api"]);
    }

    #[test]
    fn invalid_bool_rejected() {
        assert!(Cli::try_parse_from(["baseliner", "config", "--deny-delete-tag", "maybe"]).is_err());
    }
}
