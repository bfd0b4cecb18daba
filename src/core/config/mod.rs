//! core::config
//!
//! Baseline definition and configuration loading.
//!
//! # Overview
//!
//! A run is described by a [`RunConfig`]: where to connect, which group and
//! projects to manage, and the [`Baseline`] every managed project must match.
//! The run config is assembled once at startup and passed down; nothing below
//! the CLI layer reads the process environment.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values (see [`Baseline::default`])
//! 2. Config file
//! 3. Environment variables
//! 4. CLI flags
//!
//! Environment and flags are merged by the CLI layer into a single
//! [`BaselineOverrides`] before being applied here.
//!
//! # Example
//!
//! ```
//! use baseliner::core::config::{Baseline, BaselineOverrides};
//!
//! let mut baseline = Baseline::default();
//! baseline
//!     .apply(&BaselineOverrides {
//!         approvals_before_merge: Some(2),
//!         ..Default::default()
//!     })
//!     .unwrap();
//! assert_eq!(baseline.merge_policy.approvals_before_merge, 2);
//! ```

pub mod schema;

pub use schema::{BaselineOverrides, FileConfig, GroupMatch, OnExisting};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{AccessLevel, BranchName, MergePolicy, ProtectedBranchRule, PushRule};

/// Default platform URL when none is configured.
pub const DEFAULT_URL: &str = "https://gitlab.com";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "BASELINER_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Desired configuration applied to every managed project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    /// Branches that must exist (created from the trunk if missing)
    pub branches: Vec<BranchName>,
    /// Branch to set as the project's default
    pub default_branch: BranchName,
    /// The platform's initial branch
    pub trunk: BranchName,
    /// Create new projects with an initial README commit
    pub initialize_with_readme: bool,
    /// Merge-request acceptance policy
    pub merge_policy: MergePolicy,
    /// Push rule fields
    pub push_rule: PushRule,
}

impl Default for Baseline {
    fn default() -> Self {
        let branch = BranchName::new_unchecked;
        Self {
            branches: vec![branch("develop"), branch("support"), branch("release")],
            default_branch: branch("develop"),
            trunk: branch("master"),
            initialize_with_readme: true,
            merge_policy: MergePolicy {
                pipeline_must_succeed: false,
                discussions_must_be_resolved: true,
                approvals_before_merge: 1,
            },
            push_rule: PushRule {
                author_email_regex: String::new(),
                branch_name_regex: String::new(),
                deny_delete_tag: true,
            },
        }
    }
}

impl Baseline {
    /// Apply overrides on top of the current values.
    ///
    /// Branch names are trimmed and validated; empty entries in a branch
    /// list (e.g. from a trailing comma) are dropped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a branch name is invalid.
    pub fn apply(&mut self, overrides: &BaselineOverrides) -> Result<(), ConfigError> {
        if let Some(branches) = &overrides.branches {
            self.branches = branches
                .iter()
                .map(|b| b.trim())
                .filter(|b| !b.is_empty())
                .map(parse_branch)
                .collect::<Result<_, _>>()?;
        }
        if let Some(name) = &overrides.default_branch {
            self.default_branch = parse_branch(name.trim())?;
        }
        if let Some(name) = &overrides.trunk {
            self.trunk = parse_branch(name.trim())?;
        }
        if let Some(v) = overrides.initialize_with_readme {
            self.initialize_with_readme = v;
        }
        if let Some(v) = overrides.pipeline_must_succeed {
            self.merge_policy.pipeline_must_succeed = v;
        }
        if let Some(v) = overrides.discussions_must_be_resolved {
            self.merge_policy.discussions_must_be_resolved = v;
        }
        if let Some(v) = overrides.approvals_before_merge {
            self.merge_policy.approvals_before_merge = v;
        }
        if let Some(v) = &overrides.author_email_regex {
            self.push_rule.author_email_regex = v.clone();
        }
        if let Some(v) = &overrides.branch_name_regex {
            self.push_rule.branch_name_regex = v.clone();
        }
        if let Some(v) = overrides.deny_delete_tag {
            self.push_rule.deny_delete_tag = v;
        }
        Ok(())
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the default branch is neither
    /// the trunk nor one of the managed branches.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_branch != self.trunk && !self.branches.contains(&self.default_branch) {
            return Err(ConfigError::InvalidValue(format!(
                "default branch '{}' is neither the trunk '{}' nor one of the managed branches ({})",
                self.default_branch,
                self.trunk,
                self.branch_list()
            )));
        }
        Ok(())
    }

    /// Managed branches other than the trunk, without duplicates, in order.
    pub fn managed_branches(&self) -> Vec<&BranchName> {
        let mut seen: Vec<&BranchName> = Vec::new();
        for branch in &self.branches {
            if *branch != self.trunk && !seen.contains(&branch) {
                seen.push(branch);
            }
        }
        seen
    }

    /// The full protected-branch rule set for a project.
    ///
    /// Managed branches allow developers to merge and maintainers to push;
    /// the trunk is restricted to maintainers for both.
    pub fn protected_branch_rules(&self) -> Vec<ProtectedBranchRule> {
        let mut rules: Vec<ProtectedBranchRule> = self
            .managed_branches()
            .into_iter()
            .map(|branch| ProtectedBranchRule {
                name: branch.to_string(),
                merge_access_level: AccessLevel::Developer,
                push_access_level: AccessLevel::Maintainer,
            })
            .collect();

        rules.push(ProtectedBranchRule {
            name: self.trunk.to_string(),
            merge_access_level: AccessLevel::Maintainer,
            push_access_level: AccessLevel::Maintainer,
        });
        rules
    }

    fn branch_list(&self) -> String {
        self.branches
            .iter()
            .map(BranchName::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<&Baseline> for BaselineOverrides {
    /// Every field set, in the shape of a config file's `[baseline]` table.
    fn from(baseline: &Baseline) -> Self {
        BaselineOverrides {
            branches: Some(baseline.branches.iter().map(BranchName::to_string).collect()),
            default_branch: Some(baseline.default_branch.to_string()),
            trunk: Some(baseline.trunk.to_string()),
            initialize_with_readme: Some(baseline.initialize_with_readme),
            pipeline_must_succeed: Some(baseline.merge_policy.pipeline_must_succeed),
            discussions_must_be_resolved: Some(baseline.merge_policy.discussions_must_be_resolved),
            approvals_before_merge: Some(baseline.merge_policy.approvals_before_merge),
            author_email_regex: Some(baseline.push_rule.author_email_regex.clone()),
            branch_name_regex: Some(baseline.push_rule.branch_name_regex.clone()),
            deny_delete_tag: Some(baseline.push_rule.deny_delete_tag),
        }
    }
}

fn parse_branch(name: &str) -> Result<BranchName, ConfigError> {
    BranchName::new(name).map_err(|e| ConfigError::InvalidValue(e.to_string()))
}

/// Everything a reconciliation run needs, assembled once at startup.
#[derive(Clone)]
pub struct RunConfig {
    /// Platform URL (host or API base)
    pub url: String,
    /// Access token
    pub token: String,
    /// Target group name
    pub group: String,
    /// Create the group if it does not exist
    pub create_group: bool,
    /// Project names to manage
    pub projects: Vec<String>,
    /// Desired state
    pub baseline: Baseline,
    /// Handling of existing projects
    pub on_existing: OnExisting,
    /// Group selection strategy
    pub group_match: GroupMatch,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("url", &self.url)
            .field("has_token", &!self.token.is_empty())
            .field("group", &self.group)
            .field("create_group", &self.create_group)
            .field("projects", &self.projects)
            .field("baseline", &self.baseline)
            .field("on_existing", &self.on_existing)
            .field("group_match", &self.group_match)
            .finish()
    }
}

impl FileConfig {
    /// Load the config file from the standard locations.
    ///
    /// A file named by `--config` or `$BASELINER_CONFIG` must exist. Files
    /// found by searching are optional; if none exists the defaults are
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error if a requested file is missing, or if a config file
    /// exists but cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
        let from_env = std::env::var_os(CONFIG_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::load_from(explicit, from_env.as_deref())
    }

    fn load_from(
        explicit: Option<&Path>,
        from_env: Option<&Path>,
    ) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit.or(from_env) {
            return Ok((Self::read(path)?, Some(path.to_path_buf())));
        }

        match Self::search_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Ok((Self::read(&path)?, Some(path))),
            None => Ok((FileConfig::default(), None)),
        }
    }

    /// Candidate config file locations, in search order.
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("baseliner/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".baseliner/config.toml"));
        }
        paths
    }

    /// Read and parse a config file.
    pub fn read(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    mod baseline {
        use super::*;

        #[test]
        fn defaults_match_documented_values() {
            let baseline = Baseline::default();
            let names: Vec<&str> = baseline.branches.iter().map(|b| b.as_str()).collect();
            assert_eq!(names, vec!["develop", "support", "release"]);
            assert_eq!(baseline.default_branch.as_str(), "develop");
            assert_eq!(baseline.trunk.as_str(), "master");
            assert!(baseline.initialize_with_readme);
            assert!(!baseline.merge_policy.pipeline_must_succeed);
            assert!(baseline.merge_policy.discussions_must_be_resolved);
            assert_eq!(baseline.merge_policy.approvals_before_merge, 1);
            assert!(baseline.push_rule.deny_delete_tag);
            assert!(baseline.validate().is_ok());
        }

        #[test]
        fn apply_overrides_only_set_fields() {
            let mut baseline = Baseline::default();
            baseline
                .apply(&BaselineOverrides {
                    branches: Some(vec![" develop ".into(), "".into(), "qa".into()]),
                    pipeline_must_succeed: Some(true),
                    author_email_regex: Some("@example\\.com$".into()),
                    ..Default::default()
                })
                .unwrap();

            let names: Vec<&str> = baseline.branches.iter().map(|b| b.as_str()).collect();
            assert_eq!(names, vec!["develop", "qa"]);
            assert!(baseline.merge_policy.pipeline_must_succeed);
            assert!(baseline.merge_policy.discussions_must_be_resolved);
            assert_eq!(baseline.push_rule.author_email_regex, "@example\\.com$");
            assert_eq!(baseline.default_branch.as_str(), "develop");
        }

        #[test]
        fn later_overrides_win() {
            let mut baseline = Baseline::default();
            let file = BaselineOverrides {
                approvals_before_merge: Some(3),
                trunk: Some("main".into()),
                ..Default::default()
            };
            let flags = BaselineOverrides {
                approvals_before_merge: Some(0),
                ..Default::default()
            };
            baseline.apply(&file).unwrap();
            baseline.apply(&flags).unwrap();

            assert_eq!(baseline.merge_policy.approvals_before_merge, 0);
            assert_eq!(baseline.trunk.as_str(), "main");
        }

        #[test]
        fn invalid_branch_rejected() {
            let mut baseline = Baseline::default();
            let result = baseline.apply(&BaselineOverrides {
                branches: Some(vec!["bad..name".into()]),
                ..Default::default()
            });
            assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
        }

        #[test]
        fn default_branch_must_be_managed() {
            let mut baseline = Baseline::default();
            baseline
                .apply(&BaselineOverrides {
                    default_branch: Some("hotfix".into()),
                    ..Default::default()
                })
                .unwrap();
            let err = baseline.validate().unwrap_err();
            assert!(err.to_string().contains("hotfix"));

            baseline
                .apply(&BaselineOverrides {
                    default_branch: Some("master".into()),
                    ..Default::default()
                })
                .unwrap();
            assert!(baseline.validate().is_ok());
        }

        #[test]
        fn managed_branches_skip_trunk_and_duplicates() {
            let mut baseline = Baseline::default();
            baseline
                .apply(&BaselineOverrides {
                    branches: Some(vec![
                        "develop".into(),
                        "master".into(),
                        "develop".into(),
                        "release".into(),
                    ]),
                    ..Default::default()
                })
                .unwrap();

            let names: Vec<&str> = baseline
                .managed_branches()
                .into_iter()
                .map(|b| b.as_str())
                .collect();
            assert_eq!(names, vec!["develop", "release"]);
        }

        #[test]
        fn protected_rules_guard_trunk_strictly() {
            let rules = Baseline::default().protected_branch_rules();
            assert_eq!(rules.len(), 4);

            let trunk = rules.iter().find(|r| r.name == "master").unwrap();
            assert_eq!(trunk.merge_access_level, AccessLevel::Maintainer);
            assert_eq!(trunk.push_access_level, AccessLevel::Maintainer);

            for rule in rules.iter().filter(|r| r.name != "master") {
                assert_eq!(rule.merge_access_level, AccessLevel::Developer);
                assert_eq!(rule.push_access_level, AccessLevel::Maintainer);
            }
        }

        #[test]
        fn renders_as_file_overrides() {
            let mut custom = Baseline::default();
            custom
                .apply(&BaselineOverrides {
                    branches: Some(vec!["develop".into(), "qa".into()]),
                    approvals_before_merge: Some(2),
                    branch_name_regex: Some("^(feature|fix)/".into()),
                    ..Default::default()
                })
                .unwrap();

            let file = FileConfig {
                baseline: BaselineOverrides::from(&custom),
                ..Default::default()
            };
            let text = toml::to_string_pretty(&file).unwrap();
            assert!(text.contains("[baseline]"));
            assert!(!text.contains("merge_policy"));

            let parsed: FileConfig = toml::from_str(&text).unwrap();
            let mut reloaded = Baseline::default();
            reloaded.apply(&parsed.baseline).unwrap();
            assert_eq!(reloaded, custom);
        }
    }

    mod file_config {
        use super::*;

        #[test]
        fn load_explicit_path() {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join("config.toml");
            fs::write(
                &path,
                r#"
                url = "https://gitlab.example.com"

                [baseline]
                approvals_before_merge = 2
                "#,
            )
            .unwrap();

            let (config, found) = FileConfig::load(Some(&path)).unwrap();
            assert_eq!(found.as_deref(), Some(path.as_path()));
            assert_eq!(config.url.as_deref(), Some("https://gitlab.example.com"));
            assert_eq!(config.baseline.approvals_before_merge, Some(2));
        }

        #[test]
        fn explicit_missing_file_is_error() {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join("absent.toml");
            let result = FileConfig::load(Some(&path));
            assert!(matches!(result, Err(ConfigError::ReadError { .. })));
        }

        #[test]
        fn env_named_file_must_exist() {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join("absent.toml");
            let result = FileConfig::load_from(None, Some(&path));
            assert!(matches!(result, Err(ConfigError::ReadError { .. })));
        }

        #[test]
        fn flag_wins_over_env() {
            let temp = TempDir::new().unwrap();
            let flag = temp.path().join("flag.toml");
            fs::write(&flag, "url = \"https://flag.example.com\"\n").unwrap();
            let env = temp.path().join("absent.toml");

            let (config, found) = FileConfig::load_from(Some(&flag), Some(&env)).unwrap();
            assert_eq!(found.as_deref(), Some(flag.as_path()));
            assert_eq!(config.url.as_deref(), Some("https://flag.example.com"));
        }

        #[test]
        fn parse_error_names_the_file() {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join("config.toml");
            fs::write(&path, "url = [").unwrap();

            let err = FileConfig::read(&path).unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { .. }));
            assert!(err.to_string().contains("config.toml"));
        }
    }

    #[test]
    fn run_config_debug_hides_token() {
        let config = RunConfig {
            url: DEFAULT_URL.into(),
            token: "glpat-secret".into(),
            group: "team".into(),
            create_group: false,
            projects: vec!["api".into()],
            baseline: Baseline::default(),
            on_existing: OnExisting::Skip,
            group_match: GroupMatch::Exact,
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("glpat-secret"));
        assert!(debug.contains("has_token: true"));
    }
}
