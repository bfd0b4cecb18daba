//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Config File
//!
//! Located at (in order of precedence):
//! 1. `--config <path>` if given
//! 2. `$BASELINER_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/baseliner/config.toml`
//! 4. `~/.baseliner/config.toml`
//!
//! # Validation
//!
//! Unknown keys are rejected at parse time. Branch names are validated when
//! the overrides are applied to a [`Baseline`](super::Baseline).

use serde::{Deserialize, Serialize};

/// Contents of a config file.
///
/// # Example
///
/// ```toml
/// url = "https://gitlab.example.com"
/// on_existing = "skip"
/// group_match = "exact"
///
/// [baseline]
/// branches = ["develop", "support", "release"]
/// default_branch = "develop"
/// approvals_before_merge = 2
/// author_email_regex = "@example\\.com$"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Platform URL
    pub url: Option<String>,

    /// What to do with projects that already exist
    pub on_existing: Option<OnExisting>,

    /// How to pick the target group among search results
    pub group_match: Option<GroupMatch>,

    /// Baseline overrides
    pub baseline: BaselineOverrides,
}

/// Partial baseline, as read from a config file or from flags/environment.
///
/// Every field is optional; `None` leaves the lower-precedence value in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BaselineOverrides {
    pub branches: Option<Vec<String>>,
    pub default_branch: Option<String>,
    pub trunk: Option<String>,
    pub initialize_with_readme: Option<bool>,
    pub pipeline_must_succeed: Option<bool>,
    pub discussions_must_be_resolved: Option<bool>,
    pub approvals_before_merge: Option<u32>,
    pub author_email_regex: Option<String>,
    pub branch_name_regex: Option<String>,
    pub deny_delete_tag: Option<bool>,
}

/// Handling of projects that already exist under the target group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OnExisting {
    /// Ask the operator for each existing project
    #[default]
    Prompt,
    /// Overwrite every existing project without asking
    Overwrite,
    /// Leave every existing project untouched
    Skip,
}

/// Strategy for picking the target group from search results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum GroupMatch {
    /// Require exactly one group whose name or path equals the search term
    #[default]
    Exact,
    /// Take the first search result
    First,
}
