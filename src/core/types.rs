//! core::types
//!
//! Strong types for the managed resources.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name used in the baseline
//! - [`Group`] - A namespace on the hosting platform
//! - [`Project`] - A repository under a group, with its merge policy
//! - [`Branch`] - A branch of a project
//! - [`ProtectedBranchRule`] - Merge/push access policy for one branch
//! - [`PushRule`] - The per-project push rule singleton
//! - [`AccessLevel`] - Role thresholds used by protected-branch rules
//!
//! # Validation
//!
//! Baseline branch names are validated at construction time, so a
//! misconfigured branch list is rejected before any remote call is made.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("unknown access level: {0}")]
    UnknownAccessLevel(u32),
}

/// A branch name from the baseline, checked against git's ref format.
///
/// Rejected names: empty or `@`, a leading `.`/`-`, a trailing `/` or
/// `.lock`, the sequences `..`, `@{` and `//`, whitespace and control
/// characters, and any of `~ ^ : \ ? * [`. Each `/`-separated component
/// follows the same leading-dot and `.lock` rules.
///
/// # Example
///
/// ```
/// use baseliner::core::types::BranchName;
///
/// let name = BranchName::new("release/1.x").unwrap();
/// assert_eq!(name.as_str(), "release/1.x");
///
/// assert!(BranchName::new("release..1").is_err());
/// assert!(BranchName::new("hot fix").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

/// Characters git refuses anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &['~', '^', ':', '\\', '?', '*', '['];

/// Sequences git refuses anywhere in a ref name.
const FORBIDDEN_SEQUENCES: &[&str] = &["..", "@{", "//"];

impl BranchName {
    /// Validate and wrap a branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` naming the offending rule.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        match Self::problem(&name) {
            Some(problem) => Err(TypeError::InvalidBranchName(format!("'{}': {}", name, problem))),
            None => Ok(Self(name)),
        }
    }

    /// First rule the name breaks, if any.
    fn problem(name: &str) -> Option<String> {
        if name.is_empty() || name == "@" {
            return Some("not a usable branch name".into());
        }
        if name.ends_with('/') {
            return Some("ends with '/'".into());
        }
        if let Some(seq) = FORBIDDEN_SEQUENCES.iter().find(|seq| name.contains(*seq)) {
            return Some(format!("contains '{}'", seq));
        }
        if let Some(c) = name
            .chars()
            .find(|c| c.is_whitespace() || c.is_ascii_control() || FORBIDDEN_CHARS.contains(c))
        {
            return Some(format!("contains {:?}", c));
        }
        if name.starts_with('-') {
            return Some("starts with '-'".into());
        }
        name.split('/').find_map(|component| {
            if component.starts_with('.') {
                Some(format!("component '{}' starts with '.'", component))
            } else if component.ends_with(".lock") {
                Some(format!("component '{}' ends with '.lock'", component))
            } else {
                None
            }
        })
    }

    /// Wrap a name known to be valid (built-in defaults only).
    pub(crate) fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchName> for String {
    fn from(branch: BranchName) -> Self {
        branch.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role threshold for protected-branch access.
///
/// Values match the platform's numeric access levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Nobody may perform the action
    NoAccess,
    /// Developers and above
    Developer,
    /// Maintainers and above
    Maintainer,
    /// Instance administrators only
    Admin,
}

impl AccessLevel {
    /// Numeric level as used by the platform API.
    pub fn as_u32(self) -> u32 {
        match self {
            AccessLevel::NoAccess => 0,
            AccessLevel::Developer => 30,
            AccessLevel::Maintainer => 40,
            AccessLevel::Admin => 60,
        }
    }

    /// Parse a numeric platform access level.
    pub fn from_u32(level: u32) -> Result<Self, TypeError> {
        match level {
            0 => Ok(AccessLevel::NoAccess),
            30 => Ok(AccessLevel::Developer),
            40 => Ok(AccessLevel::Maintainer),
            60 => Ok(AccessLevel::Admin),
            other => Err(TypeError::UnknownAccessLevel(other)),
        }
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessLevel::NoAccess => write!(f, "no access"),
            AccessLevel::Developer => write!(f, "developer"),
            AccessLevel::Maintainer => write!(f, "maintainer"),
            AccessLevel::Admin => write!(f, "admin"),
        }
    }
}

/// A group (namespace) on the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// Platform identifier
    pub id: u64,
    /// Display name
    pub name: String,
    /// URL-safe path segment
    pub path: String,
    /// Full path including parent groups
    pub full_path: String,
}

/// Merge-request acceptance policy of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergePolicy {
    /// Only allow merge if the pipeline succeeds
    pub pipeline_must_succeed: bool,
    /// Only allow merge if all discussions are resolved
    pub discussions_must_be_resolved: bool,
    /// Number of approvals required before merge
    pub approvals_before_merge: u32,
}

/// Merge policy as read back from the platform.
///
/// A field is `None` when the platform did not report it; GitLab Free omits
/// `approvals_before_merge`, for instance. Unknown fields are never diffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ObservedMergePolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_must_succeed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussions_must_be_resolved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approvals_before_merge: Option<u32>,
}

impl From<MergePolicy> for ObservedMergePolicy {
    fn from(policy: MergePolicy) -> Self {
        Self {
            pipeline_must_succeed: Some(policy.pipeline_must_succeed),
            discussions_must_be_resolved: Some(policy.discussions_must_be_resolved),
            approvals_before_merge: Some(policy.approvals_before_merge),
        }
    }
}

/// A project (repository) on the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Platform identifier
    pub id: u64,
    /// Display name
    pub name: String,
    /// URL-safe path segment
    pub path: String,
    /// Full path including the owning group
    pub path_with_namespace: String,
    /// Identifier of the owning group (not owned by the project)
    pub namespace_id: u64,
    /// Current default branch, if the repository has one
    pub default_branch: Option<String>,
    /// Current merge policy, as far as the platform reports it
    pub merge_policy: ObservedMergePolicy,
}

/// A branch of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub name: String,
}

/// Protected-branch access rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectedBranchRule {
    /// Branch name (or wildcard) the rule applies to
    pub name: String,
    /// Minimum role allowed to merge
    pub merge_access_level: AccessLevel,
    /// Minimum role allowed to push
    pub push_access_level: AccessLevel,
}

/// Per-project push rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PushRule {
    /// Regex every commit author email must match (empty = unrestricted)
    pub author_email_regex: String,
    /// Regex every new branch name must match (empty = unrestricted)
    pub branch_name_regex: String,
    /// Forbid tag deletion
    pub deny_delete_tag: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod branch_name {
        use super::*;

        #[test]
        fn baseline_names_accepted() {
            for name in ["master", "main", "develop", "release/1.x", "support-2024", "qa_env"] {
                assert!(BranchName::new(name).is_ok(), "{} should be valid", name);
            }
        }

        #[test]
        fn reserved_and_empty_rejected() {
            assert!(BranchName::new("").is_err());
            assert!(BranchName::new("@").is_err());
        }

        #[test]
        fn git_sequences_rejected() {
            assert!(BranchName::new("release..1").is_err());
            assert!(BranchName::new("develop@{1}").is_err());
            assert!(BranchName::new("release//1.x").is_err());
            assert!(BranchName::new("release/").is_err());
        }

        #[test]
        fn components_checked() {
            assert!(BranchName::new(".develop").is_err());
            assert!(BranchName::new("release/.next").is_err());
            assert!(BranchName::new("develop.lock").is_err());
            assert!(BranchName::new("release/1.lock/x").is_err());
            assert!(BranchName::new("-develop").is_err());
        }

        #[test]
        fn forbidden_characters_rejected() {
            for name in ["hot fix", "feature:x", "rel*", "qa?", "dev\\x", "dev\tx", "v1^"] {
                assert!(BranchName::new(name).is_err(), "{:?} should be invalid", name);
            }
        }

        #[test]
        fn error_names_the_branch_and_rule() {
            let err = BranchName::new("release..1").unwrap_err().to_string();
            assert!(err.contains("'release..1'"));
            assert!(err.contains("'..'"));
        }

        #[test]
        fn config_values_are_validated() {
            let ok: Result<BranchName, _> = serde_json::from_str("\"develop\"");
            assert!(ok.is_ok());
            let bad: Result<BranchName, _> = serde_json::from_str("\"release..1\"");
            assert!(bad.is_err());
        }
    }

    mod access_level {
        use super::*;

        #[test]
        fn numeric_levels() {
            assert_eq!(AccessLevel::Developer.as_u32(), 30);
            assert_eq!(AccessLevel::Maintainer.as_u32(), 40);
            assert_eq!(AccessLevel::from_u32(40), Ok(AccessLevel::Maintainer));
            assert_eq!(AccessLevel::from_u32(0), Ok(AccessLevel::NoAccess));
        }

        #[test]
        fn unknown_level_rejected() {
            assert_eq!(
                AccessLevel::from_u32(35),
                Err(TypeError::UnknownAccessLevel(35))
            );
        }

        #[test]
        fn maintainer_is_stricter_than_developer() {
            assert!(AccessLevel::Maintainer > AccessLevel::Developer);
        }

        #[test]
        fn display() {
            assert_eq!(AccessLevel::Developer.to_string(), "developer");
            assert_eq!(AccessLevel::Maintainer.to_string(), "maintainer");
        }
    }
}
