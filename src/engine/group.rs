//! engine::group
//!
//! Group resolution: find the target group, or create it on request.
//!
//! # Matching
//!
//! The platform's group search is substring-based, so a search for `team`
//! also returns `team-two`. With [`GroupMatch::Exact`] only groups whose
//! name, path or full path equals the requested name (or its normalized
//! form) count, and more than one such group is an error. With
//! [`GroupMatch::First`] the first search result wins.

use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::GroupMatch;
use crate::core::naming::normalize;
use crate::core::types::Group;
use crate::platform::{Platform, PlatformError};

/// Errors from group resolution. All of them abort the run.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("group name '{0}' has no characters usable in a path")]
    InvalidName(String),

    #[error("group '{name}' is ambiguous: {}", .candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },

    #[error("failed to search for group '{name}': {source}")]
    Search {
        name: String,
        #[source]
        source: PlatformError,
    },

    #[error("failed to create group '{name}': {source}")]
    Create {
        name: String,
        #[source]
        source: PlatformError,
    },
}

/// Find the group called `name`, creating it if allowed.
///
/// Returns `Ok(None)` when the group does not exist and `create_if_missing`
/// is false; nothing is created in that case.
pub async fn resolve(
    platform: &dyn Platform,
    name: &str,
    create_if_missing: bool,
    matching: GroupMatch,
) -> Result<Option<Group>, ResolveError> {
    let path = normalize(name);
    if path.is_empty() {
        return Err(ResolveError::InvalidName(name.to_string()));
    }

    info!(group = name, "Searching for group");
    let results = platform
        .find_groups(name)
        .await
        .map_err(|source| ResolveError::Search {
            name: name.to_string(),
            source,
        })?;
    debug!(count = results.len(), "group search results");

    if let Some(group) = select(name, &path, results, matching)? {
        info!(group = %group.full_path, id = group.id, "Found group");
        return Ok(Some(group));
    }

    if !create_if_missing {
        return Ok(None);
    }

    info!(group = name, path = %path, "Creating group");
    platform
        .create_group(name, &path)
        .await
        .map(Some)
        .map_err(|source| ResolveError::Create {
            name: name.to_string(),
            source,
        })
}

/// Pick the target group among search results.
fn select(
    name: &str,
    path: &str,
    results: Vec<Group>,
    matching: GroupMatch,
) -> Result<Option<Group>, ResolveError> {
    match matching {
        GroupMatch::First => Ok(results.into_iter().next()),
        GroupMatch::Exact => {
            let is_match = |candidate: &str| {
                candidate.eq_ignore_ascii_case(name) || candidate.eq_ignore_ascii_case(path)
            };
            let mut exact: Vec<Group> = results
                .into_iter()
                .filter(|g| is_match(&g.name) || is_match(&g.path) || is_match(&g.full_path))
                .collect();
            exact.dedup_by_key(|g| g.id);

            match exact.len() {
                0 => Ok(None),
                1 => Ok(exact.pop()),
                _ => Err(ResolveError::Ambiguous {
                    name: name.to_string(),
                    candidates: exact.into_iter().map(|g| g.full_path).collect(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::{FailOn, MockMethod, MockOperation, MockPlatform};

    #[tokio::test]
    async fn finds_exact_group_among_substring_matches() {
        let platform = MockPlatform::new();
        platform.add_group("Team Two", "team-two");
        let team = platform.add_group("Team", "team");

        let group = resolve(&platform, "team", false, GroupMatch::Exact)
            .await
            .unwrap();
        assert_eq!(group, Some(team));
    }

    #[tokio::test]
    async fn matches_normalized_name() {
        let platform = MockPlatform::new();
        let group = platform.add_group("My Group", "My_Group");

        let found = resolve(&platform, "My Group", false, GroupMatch::Exact)
            .await
            .unwrap();
        assert_eq!(found, Some(group));
    }

    #[tokio::test]
    async fn missing_group_without_create_returns_none() {
        let platform = MockPlatform::new();
        platform.add_group("Other", "other");

        let group = resolve(&platform, "team", false, GroupMatch::Exact)
            .await
            .unwrap();
        assert_eq!(group, None);
        assert_eq!(platform.mutation_count(), 0);
        assert_eq!(platform.groups().len(), 1);
    }

    #[tokio::test]
    async fn substring_only_match_is_not_exact() {
        let platform = MockPlatform::new();
        platform.add_group("Team Two", "team-two");

        let group = resolve(&platform, "team", false, GroupMatch::Exact)
            .await
            .unwrap();
        assert_eq!(group, None);
    }

    #[tokio::test]
    async fn first_match_takes_first_result() {
        let platform = MockPlatform::new();
        let first = platform.add_group("Team Two", "team-two");
        platform.add_group("Team", "team");

        let group = resolve(&platform, "team", false, GroupMatch::First)
            .await
            .unwrap();
        assert_eq!(group, Some(first));
    }

    #[tokio::test]
    async fn ambiguous_exact_match_is_an_error() {
        let platform = MockPlatform::new();
        platform.add_group("team", "team-a");
        platform.add_group("team", "team-b");

        let err = resolve(&platform, "team", false, GroupMatch::Exact)
            .await
            .unwrap_err();
        match err {
            ResolveError::Ambiguous { candidates, .. } => {
                assert_eq!(candidates, vec!["team-a", "team-b"]);
            }
            other => panic!("expected Ambiguous, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn creates_missing_group_with_normalized_path() {
        let platform = MockPlatform::new();

        let group = resolve(&platform, "Team #1 / QA", true, GroupMatch::Exact)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(group.name, "Team #1 / QA");
        assert_eq!(group.path, "Team_1_QA");
        assert!(platform.operations().contains(&MockOperation::CreateGroup {
            name: "Team #1 / QA".into(),
            path: "Team_1_QA".into(),
        }));
    }

    #[tokio::test]
    async fn existing_group_is_not_recreated() {
        let platform = MockPlatform::new();
        platform.add_group("Team", "team");

        resolve(&platform, "Team", true, GroupMatch::Exact)
            .await
            .unwrap();
        assert_eq!(platform.mutation_count(), 0);
    }

    #[tokio::test]
    async fn create_failure_is_fatal() {
        let platform = MockPlatform::new().fail_on(FailOn::new(
            MockMethod::CreateGroup,
            PlatformError::Rejected {
                status: 403,
                message: "forbidden".into(),
            },
        ));

        let err = resolve(&platform, "team", true, GroupMatch::Exact)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Create { .. }));
    }

    #[tokio::test]
    async fn search_failure_is_fatal() {
        let platform = MockPlatform::new()
            .fail_on(FailOn::new(MockMethod::FindGroups, PlatformError::RateLimited));

        let err = resolve(&platform, "team", true, GroupMatch::Exact)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Search { .. }));
        assert_eq!(platform.mutation_count(), 0);
    }

    #[tokio::test]
    async fn unusable_name_rejected() {
        let platform = MockPlatform::new();
        let err = resolve(&platform, "#?/", true, GroupMatch::Exact)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidName(_)));
        assert!(platform.operations().is_empty());
    }
}
