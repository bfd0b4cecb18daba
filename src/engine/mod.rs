//! engine
//!
//! Reconciliation of a group's projects against the baseline.
//!
//! # Architecture
//!
//! A run follows a fixed sequence:
//!
//! ```text
//! Authenticate -> Resolve group -> For each project: [Confirm] -> Create/Update -> Configure
//! ```
//!
//! - **Authenticate**: verify the token before anything else is requested
//! - **Resolve group**: [`group::resolve`] finds or creates the target group
//! - **Reconcile**: [`project::reconcile`] handles every requested project,
//!   consulting the [`ConfirmationPolicy`] for existing ones
//! - **Configure**: [`configure::configure`] brings branches, default branch,
//!   push rule and protected branches in line
//!
//! # Failure Policy
//!
//! Only three things abort a run: failed authentication, a group that cannot
//! be resolved, and an ambiguous group. Everything else is scoped to the
//! project or step it concerns and shows up in the [`RunReport`].
//!
//! # Example
//!
//! ```ignore
//! use baseliner::engine::{self, ConfirmationPolicy};
//!
//! let mut policy = ConfirmationPolicy::AlwaysOverwrite;
//! let report = engine::run(platform.as_ref(), &config, &mut policy).await?;
//! if report.has_failures() {
//!     std::process::exit(1);
//! }
//! ```

pub mod configure;
pub mod confirm;
pub mod group;
pub mod project;
pub mod report;

pub use confirm::{ConfirmationPolicy, OverwritePrompt};
pub use group::ResolveError;
pub use report::{
    ConfigureReport, Outcome, ProjectAction, ProjectReport, RunReport, Step, Warning,
};

use thiserror::Error;
use tracing::info;

use crate::core::config::RunConfig;
use crate::platform::{Platform, PlatformError};

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("authentication failed: {0}")]
    Auth(#[source] PlatformError),

    #[error("group '{0}' not found (use --create-group to create it)")]
    GroupNotFound(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Run a full reconciliation.
///
/// # Errors
///
/// Returns an error only for the fatal cases listed in the module docs.
/// Per-project failures are reported in the returned [`RunReport`].
pub async fn run(
    platform: &dyn Platform,
    config: &RunConfig,
    policy: &mut ConfirmationPolicy,
) -> Result<RunReport, EngineError> {
    let session = platform.authenticate().await.map_err(EngineError::Auth)?;
    info!(user = %session.username, platform = platform.name(), "Authenticated");

    let group = group::resolve(
        platform,
        &config.group,
        config.create_group,
        config.group_match,
    )
    .await?
    .ok_or_else(|| EngineError::GroupNotFound(config.group.clone()))?;

    let projects =
        project::reconcile(platform, &group, &config.projects, &config.baseline, policy).await;

    info!(
        group = %group.full_path,
        projects = projects.len(),
        "Reconciliation finished"
    );
    Ok(RunReport { group, projects })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Baseline, GroupMatch, OnExisting};
    use crate::platform::mock::{FailOn, MockMethod, MockPlatform};

    fn config(group: &str, create_group: bool, projects: &[&str]) -> RunConfig {
        RunConfig {
            url: "https://gitlab.example.com".into(),
            token: "t".into(),
            group: group.into(),
            create_group,
            projects: projects.iter().map(|p| p.to_string()).collect(),
            baseline: Baseline::default(),
            on_existing: OnExisting::Overwrite,
            group_match: GroupMatch::Exact,
        }
    }

    #[tokio::test]
    async fn auth_failure_aborts_before_group_resolution() {
        let platform = MockPlatform::new().fail_on(FailOn::new(
            MockMethod::Authenticate,
            PlatformError::AuthFailed("401 Unauthorized".into()),
        ));

        let err = run(
            &platform,
            &config("team", true, &["api"]),
            &mut ConfirmationPolicy::AlwaysOverwrite,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::Auth(_)));
        assert_eq!(platform.operations().len(), 1);
    }

    #[tokio::test]
    async fn missing_group_aborts_without_creating_anything() {
        let platform = MockPlatform::new();

        let err = run(
            &platform,
            &config("team", false, &["api"]),
            &mut ConfirmationPolicy::AlwaysOverwrite,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::GroupNotFound(ref g) if g == "team"));
        assert_eq!(platform.mutation_count(), 0);
    }

    #[tokio::test]
    async fn creates_group_and_projects() {
        let platform = MockPlatform::new();

        let report = run(
            &platform,
            &config("New Team", true, &["api", "web"]),
            &mut ConfirmationPolicy::AlwaysOverwrite,
        )
        .await
        .unwrap();

        assert_eq!(report.group.path, "New_Team");
        assert_eq!(report.count(ProjectAction::Created), 2);
        assert!(!report.has_failures());
        assert_eq!(report.processed().len(), 2);
    }

    #[tokio::test]
    async fn ambiguous_group_is_fatal() {
        let platform = MockPlatform::new();
        platform.add_group("team", "team-a");
        platform.add_group("team", "team-b");

        let err = run(
            &platform,
            &config("team", true, &["api"]),
            &mut ConfirmationPolicy::AlwaysOverwrite,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Resolve(ResolveError::Ambiguous { .. })
        ));
        assert_eq!(platform.mutation_count(), 0);
    }
}
