//! platform::traits
//!
//! Platform trait definition for the hosting service's resource API.
//!
//! # Design
//!
//! The `Platform` trait is async because every operation is a network
//! request against shared remote state. All methods return `Result` so the
//! engine can tell "not found" (drives create-vs-update) apart from real
//! failures (reported per resource).
//!
//! Transport concerns (authentication headers, HTTP-level retries,
//! pagination) belong to the implementation, never to the engine.
//!
//! # Example
//!
//! ```ignore
//! use baseliner::platform::{Platform, PlatformError};
//!
//! async fn ensure_branch(platform: &dyn Platform, project_id: u64) -> Result<(), PlatformError> {
//!     match platform.get_branch(project_id, "develop").await {
//!         Ok(_) => Ok(()),
//!         Err(e) if e.is_not_found() => {
//!             platform.create_branch(project_id, "develop", "master").await?;
//!             Ok(())
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{Branch, Group, MergePolicy, Project, ProtectedBranchRule, PushRule};

/// Errors from platform operations.
///
/// These error types map to common failure modes when talking to a
/// hosting service's REST API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// Authentication is required but no token is available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The platform rejected a mutation (validation, permission, conflict).
    #[error("rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// The response could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    /// Whether this error only signals that a resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound(_))
    }

    /// Whether this error is an authentication failure.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            PlatformError::AuthRequired | PlatformError::AuthFailed(_)
        )
    }
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Username the token belongs to
    pub username: String,
}

/// Request to create a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    /// Project name (also used as the path)
    pub name: String,
    /// Owning group identifier
    pub namespace_id: u64,
    /// Merge policy to create the project with
    pub merge_policy: MergePolicy,
    /// Create the repository with an initial README commit
    pub initialize_with_readme: bool,
}

/// Request to update a project in place.
///
/// Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectUpdate {
    pub default_branch: Option<String>,
    pub pipeline_must_succeed: Option<bool>,
    pub discussions_must_be_resolved: Option<bool>,
    pub approvals_before_merge: Option<u32>,
}

impl ProjectUpdate {
    /// Check if there is anything to update.
    pub fn is_empty(&self) -> bool {
        self.default_branch.is_none()
            && self.pipeline_must_succeed.is_none()
            && self.discussions_must_be_resolved.is_none()
            && self.approvals_before_merge.is_none()
    }
}

/// The Platform trait for the hosting service's resource API.
///
/// One method per resource operation. Implementations exist for GitLab
/// ([`GitLabPlatform`](super::gitlab::GitLabPlatform)) and for tests
/// ([`MockPlatform`](super::mock::MockPlatform)).
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, PlatformError>`. Callers should handle:
/// - `AuthRequired` / `AuthFailed`: fatal before reconciliation starts
/// - `NotFound`: resource doesn't exist, take the create path
/// - `Rejected`: report against the single resource and move on
/// - `RateLimited` / `Network` / `InvalidResponse`: the step did not happen
#[async_trait]
pub trait Platform: Send + Sync {
    /// Get the platform name (e.g., "gitlab").
    fn name(&self) -> &'static str;

    /// Verify the credentials and return the session they belong to.
    ///
    /// # Errors
    ///
    /// - `AuthFailed` if the token is invalid
    async fn authenticate(&self) -> Result<Session, PlatformError>;

    /// Search groups by name. The search is substring-based.
    async fn find_groups(&self, search: &str) -> Result<Vec<Group>, PlatformError>;

    /// Create a top-level group.
    ///
    /// # Errors
    ///
    /// - `Rejected` if the path is taken or invalid
    async fn create_group(&self, name: &str, path: &str) -> Result<Group, PlatformError>;

    /// Get a project by `group_path/project_name`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no such project exists
    async fn get_project(&self, group_path: &str, name: &str) -> Result<Project, PlatformError>;

    /// Create a project.
    async fn create_project(&self, request: &NewProject) -> Result<Project, PlatformError>;

    /// Update a project in place and return its new state.
    async fn update_project(
        &self,
        project_id: u64,
        update: &ProjectUpdate,
    ) -> Result<Project, PlatformError>;

    /// List all branches of a project.
    async fn list_branches(&self, project_id: u64) -> Result<Vec<Branch>, PlatformError>;

    /// Get a single branch.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the branch doesn't exist
    async fn get_branch(&self, project_id: u64, name: &str) -> Result<Branch, PlatformError>;

    /// Create a branch from `from_ref`.
    async fn create_branch(
        &self,
        project_id: u64,
        name: &str,
        from_ref: &str,
    ) -> Result<Branch, PlatformError>;

    /// Get the project's push rule.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the project has no push rule
    async fn get_push_rule(&self, project_id: u64) -> Result<PushRule, PlatformError>;

    /// Create the project's push rule.
    async fn create_push_rule(
        &self,
        project_id: u64,
        rule: &PushRule,
    ) -> Result<PushRule, PlatformError>;

    /// Overwrite the project's push rule.
    async fn update_push_rule(
        &self,
        project_id: u64,
        rule: &PushRule,
    ) -> Result<PushRule, PlatformError>;

    /// List the project's protected-branch rules.
    async fn list_protected_branches(
        &self,
        project_id: u64,
    ) -> Result<Vec<ProtectedBranchRule>, PlatformError>;

    /// Protect a branch.
    async fn create_protected_branch(
        &self,
        project_id: u64,
        rule: &ProtectedBranchRule,
    ) -> Result<ProtectedBranchRule, PlatformError>;
}
