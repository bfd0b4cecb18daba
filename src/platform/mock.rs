//! platform::mock
//!
//! Mock platform implementation for deterministic testing.
//!
//! # Design
//!
//! The mock platform keeps groups, projects, branches, push rules and
//! protected-branch rules in memory and behaves like the real service where
//! the engine depends on it: duplicate creates are rejected, lookups of
//! missing resources return `NotFound`, and a project created without a
//! README has no branches at all.
//!
//! Every call is recorded as a [`MockOperation`], so tests can assert on the
//! exact sequence of requests or count the mutations a run issued. Failures
//! are injected with [`FailOn`], optionally scoped to one project or
//! resource name.
//!
//! # Example
//!
//! ```
//! use baseliner::platform::mock::MockPlatform;
//! use baseliner::platform::Platform;
//!
//! # tokio_test::block_on(async {
//! let platform = MockPlatform::new();
//! let group = platform.add_group("Team", "team");
//! let project = platform.add_project("team", "api");
//!
//! let found = platform.get_project("team", "api").await.unwrap();
//! assert_eq!(found.id, project.id);
//! assert_eq!(found.namespace_id, group.id);
//! assert_eq!(found.default_branch.as_deref(), Some("master"));
//! # });
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::traits::{NewProject, Platform, PlatformError, ProjectUpdate, Session};
use crate::core::types::{
    Branch, Group, MergePolicy, ObservedMergePolicy, Project, ProtectedBranchRule, PushRule,
};

/// Mock platform for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping. Clones share state.
#[derive(Debug, Clone)]
pub struct MockPlatform {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockPlatformInner>>,
}

/// Internal mutable state.
#[derive(Debug)]
struct MockPlatformInner {
    /// Username returned by `authenticate`.
    username: String,
    /// Branch a repository initialized with a README starts on.
    initial_branch: String,
    /// Groups in creation order.
    groups: Vec<Group>,
    /// Projects in creation order.
    projects: Vec<Project>,
    /// Branch names per project id.
    branches: HashMap<u64, Vec<String>>,
    /// Push rule per project id.
    push_rules: HashMap<u64, PushRule>,
    /// Protected-branch rules per project id.
    protected: HashMap<u64, Vec<ProtectedBranchRule>>,
    /// Next identifier to assign (shared by groups and projects).
    next_id: u64,
    /// Injected failures.
    fail_on: Vec<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Trait method a failure is injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMethod {
    Authenticate,
    FindGroups,
    CreateGroup,
    GetProject,
    CreateProject,
    UpdateProject,
    ListBranches,
    GetBranch,
    CreateBranch,
    GetPushRule,
    CreatePushRule,
    UpdatePushRule,
    ListProtectedBranches,
    CreateProtectedBranch,
}

/// Configuration for which operation should fail.
///
/// Without a target every call to `method` fails. With a target only calls
/// concerning that project name, group name, or branch name fail.
///
/// # Example
///
/// ```
/// use baseliner::platform::mock::{FailOn, MockMethod, MockPlatform};
/// use baseliner::platform::PlatformError;
///
/// let platform = MockPlatform::new().fail_on(
///     FailOn::new(MockMethod::CreateBranch, PlatformError::RateLimited).target("support"),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct FailOn {
    method: MockMethod,
    target: Option<String>,
    error: PlatformError,
}

impl FailOn {
    /// Fail every call to `method` with `error`.
    pub fn new(method: MockMethod, error: PlatformError) -> Self {
        Self {
            method,
            target: None,
            error,
        }
    }

    /// Only fail calls concerning `target`.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    fn matches(&self, method: MockMethod, names: &[&str]) -> bool {
        self.method == method
            && self
                .target
                .as_deref()
                .map_or(true, |target| names.contains(&target))
    }
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Authenticate,
    FindGroups {
        search: String,
    },
    CreateGroup {
        name: String,
        path: String,
    },
    GetProject {
        group_path: String,
        name: String,
    },
    CreateProject {
        name: String,
        namespace_id: u64,
    },
    UpdateProject {
        project_id: u64,
        update: ProjectUpdate,
    },
    ListBranches {
        project_id: u64,
    },
    GetBranch {
        project_id: u64,
        name: String,
    },
    CreateBranch {
        project_id: u64,
        name: String,
        from_ref: String,
    },
    GetPushRule {
        project_id: u64,
    },
    CreatePushRule {
        project_id: u64,
        rule: PushRule,
    },
    UpdatePushRule {
        project_id: u64,
        rule: PushRule,
    },
    ListProtectedBranches {
        project_id: u64,
    },
    CreateProtectedBranch {
        project_id: u64,
        rule: ProtectedBranchRule,
    },
}

impl MockOperation {
    /// Whether the operation changes remote state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            MockOperation::CreateGroup { .. }
                | MockOperation::CreateProject { .. }
                | MockOperation::UpdateProject { .. }
                | MockOperation::CreateBranch { .. }
                | MockOperation::CreatePushRule { .. }
                | MockOperation::UpdatePushRule { .. }
                | MockOperation::CreateProtectedBranch { .. }
        )
    }
}

/// Observable state of one project, for before/after comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSnapshot {
    pub project: Project,
    /// Branch names, sorted
    pub branches: Vec<String>,
    pub push_rule: Option<PushRule>,
    pub protected_branches: Vec<ProtectedBranchRule>,
}

impl MockPlatform {
    /// Create a new empty mock platform.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockPlatformInner {
                username: "mock-user".to_string(),
                initial_branch: "master".to_string(),
                groups: Vec::new(),
                projects: Vec::new(),
                branches: HashMap::new(),
                push_rules: HashMap::new(),
                protected: HashMap::new(),
                next_id: 1,
                fail_on: Vec::new(),
                operations: Vec::new(),
            })),
        }
    }

    /// Set the branch new repositories start on.
    pub fn with_initial_branch(self, name: &str) -> Self {
        self.state().initial_branch = name.to_string();
        self
    }

    /// Add a failure. Failures accumulate until cleared.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.state().fail_on.push(fail_on);
        self
    }

    /// Clear all failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().fail_on.clear();
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Number of recorded operations that change remote state.
    pub fn mutation_count(&self) -> usize {
        self.state()
            .operations
            .iter()
            .filter(|op| op.is_mutation())
            .count()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    /// Add a top-level group directly, without recording an operation.
    pub fn add_group(&self, name: &str, path: &str) -> Group {
        let mut inner = self.state();
        let group = Group {
            id: inner.allocate_id(),
            name: name.to_string(),
            path: path.to_string(),
            full_path: path.to_string(),
        };
        inner.groups.push(group.clone());
        group
    }

    /// Add a project directly under the group with full path `group_path`.
    ///
    /// The project starts with the initial branch as its only branch and
    /// default branch, an all-false merge policy, no push rule and no
    /// protected branches.
    ///
    /// # Panics
    ///
    /// Panics if the group does not exist.
    pub fn add_project(&self, group_path: &str, name: &str) -> Project {
        let mut inner = self.state();
        let namespace_id = inner
            .groups
            .iter()
            .find(|g| g.full_path == group_path)
            .map(|g| g.id)
            .unwrap_or_else(|| panic!("mock group '{}' does not exist", group_path));
        let initial = inner.initial_branch.clone();
        inner.insert_project(name, namespace_id, MergePolicy::default().into(), Some(initial))
    }

    /// Replace what the platform reports as a project's merge policy.
    ///
    /// # Panics
    ///
    /// Panics if the project does not exist.
    pub fn set_merge_policy(&self, project_id: u64, merge_policy: ObservedMergePolicy) {
        let mut inner = self.state();
        let project = inner
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .unwrap_or_else(|| panic!("mock project {} does not exist", project_id));
        project.merge_policy = merge_policy;
    }

    /// Add a branch to a project directly.
    pub fn add_branch(&self, project_id: u64, name: &str) {
        self.state()
            .branches
            .entry(project_id)
            .or_default()
            .push(name.to_string());
    }

    /// Set a project's push rule directly.
    pub fn set_push_rule(&self, project_id: u64, rule: PushRule) {
        self.state().push_rules.insert(project_id, rule);
    }

    /// Add a protected-branch rule directly.
    pub fn add_protected_branch(&self, project_id: u64, rule: ProtectedBranchRule) {
        self.state()
            .protected
            .entry(project_id)
            .or_default()
            .push(rule);
    }

    /// All groups (for test verification).
    pub fn groups(&self) -> Vec<Group> {
        self.state().groups.clone()
    }

    /// All projects (for test verification).
    pub fn projects(&self) -> Vec<Project> {
        self.state().projects.clone()
    }

    /// Capture a project's observable state.
    pub fn snapshot(&self, project_id: u64) -> Option<ProjectSnapshot> {
        let inner = self.state();
        let project = inner.projects.iter().find(|p| p.id == project_id)?.clone();
        let mut branches = inner
            .branches
            .get(&project_id)
            .cloned()
            .unwrap_or_default();
        branches.sort();
        Some(ProjectSnapshot {
            project,
            branches,
            push_rule: inner.push_rules.get(&project_id).cloned(),
            protected_branches: inner
                .protected
                .get(&project_id)
                .cloned()
                .unwrap_or_default(),
        })
    }

    fn state(&self) -> MutexGuard<'_, MockPlatformInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an operation and return the injected failure, if any.
    fn enter(
        &self,
        op: MockOperation,
        method: MockMethod,
        names: &[&str],
    ) -> Result<(), PlatformError> {
        let mut inner = self.state();
        inner.operations.push(op);
        match inner.fail_on.iter().find(|f| f.matches(method, names)) {
            Some(fail) => Err(fail.error.clone()),
            None => Ok(()),
        }
    }

    /// Name of a project for failure targeting.
    fn project_name(&self, project_id: u64) -> String {
        self.state()
            .projects
            .iter()
            .find(|p| p.id == project_id)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatformInner {
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert_project(
        &mut self,
        name: &str,
        namespace_id: u64,
        merge_policy: ObservedMergePolicy,
        initial_branch: Option<String>,
    ) -> Project {
        let namespace = self
            .groups
            .iter()
            .find(|g| g.id == namespace_id)
            .map(|g| g.full_path.clone())
            .unwrap_or_default();
        let project = Project {
            id: self.allocate_id(),
            name: name.to_string(),
            path: name.to_string(),
            path_with_namespace: format!("{}/{}", namespace, name),
            namespace_id,
            default_branch: initial_branch.clone(),
            merge_policy,
        };
        self.branches
            .insert(project.id, initial_branch.into_iter().collect());
        self.projects.push(project.clone());
        project
    }

    fn project_mut(&mut self, project_id: u64) -> Result<&mut Project, PlatformError> {
        self.projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| PlatformError::NotFound(format!("project {}", project_id)))
    }

    fn branches(&self, project_id: u64) -> Result<&Vec<String>, PlatformError> {
        self.branches
            .get(&project_id)
            .ok_or_else(|| PlatformError::NotFound(format!("project {}", project_id)))
    }
}

fn bad_request(message: &str) -> PlatformError {
    PlatformError::Rejected {
        status: 400,
        message: message.to_string(),
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn authenticate(&self) -> Result<Session, PlatformError> {
        self.enter(MockOperation::Authenticate, MockMethod::Authenticate, &[])?;
        Ok(Session {
            username: self.state().username.clone(),
        })
    }

    async fn find_groups(&self, search: &str) -> Result<Vec<Group>, PlatformError> {
        self.enter(
            MockOperation::FindGroups {
                search: search.to_string(),
            },
            MockMethod::FindGroups,
            &[search],
        )?;

        let needle = search.to_lowercase();
        let inner = self.state();
        Ok(inner
            .groups
            .iter()
            .filter(|g| {
                g.name.to_lowercase().contains(&needle) || g.path.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn create_group(&self, name: &str, path: &str) -> Result<Group, PlatformError> {
        self.enter(
            MockOperation::CreateGroup {
                name: name.to_string(),
                path: path.to_string(),
            },
            MockMethod::CreateGroup,
            &[name, path],
        )?;

        let mut inner = self.state();
        if inner.groups.iter().any(|g| g.full_path == path) {
            return Err(bad_request("Failed to save group {:path=>[\"has already been taken\"]}"));
        }
        let group = Group {
            id: inner.allocate_id(),
            name: name.to_string(),
            path: path.to_string(),
            full_path: path.to_string(),
        };
        inner.groups.push(group.clone());
        Ok(group)
    }

    async fn get_project(&self, group_path: &str, name: &str) -> Result<Project, PlatformError> {
        self.enter(
            MockOperation::GetProject {
                group_path: group_path.to_string(),
                name: name.to_string(),
            },
            MockMethod::GetProject,
            &[name],
        )?;

        let full_path = format!("{}/{}", group_path, name);
        let inner = self.state();
        inner
            .projects
            .iter()
            .find(|p| p.path_with_namespace.eq_ignore_ascii_case(&full_path))
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("project {}", full_path)))
    }

    async fn create_project(&self, request: &NewProject) -> Result<Project, PlatformError> {
        self.enter(
            MockOperation::CreateProject {
                name: request.name.clone(),
                namespace_id: request.namespace_id,
            },
            MockMethod::CreateProject,
            &[&request.name],
        )?;

        let mut inner = self.state();
        if !inner.groups.iter().any(|g| g.id == request.namespace_id) {
            return Err(PlatformError::NotFound(format!(
                "namespace {}",
                request.namespace_id
            )));
        }
        if inner
            .projects
            .iter()
            .any(|p| p.namespace_id == request.namespace_id && p.path == request.name)
        {
            return Err(bad_request("path has already been taken"));
        }
        let initial = request
            .initialize_with_readme
            .then(|| inner.initial_branch.clone());
        Ok(inner.insert_project(
            &request.name,
            request.namespace_id,
            request.merge_policy.into(),
            initial,
        ))
    }

    async fn update_project(
        &self,
        project_id: u64,
        update: &ProjectUpdate,
    ) -> Result<Project, PlatformError> {
        let name = self.project_name(project_id);
        self.enter(
            MockOperation::UpdateProject {
                project_id,
                update: update.clone(),
            },
            MockMethod::UpdateProject,
            &[&name],
        )?;

        let mut inner = self.state();
        if let Some(branch) = &update.default_branch {
            if !inner.branches(project_id)?.contains(branch) {
                return Err(bad_request("default_branch does not exist"));
            }
        }
        let project = inner.project_mut(project_id)?;
        if let Some(branch) = &update.default_branch {
            project.default_branch = Some(branch.clone());
        }
        if let Some(v) = update.pipeline_must_succeed {
            project.merge_policy.pipeline_must_succeed = Some(v);
        }
        if let Some(v) = update.discussions_must_be_resolved {
            project.merge_policy.discussions_must_be_resolved = Some(v);
        }
        if let Some(v) = update.approvals_before_merge {
            project.merge_policy.approvals_before_merge = Some(v);
        }
        Ok(project.clone())
    }

    async fn list_branches(&self, project_id: u64) -> Result<Vec<Branch>, PlatformError> {
        let name = self.project_name(project_id);
        self.enter(
            MockOperation::ListBranches { project_id },
            MockMethod::ListBranches,
            &[&name],
        )?;

        let inner = self.state();
        Ok(inner
            .branches(project_id)?
            .iter()
            .map(|name| Branch { name: name.clone() })
            .collect())
    }

    async fn get_branch(&self, project_id: u64, name: &str) -> Result<Branch, PlatformError> {
        let project = self.project_name(project_id);
        self.enter(
            MockOperation::GetBranch {
                project_id,
                name: name.to_string(),
            },
            MockMethod::GetBranch,
            &[&project, name],
        )?;

        let inner = self.state();
        inner
            .branches(project_id)?
            .iter()
            .find(|b| *b == name)
            .map(|b| Branch { name: b.clone() })
            .ok_or_else(|| PlatformError::NotFound(format!("branch {}", name)))
    }

    async fn create_branch(
        &self,
        project_id: u64,
        name: &str,
        from_ref: &str,
    ) -> Result<Branch, PlatformError> {
        let project = self.project_name(project_id);
        self.enter(
            MockOperation::CreateBranch {
                project_id,
                name: name.to_string(),
                from_ref: from_ref.to_string(),
            },
            MockMethod::CreateBranch,
            &[&project, name],
        )?;

        let mut inner = self.state();
        let branches = inner.branches(project_id)?;
        if branches.iter().any(|b| b == name) {
            return Err(bad_request("Branch already exists"));
        }
        if !branches.iter().any(|b| b == from_ref) {
            return Err(bad_request("Invalid reference name"));
        }
        inner
            .branches
            .entry(project_id)
            .or_default()
            .push(name.to_string());
        Ok(Branch {
            name: name.to_string(),
        })
    }

    async fn get_push_rule(&self, project_id: u64) -> Result<PushRule, PlatformError> {
        let project = self.project_name(project_id);
        self.enter(
            MockOperation::GetPushRule { project_id },
            MockMethod::GetPushRule,
            &[&project],
        )?;

        let inner = self.state();
        inner.branches(project_id)?;
        inner
            .push_rules
            .get(&project_id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound("push rule".into()))
    }

    async fn create_push_rule(
        &self,
        project_id: u64,
        rule: &PushRule,
    ) -> Result<PushRule, PlatformError> {
        let project = self.project_name(project_id);
        self.enter(
            MockOperation::CreatePushRule {
                project_id,
                rule: rule.clone(),
            },
            MockMethod::CreatePushRule,
            &[&project],
        )?;

        let mut inner = self.state();
        inner.branches(project_id)?;
        if inner.push_rules.contains_key(&project_id) {
            return Err(PlatformError::Rejected {
                status: 422,
                message: "Project push rule exists".into(),
            });
        }
        inner.push_rules.insert(project_id, rule.clone());
        Ok(rule.clone())
    }

    async fn update_push_rule(
        &self,
        project_id: u64,
        rule: &PushRule,
    ) -> Result<PushRule, PlatformError> {
        let project = self.project_name(project_id);
        self.enter(
            MockOperation::UpdatePushRule {
                project_id,
                rule: rule.clone(),
            },
            MockMethod::UpdatePushRule,
            &[&project],
        )?;

        let mut inner = self.state();
        match inner.push_rules.get_mut(&project_id) {
            Some(existing) => {
                *existing = rule.clone();
                Ok(rule.clone())
            }
            None => Err(PlatformError::NotFound("push rule".into())),
        }
    }

    async fn list_protected_branches(
        &self,
        project_id: u64,
    ) -> Result<Vec<ProtectedBranchRule>, PlatformError> {
        let project = self.project_name(project_id);
        self.enter(
            MockOperation::ListProtectedBranches { project_id },
            MockMethod::ListProtectedBranches,
            &[&project],
        )?;

        let inner = self.state();
        inner.branches(project_id)?;
        Ok(inner
            .protected
            .get(&project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_protected_branch(
        &self,
        project_id: u64,
        rule: &ProtectedBranchRule,
    ) -> Result<ProtectedBranchRule, PlatformError> {
        let project = self.project_name(project_id);
        self.enter(
            MockOperation::CreateProtectedBranch {
                project_id,
                rule: rule.clone(),
            },
            MockMethod::CreateProtectedBranch,
            &[&project, &rule.name],
        )?;

        let mut inner = self.state();
        inner.branches(project_id)?;
        let rules = inner.protected.entry(project_id).or_default();
        if rules.iter().any(|r| r.name == rule.name) {
            return Err(PlatformError::Rejected {
                status: 409,
                message: "Protected branch already exists".into(),
            });
        }
        rules.push(rule.clone());
        Ok(rule.clone())
    }
}
