//! platform::gitlab
//!
//! GitLab implementation of the `Platform` trait over the REST v4 API.
//!
//! # Design
//!
//! Each trait method maps to exactly one HTTP request. Responses are
//! deserialized into GitLab wire types and converted into the domain types
//! from [`crate::core::types`]. Status codes are mapped onto
//! [`PlatformError`] so the engine never sees HTTP details:
//!
//! | Status | Error |
//! |---|---|
//! | 401 | `AuthFailed` |
//! | 404 | `NotFound` |
//! | 429 | `RateLimited` |
//! | other 4xx / 5xx | `Rejected` |
//!
//! No request is retried here.
//!
//! # Authentication
//!
//! A personal or project access token is sent in the `PRIVATE-TOKEN` header.
//!
//! # Example
//!
//! ```ignore
//! use baseliner::platform::gitlab::GitLabPlatform;
//! use baseliner::platform::Platform;
//!
//! let platform = GitLabPlatform::new("https://gitlab.example.com/api/v4", "glpat-xxx");
//! let session = platform.authenticate().await?;
//! println!("Authenticated as {}", session.username);
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{NewProject, Platform, PlatformError, ProjectUpdate, Session};
use crate::core::types::{
    AccessLevel, Branch, Group, ObservedMergePolicy, Project, ProtectedBranchRule, PushRule,
};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "baseliner";

/// Page size for list endpoints.
const PER_PAGE: &str = "100";

/// GitLab platform implementation.
pub struct GitLabPlatform {
    /// HTTP client for making requests
    client: Client,
    /// Access token
    token: String,
    /// API base URL, e.g. `https://gitlab.com/api/v4`
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitLabPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabPlatform")
            .field("has_token", &!self.token.is_empty())
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitLabPlatform {
    /// Create a new GitLab platform client.
    ///
    /// # Arguments
    ///
    /// * `api_base` - API base URL including `/api/v4`
    /// * `token` - Access token
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, PlatformError> {
        if self.token.is_empty() {
            return Err(PlatformError::AuthRequired);
        }
        let token = HeaderValue::from_str(&self.token)
            .map_err(|_| PlatformError::AuthFailed("token contains invalid characters".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert("PRIVATE-TOKEN", token);
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        Ok(headers)
    }

    /// Build an endpoint URL. Each segment is percent-encoded on its own,
    /// so `team/api` becomes the single segment `team%2Fapi`.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, PlatformError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| PlatformError::InvalidResponse(format!("invalid API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| PlatformError::InvalidResponse("API base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn project_endpoint(&self, project_id: u64, rest: &[&str]) -> Result<Url, PlatformError> {
        let id = project_id.to_string();
        let mut segments = vec!["projects", id.as_str()];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    /// Send a request and decode the JSON response.
    ///
    /// `what` names the resource in `NotFound` errors.
    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, PlatformError> {
        let request = builder
            .headers(self.headers()?)
            .build()
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        debug!(method = %request.method(), url = %request.url(), "gitlab request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        Self::handle_response(response, what).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        response: Response,
        what: &str,
    ) -> Result<T, PlatformError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                PlatformError::InvalidResponse(format!("failed to parse {}: {}", what, e))
            })
        } else {
            Err(Self::error_from_response(response, status, what).await)
        }
    }

    /// Map an error response onto a `PlatformError`.
    async fn error_from_response(
        response: Response,
        status: StatusCode,
        what: &str,
    ) -> PlatformError {
        let message = match response.json::<GitLabErrorResponse>().await {
            Ok(err) => err.into_message(),
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => PlatformError::AuthFailed(message),
            StatusCode::NOT_FOUND => PlatformError::NotFound(what.to_string()),
            StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited,
            _ if status.is_server_error() => PlatformError::Rejected {
                status: status.as_u16(),
                message: format!("GitLab server error: {}", message),
            },
            _ => PlatformError::Rejected {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl Platform for GitLabPlatform {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    async fn authenticate(&self) -> Result<Session, PlatformError> {
        let url = self.endpoint(&["user"])?;
        let user: GitLabUser = self
            .execute(self.client.get(url), "current user")
            .await
            .map_err(|e| match e {
                // A token that cannot see its own user is not usable at all
                PlatformError::NotFound(_) | PlatformError::Rejected { status: 403, .. } => {
                    PlatformError::AuthFailed(e.to_string())
                }
                other => other,
            })?;
        Ok(Session {
            username: user.username,
        })
    }

    async fn find_groups(&self, search: &str) -> Result<Vec<Group>, PlatformError> {
        let url = self.endpoint(&["groups"])?;
        let request = self
            .client
            .get(url)
            .query(&[("search", search), ("per_page", PER_PAGE)]);
        let groups: Vec<GitLabGroup> = self.execute(request, "groups").await?;
        Ok(groups.into_iter().map(Group::from).collect())
    }

    async fn create_group(&self, name: &str, path: &str) -> Result<Group, PlatformError> {
        let url = self.endpoint(&["groups"])?;
        let body = CreateGroupBody { name, path };
        let group: GitLabGroup = self
            .execute(self.client.post(url).json(&body), "group")
            .await?;
        Ok(group.into())
    }

    async fn get_project(&self, group_path: &str, name: &str) -> Result<Project, PlatformError> {
        let full_path = format!("{}/{}", group_path, name);
        let url = self.endpoint(&["projects", &full_path])?;
        let what = format!("project {}", full_path);
        let project: GitLabProject = self.execute(self.client.get(url), &what).await?;
        Ok(project.into())
    }

    async fn create_project(&self, request: &NewProject) -> Result<Project, PlatformError> {
        let url = self.endpoint(&["projects"])?;
        let body = CreateProjectBody {
            name: &request.name,
            namespace_id: request.namespace_id,
            only_allow_merge_if_pipeline_succeeds: request.merge_policy.pipeline_must_succeed,
            only_allow_merge_if_all_discussions_are_resolved: request
                .merge_policy
                .discussions_must_be_resolved,
            approvals_before_merge: request.merge_policy.approvals_before_merge,
            initialize_with_readme: request.initialize_with_readme,
        };
        let what = format!("project {}", request.name);
        let project: GitLabProject = self
            .execute(self.client.post(url).json(&body), &what)
            .await?;
        Ok(project.into())
    }

    async fn update_project(
        &self,
        project_id: u64,
        update: &ProjectUpdate,
    ) -> Result<Project, PlatformError> {
        let url = self.project_endpoint(project_id, &[])?;
        let body = UpdateProjectBody {
            default_branch: update.default_branch.as_deref(),
            only_allow_merge_if_pipeline_succeeds: update.pipeline_must_succeed,
            only_allow_merge_if_all_discussions_are_resolved: update.discussions_must_be_resolved,
            approvals_before_merge: update.approvals_before_merge,
        };
        let what = format!("project {}", project_id);
        let project: GitLabProject = self
            .execute(self.client.put(url).json(&body), &what)
            .await?;
        Ok(project.into())
    }

    async fn list_branches(&self, project_id: u64) -> Result<Vec<Branch>, PlatformError> {
        let url = self.project_endpoint(project_id, &["repository", "branches"])?;
        let request = self.client.get(url).query(&[("per_page", PER_PAGE)]);
        let branches: Vec<GitLabBranch> = self.execute(request, "branches").await?;
        Ok(branches.into_iter().map(Branch::from).collect())
    }

    async fn get_branch(&self, project_id: u64, name: &str) -> Result<Branch, PlatformError> {
        let url = self.project_endpoint(project_id, &["repository", "branches", name])?;
        let what = format!("branch {}", name);
        let branch: GitLabBranch = self.execute(self.client.get(url), &what).await?;
        Ok(branch.into())
    }

    async fn create_branch(
        &self,
        project_id: u64,
        name: &str,
        from_ref: &str,
    ) -> Result<Branch, PlatformError> {
        let url = self.project_endpoint(project_id, &["repository", "branches"])?;
        let request = self
            .client
            .post(url)
            .query(&[("branch", name), ("ref", from_ref)]);
        let what = format!("branch {}", name);
        let branch: GitLabBranch = self.execute(request, &what).await?;
        Ok(branch.into())
    }

    async fn get_push_rule(&self, project_id: u64) -> Result<PushRule, PlatformError> {
        let url = self.project_endpoint(project_id, &["push_rule"])?;
        // Projects without a push rule answer `200 null`
        let rule: Option<GitLabPushRule> =
            self.execute(self.client.get(url), "push rule").await?;
        rule.map(PushRule::from)
            .ok_or_else(|| PlatformError::NotFound("push rule".into()))
    }

    async fn create_push_rule(
        &self,
        project_id: u64,
        rule: &PushRule,
    ) -> Result<PushRule, PlatformError> {
        let url = self.project_endpoint(project_id, &["push_rule"])?;
        let created: GitLabPushRule = self
            .execute(self.client.post(url).json(rule), "push rule")
            .await?;
        Ok(created.into())
    }

    async fn update_push_rule(
        &self,
        project_id: u64,
        rule: &PushRule,
    ) -> Result<PushRule, PlatformError> {
        let url = self.project_endpoint(project_id, &["push_rule"])?;
        let updated: GitLabPushRule = self
            .execute(self.client.put(url).json(rule), "push rule")
            .await?;
        Ok(updated.into())
    }

    async fn list_protected_branches(
        &self,
        project_id: u64,
    ) -> Result<Vec<ProtectedBranchRule>, PlatformError> {
        let url = self.project_endpoint(project_id, &["protected_branches"])?;
        let request = self.client.get(url).query(&[("per_page", PER_PAGE)]);
        let rules: Vec<GitLabProtectedBranch> =
            self.execute(request, "protected branches").await?;
        Ok(rules.into_iter().map(ProtectedBranchRule::from).collect())
    }

    async fn create_protected_branch(
        &self,
        project_id: u64,
        rule: &ProtectedBranchRule,
    ) -> Result<ProtectedBranchRule, PlatformError> {
        let url = self.project_endpoint(project_id, &["protected_branches"])?;
        let body = ProtectBranchBody {
            name: &rule.name,
            push_access_level: rule.push_access_level.as_u32(),
            merge_access_level: rule.merge_access_level.as_u32(),
        };
        let what = format!("protected branch {}", rule.name);
        let created: GitLabProtectedBranch = self
            .execute(self.client.post(url).json(&body), &what)
            .await?;
        Ok(created.into())
    }
}

// --------------------------------------------------------------------------
// Request bodies
// --------------------------------------------------------------------------

#[derive(Serialize)]
struct CreateGroupBody<'a> {
    name: &'a str,
    path: &'a str,
}

#[derive(Serialize)]
struct CreateProjectBody<'a> {
    name: &'a str,
    namespace_id: u64,
    only_allow_merge_if_pipeline_succeeds: bool,
    only_allow_merge_if_all_discussions_are_resolved: bool,
    approvals_before_merge: u32,
    initialize_with_readme: bool,
}

#[derive(Serialize)]
struct UpdateProjectBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    default_branch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    only_allow_merge_if_pipeline_succeeds: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    only_allow_merge_if_all_discussions_are_resolved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    approvals_before_merge: Option<u32>,
}

#[derive(Serialize)]
struct ProtectBranchBody<'a> {
    name: &'a str,
    push_access_level: u32,
    merge_access_level: u32,
}

// --------------------------------------------------------------------------
// Response types
// --------------------------------------------------------------------------

/// GitLab error body. `message` may be a string, a list, or a map of
/// field name to messages; `error` is used by some endpoints instead.
#[derive(Deserialize)]
struct GitLabErrorResponse {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl GitLabErrorResponse {
    fn into_message(self) -> String {
        match (self.message, self.error) {
            (Some(serde_json::Value::String(s)), _) => s,
            (Some(other), _) => other.to_string(),
            (None, Some(error)) => error,
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct GitLabUser {
    username: String,
}

#[derive(Deserialize)]
struct GitLabGroup {
    id: u64,
    name: String,
    path: String,
    full_path: String,
}

impl From<GitLabGroup> for Group {
    fn from(g: GitLabGroup) -> Self {
        Group {
            id: g.id,
            name: g.name,
            path: g.path,
            full_path: g.full_path,
        }
    }
}

#[derive(Deserialize)]
struct GitLabNamespace {
    id: u64,
}

#[derive(Deserialize)]
struct GitLabProject {
    id: u64,
    name: String,
    path: String,
    path_with_namespace: String,
    namespace: GitLabNamespace,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    only_allow_merge_if_pipeline_succeeds: Option<bool>,
    #[serde(default)]
    only_allow_merge_if_all_discussions_are_resolved: Option<bool>,
    #[serde(default)]
    approvals_before_merge: Option<u32>,
}

impl From<GitLabProject> for Project {
    fn from(p: GitLabProject) -> Self {
        Project {
            id: p.id,
            name: p.name,
            path: p.path,
            path_with_namespace: p.path_with_namespace,
            namespace_id: p.namespace.id,
            default_branch: p.default_branch,
            merge_policy: ObservedMergePolicy {
                pipeline_must_succeed: p.only_allow_merge_if_pipeline_succeeds,
                discussions_must_be_resolved: p.only_allow_merge_if_all_discussions_are_resolved,
                approvals_before_merge: p.approvals_before_merge,
            },
        }
    }
}

#[derive(Deserialize)]
struct GitLabBranch {
    name: String,
}

impl From<GitLabBranch> for Branch {
    fn from(b: GitLabBranch) -> Self {
        Branch { name: b.name }
    }
}

#[derive(Deserialize)]
struct GitLabPushRule {
    #[serde(default)]
    author_email_regex: Option<String>,
    #[serde(default)]
    branch_name_regex: Option<String>,
    #[serde(default)]
    deny_delete_tag: Option<bool>,
}

impl From<GitLabPushRule> for PushRule {
    fn from(r: GitLabPushRule) -> Self {
        PushRule {
            author_email_regex: r.author_email_regex.unwrap_or_default(),
            branch_name_regex: r.branch_name_regex.unwrap_or_default(),
            deny_delete_tag: r.deny_delete_tag.unwrap_or(false),
        }
    }
}

#[derive(Deserialize)]
struct GitLabAccessLevel {
    #[serde(default)]
    access_level: Option<u32>,
}

#[derive(Deserialize)]
struct GitLabProtectedBranch {
    name: String,
    #[serde(default)]
    push_access_levels: Vec<GitLabAccessLevel>,
    #[serde(default)]
    merge_access_levels: Vec<GitLabAccessLevel>,
}

/// Most permissive role among the entries; user/group-specific entries
/// carry no role and are ignored.
fn effective_level(levels: &[GitLabAccessLevel]) -> AccessLevel {
    levels
        .iter()
        .filter_map(|l| l.access_level)
        .filter_map(|l| AccessLevel::from_u32(l).ok())
        .filter(|l| *l != AccessLevel::NoAccess)
        .min()
        .unwrap_or(AccessLevel::NoAccess)
}

impl From<GitLabProtectedBranch> for ProtectedBranchRule {
    fn from(b: GitLabProtectedBranch) -> Self {
        ProtectedBranchRule {
            merge_access_level: effective_level(&b.merge_access_levels),
            push_access_level: effective_level(&b.push_access_levels),
            name: b.name,
        }
    }
}
