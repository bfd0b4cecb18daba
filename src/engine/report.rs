//! engine::report
//!
//! Result summary of a reconciliation run.
//!
//! Every step the engine takes ends up here: what was created, what was
//! updated, what was left alone, and every failure that did not abort the
//! run. Swallowed failures are [`Warning`]s, never silent no-ops.

use serde::Serialize;

use crate::core::types::{Group, Project};

/// Configuration step a warning belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Confirm,
    Branch,
    DefaultBranch,
    PushRule,
    ProtectedBranches,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Step::Confirm => "confirm",
            Step::Branch => "branch",
            Step::DefaultBranch => "default branch",
            Step::PushRule => "push rule",
            Step::ProtectedBranches => "protected branches",
        };
        write!(f, "{}", s)
    }
}

/// A failure that was reported but did not stop reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub step: Step,
    pub message: String,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

/// Result of one configuration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Already matched the baseline
    Unchanged,
    Created,
    Updated,
    /// Left as is because of an error (see warnings)
    Failed,
}

/// What the branch & policy configurator did to one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigureReport {
    /// Baseline branches that had to be created
    pub branches_created: Vec<String>,
    pub default_branch: Outcome,
    pub push_rule: Outcome,
    /// `Unchanged` when the project already had protected-branch rules
    pub protected_branches: Outcome,
    /// Names of protected-branch rules created
    pub protected_branches_created: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl ConfigureReport {
    pub(crate) fn new() -> Self {
        Self {
            branches_created: Vec::new(),
            default_branch: Outcome::Unchanged,
            push_rule: Outcome::Unchanged,
            protected_branches: Outcome::Unchanged,
            protected_branches_created: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record a swallowed failure.
    pub(crate) fn warn(&mut self, project: &str, step: Step, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(project, %step, "{}", message);
        self.warnings.push(Warning { step, message });
    }

    /// Whether any step changed remote state.
    pub fn changed_anything(&self) -> bool {
        !self.branches_created.is_empty()
            || !self.protected_branches_created.is_empty()
            || matches!(self.default_branch, Outcome::Created | Outcome::Updated)
            || matches!(self.push_rule, Outcome::Created | Outcome::Updated)
    }
}

/// What happened to one requested project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectAction {
    /// Did not exist and was created
    Created,
    /// Existed, overwrite confirmed, something changed
    Updated,
    /// Existed, overwrite confirmed, already matched the baseline
    Unchanged,
    /// Existed and overwrite was declined; nothing was touched
    Declined,
    /// Lookup, creation or update failed; project skipped
    Failed,
}

impl std::fmt::Display for ProjectAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProjectAction::Created => "created",
            ProjectAction::Updated => "updated",
            ProjectAction::Unchanged => "unchanged",
            ProjectAction::Declined => "declined",
            ProjectAction::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Result for one requested project name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectReport {
    /// Name as requested
    pub name: String,
    pub action: ProjectAction,
    /// Latest known state of the project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    /// Why the project failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Present when the configurator ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configure: Option<ConfigureReport>,
    /// Warnings outside the configurator (e.g. an unanswered prompt)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl ProjectReport {
    pub(crate) fn failed(name: &str, project: Option<Project>, error: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            action: ProjectAction::Failed,
            project,
            error: Some(error.into()),
            configure: None,
            warnings: Vec::new(),
        }
    }

    /// All warnings, project-level first.
    pub fn all_warnings(&self) -> impl Iterator<Item = &Warning> {
        self.warnings
            .iter()
            .chain(self.configure.iter().flat_map(|c| c.warnings.iter()))
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Target group
    pub group: Group,
    /// One entry per distinct requested name, in request order
    pub projects: Vec<ProjectReport>,
}

impl RunReport {
    /// Whether any project failed.
    pub fn has_failures(&self) -> bool {
        self.projects
            .iter()
            .any(|p| p.action == ProjectAction::Failed)
    }

    /// Projects that exist after the run (created, updated, unchanged or declined).
    pub fn processed(&self) -> Vec<&Project> {
        self.projects
            .iter()
            .filter(|p| p.action != ProjectAction::Failed)
            .filter_map(|p| p.project.as_ref())
            .collect()
    }

    /// Number of projects with the given action.
    pub fn count(&self, action: ProjectAction) -> usize {
        self.projects.iter().filter(|p| p.action == action).count()
    }

    /// Total warnings across all projects.
    pub fn warning_count(&self) -> usize {
        self.projects.iter().map(|p| p.all_warnings().count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ObservedMergePolicy;

    fn project(id: u64, name: &str) -> Project {
        Project {
            id,
            name: name.into(),
            path: name.into(),
            path_with_namespace: format!("team/{}", name),
            namespace_id: 1,
            default_branch: Some("develop".into()),
            merge_policy: ObservedMergePolicy::default(),
        }
    }

    fn group() -> Group {
        Group {
            id: 1,
            name: "Team".into(),
            path: "team".into(),
            full_path: "team".into(),
        }
    }

    #[test]
    fn fresh_configure_report_changed_nothing() {
        let report = ConfigureReport::new();
        assert!(!report.changed_anything());
    }

    #[test]
    fn configure_report_tracks_changes() {
        let mut report = ConfigureReport::new();
        report.push_rule = Outcome::Created;
        assert!(report.changed_anything());

        let mut report = ConfigureReport::new();
        report.branches_created.push("develop".into());
        assert!(report.changed_anything());

        let mut report = ConfigureReport::new();
        report.default_branch = Outcome::Failed;
        assert!(!report.changed_anything());
    }

    #[test]
    fn warn_records_step() {
        let mut report = ConfigureReport::new();
        report.warn("api", Step::PushRule, "rate limited");
        assert_eq!(
            report.warnings,
            vec![Warning {
                step: Step::PushRule,
                message: "rate limited".into()
            }]
        );
        assert_eq!(report.warnings[0].to_string(), "push rule: rate limited");
    }

    #[test]
    fn run_report_summaries() {
        let mut configured = ConfigureReport::new();
        configured.warn("a", Step::DefaultBranch, "boom");
        let report = RunReport {
            group: group(),
            projects: vec![
                ProjectReport {
                    name: "a".into(),
                    action: ProjectAction::Created,
                    project: Some(project(2, "a")),
                    error: None,
                    configure: Some(configured),
                    warnings: Vec::new(),
                },
                ProjectReport::failed("b", None, "rejected"),
                ProjectReport {
                    name: "c".into(),
                    action: ProjectAction::Declined,
                    project: Some(project(3, "c")),
                    error: None,
                    configure: None,
                    warnings: vec![Warning {
                        step: Step::Confirm,
                        message: "no answer".into(),
                    }],
                },
            ],
        };

        assert!(report.has_failures());
        assert_eq!(report.count(ProjectAction::Created), 1);
        assert_eq!(report.warning_count(), 2);
        let processed: Vec<_> = report.processed().iter().map(|p| p.id).collect();
        assert_eq!(processed, vec![2, 3]);
    }

    #[test]
    fn serializes_snake_case() {
        let report = ProjectReport::failed("b", None, "rejected (400): bad");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["action"], "failed");
        assert_eq!(json["error"], "rejected (400): bad");
        assert!(json.get("project").is_none());
        assert!(json.get("warnings").is_none());
    }
}
