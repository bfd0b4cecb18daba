//! engine::project
//!
//! Project reconciliation under the resolved group.
//!
//! # Algorithm
//!
//! 1. Every requested name is looked up as `group_path/name`. The raw name
//!    is used as the path segment; it is not normalized.
//! 2. Existing projects go through the confirmation gate. A declined
//!    project is not touched at all. A confirmed one gets its merge policy
//!    updated (only the fields that differ) and is then configured.
//! 3. Missing projects are created with the baseline attributes and then
//!    configured.
//!
//! A failed lookup, create or update skips that one project; the batch
//! continues. Projects are handled strictly one after another.

use tracing::{debug, error, info, warn};

use super::configure::configure;
use super::confirm::ConfirmationPolicy;
use super::report::{ConfigureReport, Outcome, ProjectAction, ProjectReport, Step, Warning};
use crate::core::config::Baseline;
use crate::core::types::{Group, MergePolicy, ObservedMergePolicy, Project};
use crate::platform::{NewProject, Platform, PlatformError, ProjectUpdate};
use crate::ui::prompts::PromptError;

/// Result of looking up one requested name.
enum Lookup {
    Existing(Project),
    Missing,
    Failed(PlatformError),
}

/// Reconcile every requested project against the baseline.
///
/// Returns one report per distinct name, in request order. Blank names are
/// ignored.
pub async fn reconcile(
    platform: &dyn Platform,
    group: &Group,
    names: &[String],
    baseline: &Baseline,
    policy: &mut ConfirmationPolicy,
) -> Vec<ProjectReport> {
    let names = distinct(names);

    let mut lookups = Vec::with_capacity(names.len());
    for name in &names {
        info!(project = %name, group = %group.full_path, "Looking up project");
        let lookup = match platform.get_project(&group.full_path, name).await {
            Ok(project) => Lookup::Existing(project),
            Err(e) if e.is_not_found() => Lookup::Missing,
            Err(e) => Lookup::Failed(e),
        };
        lookups.push(lookup);
    }

    let mut reports: Vec<Option<ProjectReport>> = vec![None; names.len()];

    // Existing projects first, then missing ones
    for (i, lookup) in lookups.into_iter().enumerate() {
        match lookup {
            Lookup::Existing(project) => {
                reports[i] =
                    Some(update_existing(platform, names[i], project, baseline, policy).await);
            }
            Lookup::Failed(e) => {
                error!(project = %names[i], "Failed to look up project: {}", e);
                reports[i] = Some(ProjectReport::failed(
                    names[i],
                    None,
                    format!("lookup failed: {}", e),
                ));
            }
            Lookup::Missing => {}
        }
    }
    for (i, name) in names.iter().enumerate() {
        if reports[i].is_none() {
            reports[i] = Some(create_missing(platform, group, name, baseline).await);
        }
    }

    reports.into_iter().flatten().collect()
}

/// Requested names with blanks and repeats removed, order kept.
fn distinct(names: &[String]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for name in names.iter().map(|n| n.trim()) {
        if !name.is_empty() && !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

async fn update_existing(
    platform: &dyn Platform,
    name: &str,
    project: Project,
    baseline: &Baseline,
    policy: &mut ConfirmationPolicy,
) -> ProjectReport {
    let mut report = ProjectReport {
        name: name.to_string(),
        action: ProjectAction::Declined,
        project: None,
        error: None,
        configure: None,
        warnings: Vec::new(),
    };

    let confirmed = match policy.should_overwrite(&project.path_with_namespace) {
        Ok(answer) => answer,
        Err(e) => {
            let message = match e {
                PromptError::Cancelled => "no answer before input closed; left untouched".to_string(),
                other => format!("confirmation failed: {}; left untouched", other),
            };
            warn!(project = %name, "{}", message);
            report.warnings.push(Warning {
                step: Step::Confirm,
                message,
            });
            false
        }
    };
    if !confirmed {
        info!(project = %name, "Leaving existing project untouched");
        report.project = Some(project);
        return report;
    }

    info!(project = %name, "Updating project settings");
    let update = merge_policy_update(&project.merge_policy, &baseline.merge_policy);
    let mut updated = false;
    let project = if update.is_empty() {
        debug!(project = %name, "merge policy already matches");
        project
    } else {
        match platform.update_project(project.id, &update).await {
            Ok(project) => {
                updated = true;
                project
            }
            Err(e) => {
                error!(project = %name, "Failed to update project: {}", e);
                return ProjectReport::failed(name, Some(project), format!("update failed: {}", e));
            }
        }
    };

    let configured = configure(platform, &project, baseline).await;
    report.action = if updated || configured.changed_anything() {
        ProjectAction::Updated
    } else {
        ProjectAction::Unchanged
    };
    report.project = Some(refreshed(project, &configured, baseline));
    report.configure = Some(configured);
    report
}

async fn create_missing(
    platform: &dyn Platform,
    group: &Group,
    name: &str,
    baseline: &Baseline,
) -> ProjectReport {
    info!(project = %name, group = %group.full_path, "Creating project");
    let request = NewProject {
        name: name.to_string(),
        namespace_id: group.id,
        merge_policy: baseline.merge_policy,
        initialize_with_readme: baseline.initialize_with_readme,
    };

    let project = match platform.create_project(&request).await {
        Ok(project) => project,
        Err(e) => {
            error!(project = %name, "Failed to create project: {}", e);
            return ProjectReport::failed(name, None, format!("create failed: {}", e));
        }
    };

    let configured = configure(platform, &project, baseline).await;
    ProjectReport {
        name: name.to_string(),
        action: ProjectAction::Created,
        project: Some(refreshed(project, &configured, baseline)),
        error: None,
        configure: Some(configured),
        warnings: Vec::new(),
    }
}

/// The merge-policy fields that differ from the baseline. Fields the
/// platform does not report are left alone.
fn merge_policy_update(current: &ObservedMergePolicy, wanted: &MergePolicy) -> ProjectUpdate {
    fn differs<T: PartialEq + Copy>(current: Option<T>, wanted: T) -> Option<T> {
        current.filter(|c| *c != wanted).map(|_| wanted)
    }
    ProjectUpdate {
        default_branch: None,
        pipeline_must_succeed: differs(current.pipeline_must_succeed, wanted.pipeline_must_succeed),
        discussions_must_be_resolved: differs(
            current.discussions_must_be_resolved,
            wanted.discussions_must_be_resolved,
        ),
        approvals_before_merge: differs(current.approvals_before_merge, wanted.approvals_before_merge),
    }
}

/// Reflect a successful default-branch change in the reported project.
fn refreshed(
    mut project: Project,
    configured: &ConfigureReport,
    baseline: &Baseline,
) -> Project {
    if configured.default_branch == Outcome::Updated {
        project.default_branch = Some(baseline.default_branch.to_string());
    }
    project
}
