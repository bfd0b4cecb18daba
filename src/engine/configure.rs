//! engine::configure
//!
//! Branch & policy configurator.
//!
//! # Steps
//!
//! Run in a fixed order, each independently guarded:
//!
//! 1. **Branches**: every managed baseline branch is looked up and created
//!    from the trunk when missing.
//! 2. **Default branch**: set when it differs from the baseline.
//! 3. **Push rule**: updated when present and different, created when absent.
//! 4. **Protected branches**: the full baseline rule set is created only when
//!    the project has no protected-branch rules at all.
//!
//! A failing step is recorded as a [`Warning`](super::report::Warning) and the
//! remaining steps still run. Every step compares before it mutates, so
//! configuring an already-configured project issues no mutating calls.

use tracing::{debug, info};

use super::report::{ConfigureReport, Outcome, Step};
use crate::core::config::Baseline;
use crate::core::types::Project;
use crate::platform::{Platform, ProjectUpdate};

/// Bring one project's branches and policies in line with the baseline.
///
/// Never fails: every error ends up in the returned report.
pub async fn configure(
    platform: &dyn Platform,
    project: &Project,
    baseline: &Baseline,
) -> ConfigureReport {
    let mut report = ConfigureReport::new();

    ensure_branches(platform, project, baseline, &mut report).await;
    ensure_default_branch(platform, project, baseline, &mut report).await;
    ensure_push_rule(platform, project, baseline, &mut report).await;
    ensure_protected_branches(platform, project, baseline, &mut report).await;

    report
}

async fn ensure_branches(
    platform: &dyn Platform,
    project: &Project,
    baseline: &Baseline,
    report: &mut ConfigureReport,
) {
    let trunk = baseline.trunk.as_str();
    for branch in baseline.managed_branches() {
        let branch = branch.as_str();
        info!(project = %project.name, branch, "Looking up branch");

        match platform.get_branch(project.id, branch).await {
            Ok(_) => debug!(branch, "branch exists"),
            Err(e) if e.is_not_found() => {
                match platform.create_branch(project.id, branch, trunk).await {
                    Ok(_) => {
                        info!(project = %project.name, branch, from = trunk, "Created branch");
                        report.branches_created.push(branch.to_string());
                    }
                    Err(e) => report.warn(
                        &project.name,
                        Step::Branch,
                        format!("failed to create branch '{}' from '{}': {}", branch, trunk, e),
                    ),
                }
            }
            Err(e) => report.warn(
                &project.name,
                Step::Branch,
                format!("failed to look up branch '{}': {}", branch, e),
            ),
        }
    }
}

async fn ensure_default_branch(
    platform: &dyn Platform,
    project: &Project,
    baseline: &Baseline,
    report: &mut ConfigureReport,
) {
    let wanted = baseline.default_branch.as_str();
    if project.default_branch.as_deref() == Some(wanted) {
        debug!(branch = wanted, "default branch already set");
        return;
    }

    info!(project = %project.name, branch = wanted, "Setting default branch");
    let update = ProjectUpdate {
        default_branch: Some(wanted.to_string()),
        ..Default::default()
    };
    match platform.update_project(project.id, &update).await {
        Ok(_) => report.default_branch = Outcome::Updated,
        Err(e) => {
            report.default_branch = Outcome::Failed;
            report.warn(
                &project.name,
                Step::DefaultBranch,
                format!("failed to set default branch '{}': {}", wanted, e),
            );
        }
    }
}

async fn ensure_push_rule(
    platform: &dyn Platform,
    project: &Project,
    baseline: &Baseline,
    report: &mut ConfigureReport,
) {
    let wanted = &baseline.push_rule;
    info!(project = %project.name, "Configuring push rule");

    report.push_rule = match platform.get_push_rule(project.id).await {
        Ok(current) if current == *wanted => {
            debug!("push rule already matches");
            Outcome::Unchanged
        }
        Ok(_) => match platform.update_push_rule(project.id, wanted).await {
            Ok(_) => Outcome::Updated,
            Err(e) => {
                report.warn(
                    &project.name,
                    Step::PushRule,
                    format!("failed to update push rule: {}", e),
                );
                Outcome::Failed
            }
        },
        Err(e) if e.is_not_found() => {
            info!(project = %project.name, "Creating push rule");
            match platform.create_push_rule(project.id, wanted).await {
                Ok(_) => Outcome::Created,
                Err(e) => {
                    report.warn(
                        &project.name,
                        Step::PushRule,
                        format!("failed to create push rule: {}", e),
                    );
                    Outcome::Failed
                }
            }
        }
        Err(e) => {
            report.warn(
                &project.name,
                Step::PushRule,
                format!("failed to fetch push rule: {}", e),
            );
            Outcome::Failed
        }
    };
}

async fn ensure_protected_branches(
    platform: &dyn Platform,
    project: &Project,
    baseline: &Baseline,
    report: &mut ConfigureReport,
) {
    let existing = match platform.list_protected_branches(project.id).await {
        Ok(rules) => rules,
        Err(e) => {
            report.protected_branches = Outcome::Failed;
            report.warn(
                &project.name,
                Step::ProtectedBranches,
                format!("failed to list protected branches: {}", e),
            );
            return;
        }
    };
    if !existing.is_empty() {
        debug!(
            count = existing.len(),
            "project already has protected branches, leaving them alone"
        );
        return;
    }

    info!(project = %project.name, "Configuring protected branches");
    for rule in &baseline.protected_branch_rules() {
        match platform.create_protected_branch(project.id, rule).await {
            Ok(created) => report.protected_branches_created.push(created.name),
            Err(e) => report.warn(
                &project.name,
                Step::ProtectedBranches,
                format!("failed to protect branch '{}': {}", rule.name, e),
            ),
        }
    }

    report.protected_branches = if report.protected_branches_created.is_empty() {
        Outcome::Failed
    } else {
        Outcome::Created
    };
}
