//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, output is machine-readable JSON on stdout and
//! nothing else is written there; logs and prompts go to stderr.

use std::fmt::Display;

use crate::engine::{ConfigureReport, Outcome, ProjectAction, ProjectReport, RunReport};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - the summary also lists unchanged steps and project ids
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a run report, as JSON or as a human summary.
pub fn print_report(
    report: &RunReport,
    json: bool,
    verbosity: Verbosity,
) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print(render_summary(report, verbosity), verbosity);
    }
    Ok(())
}

/// Render a run report for humans.
///
/// Steps that changed nothing are omitted unless `verbosity` is `Debug`.
pub fn render_summary(report: &RunReport, verbosity: Verbosity) -> String {
    let detailed = verbosity == Verbosity::Debug;
    let mut lines = vec![format!(
        "Group {} (id {})",
        report.group.full_path, report.group.id
    )];

    let width = report
        .projects
        .iter()
        .map(|p| p.name.len())
        .max()
        .unwrap_or(0);
    for project in &report.projects {
        render_project(&mut lines, project, width, detailed);
    }

    lines.push(totals(report));
    lines.join("\n")
}

fn render_project(lines: &mut Vec<String>, project: &ProjectReport, width: usize, detailed: bool) {
    let detail = match (&project.error, &project.project) {
        (Some(error), _) => error.clone(),
        (None, Some(p)) if detailed => format!("{} (id {})", p.path_with_namespace, p.id),
        (None, Some(p)) => p.path_with_namespace.clone(),
        (None, None) => String::new(),
    };
    lines.push(format!(
        "  {:<9} {:<width$}  {}",
        project.action.to_string(),
        project.name,
        detail,
        width = width
    ));

    if let Some(configured) = &project.configure {
        render_configure(lines, configured, detailed);
    }
    for warning in &project.warnings {
        lines.push(format!("      warning: {}", warning));
    }
}

fn render_configure(lines: &mut Vec<String>, configured: &ConfigureReport, detailed: bool) {
    if !configured.branches_created.is_empty() {
        lines.push(format!(
            "      branches created: {}",
            configured.branches_created.join(", ")
        ));
    }
    if detailed || configured.default_branch != Outcome::Unchanged {
        lines.push(format!(
            "      default branch: {}",
            outcome(configured.default_branch)
        ));
    }
    if detailed || configured.push_rule != Outcome::Unchanged {
        lines.push(format!("      push rule: {}", outcome(configured.push_rule)));
    }
    match configured.protected_branches {
        Outcome::Unchanged if !detailed => {}
        Outcome::Created => lines.push(format!(
            "      protected branches: {}",
            configured.protected_branches_created.join(", ")
        )),
        other => lines.push(format!("      protected branches: {}", outcome(other))),
    }
    for warning in &configured.warnings {
        lines.push(format!("      warning: {}", warning));
    }
}

fn outcome(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Unchanged => "unchanged",
        Outcome::Created => "created",
        Outcome::Updated => "updated",
        Outcome::Failed => "failed",
    }
}

fn totals(report: &RunReport) -> String {
    let counts = [
        ProjectAction::Created,
        ProjectAction::Updated,
        ProjectAction::Unchanged,
        ProjectAction::Declined,
        ProjectAction::Failed,
    ]
    .iter()
    .map(|action| format!("{} {}", report.count(*action), action))
    .collect::<Vec<_>>()
    .join(", ");

    let noun = if report.projects.len() == 1 {
        "project"
    } else {
        "projects"
    };
    format!(
        "{} {}: {}; {} warning(s)",
        report.projects.len(),
        noun,
        counts,
        report.warning_count()
    )
}
