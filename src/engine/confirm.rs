//! engine::confirm
//!
//! Confirmation gate for overwriting existing projects.
//!
//! # Design
//!
//! Whether an existing project may be overwritten is a policy injected into
//! the reconciler, not a hard-coded terminal read. Batch runs pick one of
//! the non-blocking variants; interactive runs supply an [`OverwritePrompt`]
//! that blocks until the operator answers.
//!
//! # Example
//!
//! ```
//! use baseliner::engine::ConfirmationPolicy;
//!
//! let mut policy = ConfirmationPolicy::NeverOverwrite;
//! assert!(!policy.should_overwrite("team/api").unwrap());
//! ```

use crate::core::config::OnExisting;
use crate::ui::prompts::PromptError;

/// Asks the operator whether to overwrite one existing project.
pub trait OverwritePrompt: Send {
    /// Block until the operator answers for the project at `project_path`.
    ///
    /// # Errors
    ///
    /// `PromptError::Cancelled` if input ended before an answer was given.
    fn confirm_overwrite(&mut self, project_path: &str) -> Result<bool, PromptError>;
}

/// How the reconciler treats projects that already exist.
pub enum ConfirmationPolicy {
    /// Overwrite every existing project
    AlwaysOverwrite,
    /// Leave every existing project untouched
    NeverOverwrite,
    /// Ask for each existing project
    PromptOperator(Box<dyn OverwritePrompt>),
}

impl ConfirmationPolicy {
    /// Build the policy for an `--on-existing` mode.
    ///
    /// `prompt` is only called for [`OnExisting::Prompt`].
    pub fn from_mode<F>(mode: OnExisting, prompt: F) -> Self
    where
        F: FnOnce() -> Box<dyn OverwritePrompt>,
    {
        match mode {
            OnExisting::Overwrite => ConfirmationPolicy::AlwaysOverwrite,
            OnExisting::Skip => ConfirmationPolicy::NeverOverwrite,
            OnExisting::Prompt => ConfirmationPolicy::PromptOperator(prompt()),
        }
    }

    /// Decide for one existing project.
    pub fn should_overwrite(&mut self, project_path: &str) -> Result<bool, PromptError> {
        match self {
            ConfirmationPolicy::AlwaysOverwrite => Ok(true),
            ConfirmationPolicy::NeverOverwrite => Ok(false),
            ConfirmationPolicy::PromptOperator(prompt) => prompt.confirm_overwrite(project_path),
        }
    }
}

impl std::fmt::Debug for ConfirmationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfirmationPolicy::AlwaysOverwrite => write!(f, "AlwaysOverwrite"),
            ConfirmationPolicy::NeverOverwrite => write!(f, "NeverOverwrite"),
            ConfirmationPolicy::PromptOperator(_) => write!(f, "PromptOperator"),
        }
    }
}
