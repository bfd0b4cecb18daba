//! ui::prompts
//!
//! Interactive prompts and confirmations.
//!
//! # Design
//!
//! Prompts are only shown in interactive mode. In non-interactive mode,
//! operations requiring user input must either have defaults or fail
//! with a clear error message.
//!
//! Prompts are written to stderr so stdout stays clean for `--json` output.
//! The yes/no loop is generic over its reader and writer so it can be
//! driven from tests.

use std::io::{self, BufRead, IsTerminal, Write};

use thiserror::Error;

use crate::engine::OverwritePrompt;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Input ended before an answer was given.
    #[error("prompt cancelled: input closed")]
    Cancelled,

    #[error("not in interactive mode")]
    NotInteractive,

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<io::Error> for PromptError {
    fn from(e: io::Error) -> Self {
        PromptError::IoError(e.to_string())
    }
}

/// Whether stdin is attached to a terminal.
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Ask a yes/no question until the answer is `Y` or `N`.
///
/// The answer is case-insensitive and surrounding whitespace is ignored.
/// Anything else repeats the question. There is no default and no timeout.
///
/// # Errors
///
/// Returns `PromptError::Cancelled` when `input` reaches end of file.
pub fn ask_yes_no<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> Result<bool, PromptError> {
    let mut line = String::new();
    loop {
        write!(output, "{} (Y/N): ", question)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Err(PromptError::Cancelled);
        }

        match line.trim().to_ascii_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            _ => continue,
        }
    }
}

/// Overwrite confirmation on the process's stdin/stderr.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl OverwritePrompt for StdinPrompt {
    fn confirm_overwrite(&mut self, project_path: &str) -> Result<bool, PromptError> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stderr();
        ask_yes_no(
            &mut input,
            &mut output,
            &format!(
                "Project {} already exists, overwrite its settings?",
                project_path
            ),
        )
    }
}

/// Prompt for masked input (e.g., tokens).
///
/// The input is not echoed to the terminal.
pub fn password(message: &str) -> Result<String, PromptError> {
    if !is_interactive() {
        return Err(PromptError::NotInteractive);
    }
    let value = rpassword::prompt_password(message)?;
    Ok(value.trim().to_string())
}
