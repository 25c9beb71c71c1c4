//! Interactive resolution for files the user has customized.

use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;

use crate::error::SyncError;

/// Decides whether a customized file may be overwritten.
///
/// Only consulted under [`pilet_core::OverwritePolicy::Prompt`].
pub trait ConflictPrompt {
    /// `diff` is a unified diff from the current content to the new one.
    fn confirm_overwrite(&self, relative: &Path, diff: &str) -> Result<bool, SyncError>;
}

impl<F> ConflictPrompt for F
where
    F: Fn(&Path, &str) -> bool,
{
    fn confirm_overwrite(&self, relative: &Path, diff: &str) -> Result<bool, SyncError> {
        Ok(self(relative, diff))
    }
}

/// Asks on the terminal: prints the diff to stderr, reads `y`/`N` from stdin.
///
/// Without an interactive stdin every question is answered "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl ConflictPrompt for TerminalPrompt {
    fn confirm_overwrite(&self, relative: &Path, diff: &str) -> Result<bool, SyncError> {
        let stdin = std::io::stdin();
        if !stdin.is_terminal() {
            tracing::warn!(path = %relative.display(), "stdin is not a terminal; keeping file");
            return Ok(false);
        }

        let prompt_err = |source| SyncError::Prompt {
            path: relative.to_path_buf(),
            source,
        };
        let mut stderr = std::io::stderr().lock();
        write!(
            stderr,
            "{diff}\n{} was modified locally. Overwrite with the new version? [y/N] ",
            relative.display()
        )
        .and_then(|_| stderr.flush())
        .map_err(prompt_err)?;

        let mut answer = String::new();
        stdin.lock().read_line(&mut answer).map_err(prompt_err)?;
        Ok(is_yes(&answer))
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
