//! Confirmation prompts for destructive commands.
//!
//! `destroy` and `cleanup` cannot be undone, so they print what is about to
//! happen and ask before proceeding unless `--yes` was passed. The summary
//! goes to stderr so stdout stays machine-readable.

use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};

/// What a destructive command is about to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destruction<'a> {
    /// `bundle destroy` against a target
    Deployment { project: &'a str, target: &'a str },
    /// Deleting the local working directory; `None` for one not created yet
    WorkingDirectory { directory: Option<&'a Path> },
}

/// Asks before destructive operations.
pub struct Confirmation<W: Write = io::Stderr> {
    /// Skip prompts (`--yes`)
    assume_yes: bool,
    /// Print the summary even when no prompt follows
    verbose: bool,
    /// Output writer (for testing)
    writer: W,
    theme: ColorfulTheme,
}

impl Confirmation<io::Stderr> {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            verbose: true,
            writer: io::stderr(),
            theme: ColorfulTheme::default(),
        }
    }
}

impl<W: Write> Confirmation<W> {
    /// Create a confirmation with custom writer (for testing).
    #[cfg(test)]
    pub fn with_writer(assume_yes: bool, writer: W) -> Self {
        Self {
            assume_yes,
            verbose: true,
            writer,
            theme: ColorfulTheme::default(),
        }
    }

    /// Whether to print the summary when `--yes` skips the prompt.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Print a summary of `what` and ask whether to go ahead.
    pub fn confirm(&mut self, what: &Destruction<'_>) -> Result<bool> {
        if self.assume_yes && !self.verbose {
            return Ok(true);
        }

        writeln!(self.writer)?;
        match what {
            Destruction::Deployment { project, target } => {
                writeln!(
                    self.writer,
                    "  {} every resource deployed by bundle {} to target {}",
                    style("Destroy").bold().red(),
                    style(project).green(),
                    style(target).green()
                )?;
            }
            Destruction::WorkingDirectory {
                directory: Some(directory),
            } => {
                writeln!(
                    self.writer,
                    "  {} {} and everything in it",
                    style("Delete").bold().red(),
                    style(directory.display()).green()
                )?;
            }
            Destruction::WorkingDirectory { directory: None } => {
                writeln!(
                    self.writer,
                    "  {} the new working directory once the run succeeds",
                    style("Delete").bold().red()
                )?;
            }
        }
        writeln!(self.writer)?;

        if self.assume_yes {
            return Ok(true);
        }

        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt("This cannot be undone. Continue?")
            .default(false)
            .interact()?;

        Ok(confirmed)
    }
}
