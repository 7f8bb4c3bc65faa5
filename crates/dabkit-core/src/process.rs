//! Blocking external command execution.
//!
//! Every wrapper in this crate funnels through [`CommandSpec::run`], which
//! captures stdout/stderr, records timing, and keeps secrets out of the
//! recorded command line.

use std::fmt;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DabError, Result, format_exit};
use crate::secret::{ExposeSecret, SecretString, scrub};

/// A command to run, built up before execution.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    env_remove: Vec<String>,
    stdin: Option<SecretString>,
    secrets: Vec<SecretString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            env_remove: Vec::new(),
            stdin: None,
            secrets: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_remove.push(key.into());
        self
    }

    /// Feed a secret to the child's stdin. The value is also redacted from
    /// any recorded output.
    pub fn stdin_secret(mut self, secret: SecretString) -> Self {
        self.secrets.push(secret.clone());
        self.stdin = Some(secret);
        self
    }

    /// Redact `secret` from the recorded command line and captured output.
    pub fn redact(mut self, secret: SecretString) -> Self {
        self.secrets.push(secret);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Render the command line for logs, with secrets replaced.
    pub fn display(&self) -> String {
        let mut parts = vec![quote(&self.program.to_string_lossy())];
        parts.extend(self.args.iter().map(|a| quote(a)));
        self.scrub(&parts.join(" "))
    }

    fn scrub(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, secret| scrub(secret, &acc))
    }

    /// Run the command to completion.
    ///
    /// A non-zero exit is not an error here; inspect
    /// [`CommandOutcome::success`] or call [`CommandOutcome::ensure_success`].
    pub fn run(&self) -> Result<CommandOutcome> {
        let command_line = self.display();
        tracing::debug!(command = %command_line, cwd = ?self.cwd, "running command");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        for key in &self.env_remove {
            cmd.env_remove(key);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.stdin(if self.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let started_at = Utc::now();
        let timer = Instant::now();

        let spawn_err = |source| DabError::Spawn {
            program: self.program.display().to_string(),
            source,
        };
        let mut child = cmd.spawn().map_err(spawn_err)?;

        if let Some(input) = &self.stdin {
            if let Some(mut pipe) = child.stdin.take() {
                // The child may exit without reading stdin; its status is
                // still collected below.
                match write_line(&mut pipe, input.expose_secret()) {
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                        tracing::debug!("child closed stdin before reading the secret");
                    }
                    other => other?,
                }
            }
        }

        let output = child.wait_with_output()?;
        let duration_ms = u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX);

        let outcome = CommandOutcome {
            command: command_line,
            exit_code: output.status.code(),
            stdout: self.scrub(&String::from_utf8_lossy(&output.stdout)),
            stderr: self.scrub(&String::from_utf8_lossy(&output.stderr)),
            started_at,
            duration_ms,
        };

        if outcome.success() {
            tracing::info!(command = %outcome.command, duration_ms, "command succeeded");
        } else {
            tracing::warn!(
                command = %outcome.command,
                exit_code = ?outcome.exit_code,
                "command failed"
            );
        }

        Ok(outcome)
    }
}

fn write_line(pipe: &mut impl Write, line: &str) -> std::io::Result<()> {
    pipe.write_all(line.as_bytes())?;
    pipe.write_all(b"\n")
}

fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@+,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    /// Command line as run, with secrets redacted
    pub command: String,
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Standard output followed by standard error, newline-separated.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// Convert a non-zero exit into [`DabError::CommandFailed`].
    pub fn ensure_success(self) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        Err(DabError::CommandFailed {
            output: self.combined().trim().to_string(),
            command: self.command,
            exit_code: self.exit_code,
        })
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "`{}` exited with {}",
            self.command,
            format_exit(&self.exit_code)
        )?;
        write!(f, "{}", self.combined().trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let spec = CommandSpec::new("git").args(["commit", "-m", "initial commit"]);
        assert_eq!(spec.display(), "git commit -m 'initial commit'");
    }

    #[test]
    fn display_redacts_secrets() {
        let spec = CommandSpec::new("tool")
            .arg("--token=abc123")
            .redact(SecretString::from("abc123".to_string()));
        assert_eq!(spec.display(), "tool --token=****");
    }

    #[cfg(unix)]
    #[test]
    fn run_captures_stdout_and_exit_code() {
        let outcome = CommandSpec::new("sh")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .run()
            .unwrap();

        assert_eq!(outcome.exit_code, Some(3));
        assert!(!outcome.success());
        assert_eq!(outcome.stdout.trim(), "out");
        assert_eq!(outcome.stderr.trim(), "err");
        assert_eq!(outcome.combined(), "out\n\nerr\n");
    }

    #[cfg(unix)]
    #[test]
    fn run_feeds_stdin_and_scrubs_echoed_secret() {
        let outcome = CommandSpec::new("sh")
            .args(["-c", "read token; echo \"got $token\""])
            .stdin_secret(SecretString::from("s3cr3t".to_string()))
            .run()
            .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.stdout.trim(), "got ****");
        assert!(!outcome.command.contains("s3cr3t"));
    }

    #[cfg(unix)]
    #[test]
    fn child_closing_stdin_still_yields_outcome() {
        for _ in 0..50 {
            let outcome = CommandSpec::new("sh")
                .args(["-c", "exec 0<&-; echo 'Error: invalid host' >&2; exit 2"])
                .stdin_secret(SecretString::from("dapi-closed-stdin".to_string()))
                .run()
                .unwrap();

            assert_eq!(outcome.exit_code, Some(2));
            assert_eq!(outcome.stderr.trim(), "Error: invalid host");
        }
    }

    #[test]
    fn run_missing_program_is_spawn_error() {
        let err = CommandSpec::new("/nonexistent/dabkit-test-binary")
            .run()
            .unwrap_err();
        assert!(matches!(err, DabError::Spawn { .. }));
    }

    #[test]
    fn ensure_success_maps_failure() {
        let outcome = CommandOutcome {
            command: "databricks bundle deploy".to_string(),
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "Error: conflict".to_string(),
            started_at: Utc::now(),
            duration_ms: 5,
        };

        let err = outcome.ensure_success().unwrap_err();
        match err {
            DabError::CommandFailed {
                command,
                exit_code,
                output,
            } => {
                assert_eq!(command, "databricks bundle deploy");
                assert_eq!(exit_code, Some(1));
                assert_eq!(output, "Error: conflict");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
