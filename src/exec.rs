//! External command execution behind an injectable [`Executor`] seam.
use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Abstraction over process execution so package backends, archive
/// extraction and version checks can be exercised without a real system.
///
/// Output is always captured; nothing from the child reaches the terminal.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a command, failing if it exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command with extra environment variables, failing if it exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or exits non-zero.
    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult>;

    /// Run a command and return its result even when it exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error only if the command cannot be spawned.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Resolve `program` on `PATH`.
    fn which(&self, program: &str) -> Option<PathBuf>;
}

/// [`Executor`] that spawns real processes and resolves `PATH` with `which`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl ExecResult {
    /// Turn a non-zero exit into an error naming `program`.
    fn require_success(self, program: &str) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let status = self
            .code
            .map_or_else(|| "killed by signal".to_owned(), |c| format!("exit {c}"));
        bail!("{program} failed ({status}): {}", self.stderr.trim())
    }
}

/// Spawn `program` with captured output and wait for it.
fn spawn(program: &str, args: &[&str], env: &[(&str, &str)]) -> Result<ExecResult> {
    Command::new(program)
        .args(args)
        .envs(env.iter().copied())
        .output()
        .map(ExecResult::from)
        .with_context(|| format!("could not start {program}"))
}

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        spawn(program, args, &[])?.require_success(program)
    }

    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        spawn(program, args, env)?.require_success(program)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        spawn(program, args, &[])
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}
