//! Session-scoped package installer over the detected backend.
use std::cell::Cell;

use anyhow::Result;

use super::{CommandLine, PackageManager};
use crate::error::PackageError;
use crate::exec::{ExecResult, Executor};
use crate::logging::Log;
use crate::platform::Environment;

/// Result of a successful [`PackageInstaller::install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOutcome {
    /// The package was present before the call.
    AlreadyInstalled {
        /// Installed version, or `unknown`.
        version: String,
    },
    /// The package was installed by the call.
    Installed {
        /// Installed version, or `unknown`.
        version: String,
    },
}

impl PackageOutcome {
    /// Installed version regardless of who installed it.
    #[must_use]
    pub fn version(&self) -> &str {
        match self {
            Self::AlreadyInstalled { version } | Self::Installed { version } => version,
        }
    }
}

/// Installs packages through the environment's package manager.
///
/// The index is refreshed at most once per installer, before the first
/// install that actually has work to do.
pub struct PackageInstaller<'a> {
    env: &'a Environment,
    executor: &'a dyn Executor,
    log: &'a dyn Log,
    verbose: bool,
    refreshed: Cell<bool>,
}

impl std::fmt::Debug for PackageInstaller<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageInstaller")
            .field("manager", &self.env.package_manager)
            .field("refreshed", &self.refreshed.get())
            .finish_non_exhaustive()
    }
}

impl<'a> PackageInstaller<'a> {
    /// Create an installer; `verbose` forwards captured output to debug logging.
    #[must_use]
    pub const fn new(
        env: &'a Environment,
        executor: &'a dyn Executor,
        log: &'a dyn Log,
        verbose: bool,
    ) -> Self {
        Self {
            env,
            executor,
            log,
            verbose,
            refreshed: Cell::new(false),
        }
    }

    /// The backend in use.
    #[must_use]
    pub const fn manager(&self) -> PackageManager {
        self.env.package_manager
    }

    /// Whether `package` is installed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query command cannot be spawned.
    pub fn is_installed(&self, package: &str) -> Result<bool> {
        let pm = self.manager();
        let cmd = pm.query_command(package);
        let args: Vec<&str> = cmd.args.iter().map(String::as_str).collect();
        let result = self.executor.run_unchecked(cmd.program, &args)?;
        Ok(pm.query_says_installed(result.success, &result.stdout))
    }

    /// Installed version of `package`, if the backend reports one.
    #[must_use]
    pub fn installed_version(&self, package: &str) -> Option<String> {
        let pm = self.manager();
        let cmd = pm.version_command(package);
        let args: Vec<&str> = cmd.args.iter().map(String::as_str).collect();
        let result = self.executor.run_unchecked(cmd.program, &args).ok()?;
        if !result.success {
            return None;
        }
        pm.parse_version(&result.stdout)
    }

    /// Install `package`, skipping work if it is already present.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::InstallFailed`] if the manager exits non-zero.
    pub fn install(&self, package: &str, display: &str) -> Result<PackageOutcome> {
        if self.is_installed(package)? {
            let version = self.version_or_unknown(package);
            self.log
                .debug(&format!("{display}: {package} already installed ({version})"));
            return Ok(PackageOutcome::AlreadyInstalled { version });
        }

        self.ensure_refreshed();
        self.log
            .info(&format!("installing {display} via {}", self.manager()));
        self.run_privileged(self.manager().install_command(package))
            .map_err(|e| PackageError::InstallFailed {
                package: package.to_string(),
                manager: self.manager().to_string(),
                reason: last_line(&format!("{e:#}")),
            })?;

        Ok(PackageOutcome::Installed {
            version: self.version_or_unknown(package),
        })
    }

    fn version_or_unknown(&self, package: &str) -> String {
        self.installed_version(package)
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn ensure_refreshed(&self) {
        if self.refreshed.replace(true) {
            return;
        }
        self.log
            .debug(&format!("refreshing {} package index", self.manager()));
        if let Err(e) = self.run_privileged(self.manager().refresh_command()) {
            let err = PackageError::RefreshFailed {
                manager: self.manager().to_string(),
                reason: last_line(&format!("{e:#}")),
            };
            self.log.warn(&err.to_string());
        }
    }

    fn run_privileged(&self, cmd: CommandLine) -> Result<ExecResult> {
        let cmd = if self.manager().is_privileged() && !self.env.is_root {
            cmd.with_sudo()
        } else {
            cmd
        };
        let args: Vec<&str> = cmd.args.iter().map(String::as_str).collect();
        let result = self.executor.run_with_env(cmd.program, &args, &cmd.env)?;
        if self.verbose {
            for line in result.stdout.lines().chain(result.stderr.lines()) {
                self.log.debug(line);
            }
        }
        Ok(result)
    }
}

/// Last non-empty line of a possibly multi-line message.
fn last_line(msg: &str) -> String {
    msg.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or(msg)
        .trim()
        .to_string()
}
