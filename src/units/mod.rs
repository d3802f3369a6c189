//! Installable units and the fixed phase catalogue.
pub mod binary;
pub mod catalogue;
pub mod configs;
pub mod git;
pub mod package;
pub mod shell;
pub mod upstream;

use std::collections::BTreeMap;

use anyhow::Result;

pub use catalogue::{Phase, catalogue};

use crate::exec::Executor;
use crate::http::Transport;
use crate::logging::Log;
use crate::packages::PackageInstaller;
use crate::pipeline::{Pipeline, RetryPolicy};
use crate::platform::Environment;
use crate::prompt::Prompt;
use crate::settings::Settings;
use crate::state::Method;

/// Everything a unit needs to check and install itself.
pub struct Context<'a> {
    /// Run settings.
    pub settings: &'a Settings,
    /// Detected host.
    pub env: &'a Environment,
    /// Command runner.
    pub executor: &'a dyn Executor,
    /// Logger.
    pub log: &'a dyn Log,
    /// Confirmation prompts.
    pub prompt: &'a dyn Prompt,
    /// Package backend for the session.
    pub packages: PackageInstaller<'a>,
    /// Binary acquisition pipeline.
    pub pipeline: Pipeline<'a>,
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("env", &self.env)
            .field("packages", &self.packages)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl<'a> Context<'a> {
    /// Wire up a context.
    #[must_use]
    pub fn new(
        settings: &'a Settings,
        env: &'a Environment,
        executor: &'a dyn Executor,
        transport: &'a dyn Transport,
        log: &'a dyn Log,
        prompt: &'a dyn Prompt,
    ) -> Self {
        Self {
            settings,
            env,
            executor,
            log,
            prompt,
            packages: PackageInstaller::new(env, executor, log, settings.verbose),
            pipeline: Pipeline::new(env, executor, transport, log, settings),
        }
    }

    /// Replace the download retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.pipeline = self.pipeline.with_retry(retry);
        self
    }

    /// Whether `command` is on `PATH` or in the user bin directory.
    #[must_use]
    pub fn has_command(&self, command: &str) -> bool {
        self.executor.which(command).is_some() || self.settings.bin_dir.join(command).is_file()
    }
}

/// Result of a successful [`Unit::install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Something was installed; a tool record is written.
    Installed {
        /// Installed version.
        version: String,
        /// How it was installed.
        method: Method,
        /// Extra string fields for the record.
        extra: BTreeMap<String, String>,
    },
    /// Configuration was applied; no tool record is written.
    Configured(String),
    /// Nothing needed doing; the existing record is left alone.
    AlreadyPresent(String),
    /// The unit chose not to run.
    Skipped(String),
}

/// One installable item in a phase.
pub trait Unit: Send + Sync {
    /// Stable identifier, used as the state record key.
    fn id(&self) -> &str;

    /// Whether the unit is already in place; satisfied units are not
    /// installed and write no record.
    ///
    /// # Errors
    ///
    /// Returns an error if the check itself cannot run.
    fn is_satisfied(&self, ctx: &Context<'_>) -> Result<bool>;

    /// Install the unit.
    ///
    /// # Errors
    ///
    /// Returns an error if installation fails; the scheduler records it and
    /// moves on.
    fn install(&self, ctx: &Context<'_>) -> Result<UnitOutcome>;

    /// Presence check for the verification pass; `None` when the unit has
    /// nothing to verify.
    fn is_present(&self, ctx: &Context<'_>) -> Option<bool>;

    /// Whether `update` re-runs this unit.
    fn is_updatable(&self) -> bool {
        false
    }
}
