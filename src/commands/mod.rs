//! Top-level subcommand orchestration.
pub mod doctor;
pub mod install;
pub mod status;
pub mod update;
pub mod version;

use anyhow::Result;

use crate::cli::{Cli, Command};
use crate::error::PlatformError;
use crate::exec::{Executor, SystemExecutor};
use crate::http::{Transport, UreqTransport};
use crate::logging::{Logger, init_subscriber};
use crate::pipeline::RetryPolicy;
use crate::platform::Environment;
use crate::prompt::{Prompt, TerminalPrompt};
use crate::settings::Settings;
use crate::state::StateStore;
use crate::units::Context;

/// Exit code for fatal preconditions.
pub const EXIT_FATAL: i32 = 1;

/// Exit code after SIGINT/SIGTERM.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Program version, preferring the value stamped by the build script.
#[must_use]
pub fn program_version() -> &'static str {
    option_env!("DEVSETUP_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Collaborators shared by every command.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    /// Run settings.
    pub settings: &'a Settings,
    /// Command runner.
    pub executor: &'a dyn Executor,
    /// HTTP client.
    pub transport: &'a dyn Transport,
    /// Logger collecting the run summary.
    pub log: &'a Logger,
    /// Confirmation prompts.
    pub prompt: &'a dyn Prompt,
    /// Download retry policy.
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("settings", &self.settings)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<'a> Session<'a> {
    /// State store at the configured path.
    #[must_use]
    pub fn store(&self) -> StateStore {
        StateStore::new(self.settings.state_path.clone(), program_version())
    }

    /// Detect the host environment.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] for unsupported hosts.
    pub fn detect(&self) -> Result<Environment, PlatformError> {
        let env = Environment::detect(self.executor)?;
        self.log.debug(&format!("environment: {env}"));
        Ok(env)
    }

    /// Unit context over `env`.
    #[must_use]
    pub fn context(&self, env: &'a Environment) -> Context<'a> {
        Context::new(
            self.settings,
            env,
            self.executor,
            self.transport,
            self.log,
            self.prompt,
        )
        .with_retry(self.retry)
    }
}

/// What to tell the user when a run is interrupted.
///
/// Only reads the state document. The phase cursor and `current_tool` were
/// persisted by the scheduler before the unit started, and the main thread
/// may still be writing, so the handler must not write.
pub(crate) fn interrupt_notice(store: &StateStore) -> String {
    match store.load() {
        Ok(doc) => format!(
            "interrupted during phase {} (tool: {}); run again to resume",
            doc.current_phase,
            doc.current_tool.as_deref().unwrap_or("none")
        ),
        Err(e) => format!("interrupted; state unavailable: {e}"),
    }
}

/// Exit with [`EXIT_INTERRUPTED`] on SIGINT or SIGTERM, leaving
/// `current_tool` set so the next run reports the resume.
pub(crate) fn install_interrupt_handler(store: StateStore) {
    let result = ctrlc::set_handler(move || {
        tracing::warn!("{}", interrupt_notice(&store));
        std::process::exit(EXIT_INTERRUPTED);
    });
    if let Err(e) = result {
        tracing::debug!("interrupt handler not installed: {e}");
    }
}

/// Run the parsed command line against the real system and return the
/// process exit code.
#[must_use]
pub fn dispatch(args: &Cli) -> i32 {
    let command = args.command.unwrap_or(Command::Install);
    if args.show_version || command == Command::Version {
        version::run();
        return 0;
    }

    let settings = Settings::load(args.root.clone(), args.verbose);
    let verbose = settings.as_ref().map_or(args.verbose, |s| s.verbose);
    init_subscriber(verbose, command.name());
    let log = Logger::new(command.name());
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            log.error(&format!("{e:#}"));
            return EXIT_FATAL;
        }
    };

    let executor = SystemExecutor;
    let transport = UreqTransport::new(settings.github_token.clone());
    let prompt = TerminalPrompt::new(settings.assume_yes);
    let session = Session {
        settings: &settings,
        executor: &executor,
        transport: &transport,
        log: &log,
        prompt: &prompt,
        retry: RetryPolicy::default(),
    };

    let result = match command {
        Command::Install => install::run(&session),
        Command::Doctor => doctor::run(&session),
        Command::Status => status::run(&session),
        Command::Update => update::run(&session),
        Command::Version => {
            version::run();
            Ok(0)
        }
    };
    result.unwrap_or_else(|e| {
        log.error(&format!("{e:#}"));
        EXIT_FATAL
    })
}
