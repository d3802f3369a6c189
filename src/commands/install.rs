//! Command: run every incomplete phase.
use anyhow::Result;

use super::{EXIT_FATAL, Session, install_interrupt_handler};
use crate::scheduler::Scheduler;
use crate::units::catalogue;

/// Run the install command and return the process exit code.
///
/// # Errors
///
/// Returns an error if the state document cannot be read or written.
pub fn run(session: &Session<'_>) -> Result<i32> {
    let log = session.log;
    log.info(&format!("devsetup {}", super::program_version()));

    let env = match session.detect() {
        Ok(env) => env,
        Err(e) => {
            log.error(&format!("{e}"));
            return Ok(EXIT_FATAL);
        }
    };
    log.info(&format!("environment: {env}"));

    let store = session.store();
    if !store.path().exists()
        && !session
            .prompt
            .confirm("Set up the development environment on this machine?", true)
    {
        log.info("aborted; nothing was changed");
        return Ok(0);
    }
    if store.init()? {
        log.info(&format!("created state file {}", store.path().display()));
    }
    install_interrupt_handler(store.clone());

    let phases = catalogue();
    let ctx = session.context(&env);
    let report = Scheduler::new(&ctx, &store, &phases).run()?;

    log.print_summary();
    log.info(&format!(
        "{} tools recorded installed, {} failed",
        store.count_installed()?,
        store.count_failed()?
    ));

    let code = report.exit_code();
    if code == 0 || code == 2 {
        store.clear_current_tool()?;
    }
    Ok(code)
}
