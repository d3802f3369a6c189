//! Command: re-run release-binary and upstream-installer units outside the
//! phase completion gate.
use anyhow::Result;

use super::{EXIT_FATAL, Session, install_interrupt_handler};
use crate::logging::UnitStatus;
use crate::scheduler::run_unit;
use crate::units::catalogue;

/// Run the update command and return the process exit code.
///
/// # Errors
///
/// Returns an error if the state document cannot be read or written.
pub fn run(session: &Session<'_>) -> Result<i32> {
    let log = session.log;
    let env = match session.detect() {
        Ok(env) => env,
        Err(e) => {
            log.error(&format!("{e}"));
            return Ok(EXIT_FATAL);
        }
    };

    let store = session.store();
    store.init()?;
    install_interrupt_handler(store.clone());

    let ctx = session.context(&env);
    let phases = catalogue();
    log.stage("Updating");
    let mut failures = 0usize;
    for unit in phases
        .iter()
        .flat_map(|p| p.units.iter())
        .filter(|u| u.is_updatable())
    {
        if run_unit(&ctx, &store, unit.as_ref(), false)? == UnitStatus::Failed {
            failures += 1;
        }
    }

    log.print_summary();
    store.clear_current_tool()?;
    Ok(if failures == 0 { 0 } else { 2 })
}
