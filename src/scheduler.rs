//! Ordered phase execution with resume reporting and per-unit failure
//! isolation.
use crate::error::{PipelineError, StateError};
use crate::logging::UnitStatus;
use crate::state::StateStore;
use crate::units::{Context, Phase, Unit, UnitOutcome};

/// Aggregate result of one scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Units whose install failed during this run.
    pub failures: usize,
    /// Units the verification pass could not find.
    pub missing: Vec<String>,
}

impl RunReport {
    /// Process exit code: 0 when nothing failed, 2 otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.failures == 0 { 0 } else { 2 }
    }
}

/// Run one unit: short-circuit when satisfied, otherwise install it under the
/// in-progress marker and record the outcome.
///
/// `check_satisfied` is false for `update`, which re-installs regardless.
/// Unit errors are logged and recorded; only state store errors propagate.
///
/// # Errors
///
/// Returns [`StateError`] if the state document cannot be updated.
pub fn run_unit(
    ctx: &Context<'_>,
    store: &StateStore,
    unit: &dyn Unit,
    check_satisfied: bool,
) -> Result<UnitStatus, StateError> {
    let id = unit.id();
    if check_satisfied {
        match unit.is_satisfied(ctx) {
            Ok(true) => {
                ctx.log.debug(&format!("{id}: already satisfied"));
                ctx.log.record_unit(id, UnitStatus::AlreadyInstalled, None);
                return Ok(UnitStatus::AlreadyInstalled);
            }
            Ok(false) => {}
            Err(e) => ctx.log.debug(&format!("{id}: check failed, installing: {e:#}")),
        }
    }

    store.set_current_tool(id)?;
    ctx.log.info(&format!("installing {id}"));
    let status = match unit.install(ctx) {
        Ok(UnitOutcome::Installed {
            version,
            method,
            extra,
        }) => {
            store.record_tool_success(id, &version, method, extra)?;
            ctx.log.info(&format!("{id} {version} installed via {method}"));
            ctx.log.record_unit(id, UnitStatus::Ok, Some(&version));
            UnitStatus::Ok
        }
        Ok(UnitOutcome::Configured(detail)) => {
            ctx.log.info(&format!("{id}: {detail}"));
            ctx.log.record_unit(id, UnitStatus::Ok, Some(&detail));
            UnitStatus::Ok
        }
        Ok(UnitOutcome::AlreadyPresent(version)) => {
            ctx.log.info(&format!("{id} {version} already present"));
            ctx.log
                .record_unit(id, UnitStatus::AlreadyInstalled, Some(&version));
            UnitStatus::AlreadyInstalled
        }
        Ok(UnitOutcome::Skipped(reason)) => {
            ctx.log.info(&format!("{id}: skipped: {reason}"));
            ctx.log.record_unit(id, UnitStatus::Skipped, Some(&reason));
            UnitStatus::Skipped
        }
        Err(e) => {
            if let Some(pe) = e.downcast_ref::<PipelineError>() {
                ctx.log.error_box(id, pe);
            } else {
                ctx.log.error(&format!("{id}: {e:#}"));
            }
            let message = format!("{e:#}");
            store.record_tool_failed(id, &message)?;
            ctx.log.record_unit(id, UnitStatus::Failed, Some(&message));
            UnitStatus::Failed
        }
    };
    store.clear_current_tool()?;
    Ok(status)
}

/// Drives the phase catalogue against the state store.
#[derive(Debug)]
pub struct Scheduler<'a> {
    ctx: &'a Context<'a>,
    store: &'a StateStore,
    phases: &'a [Phase],
}

impl<'a> Scheduler<'a> {
    /// Schedule `phases` against `store`.
    #[must_use]
    pub const fn new(ctx: &'a Context<'a>, store: &'a StateStore, phases: &'a [Phase]) -> Self {
        Self { ctx, store, phases }
    }

    /// Run every incomplete phase, then the verification pass.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the state document cannot be read or written.
    pub fn run(&self) -> Result<RunReport, StateError> {
        self.report_resume()?;

        let mut failures = 0;
        for phase in self.phases {
            if self.store.is_phase_complete(phase.index)? {
                self.ctx
                    .log
                    .debug(&format!("phase {} ({}) already complete", phase.index, phase.name));
                continue;
            }
            self.store.begin_phase(phase.index)?;
            self.ctx.log.stage(phase.name);
            for unit in &phase.units {
                if run_unit(self.ctx, self.store, unit.as_ref(), true)? == UnitStatus::Failed {
                    failures += 1;
                }
            }
            self.store.complete_phase(phase.index)?;
        }

        let missing = self.verify();
        Ok(RunReport { failures, missing })
    }

    /// Warn about an interrupted previous run and return the message.
    fn report_resume(&self) -> Result<Option<String>, StateError> {
        if !self.store.is_resume()? {
            return Ok(None);
        }
        let doc = self.store.load()?;
        let tool = doc.current_tool.unwrap_or_default();
        let index = self
            .phases
            .iter()
            .find(|p| p.contains(&tool))
            .map_or(self.store.resume_phase()?, |p| p.index);
        let name = self
            .phases
            .iter()
            .find(|p| p.index == index)
            .map_or("unknown", |p| p.name);
        let msg = format!(
            "previous run was interrupted while installing {tool} (phase {index}: {name}); resuming"
        );
        self.ctx.log.warn(&msg);
        Ok(Some(msg))
    }

    /// Re-check presence of every unit that has something to check.
    fn verify(&self) -> Vec<String> {
        self.ctx.log.stage("Verifying");
        let missing: Vec<String> = self
            .phases
            .iter()
            .flat_map(|p| p.units.iter())
            .filter(|u| u.is_present(self.ctx) == Some(false))
            .map(|u| u.id().to_string())
            .collect();
        if missing.is_empty() {
            self.ctx.log.info("all expected tools are present");
        } else {
            self.ctx.log.warn(&format!(
                "{} tool(s) missing: {}",
                missing.len(),
                missing.join(", ")
            ));
        }
        missing
    }
}
