//! Unit outcomes and the [`Log`] trait units write through.
use crate::error::PipelineError;

/// One line of the end-of-run summary.
#[derive(Debug, Clone)]
pub struct UnitEntry {
    /// Tool identifier.
    pub name: String,
    /// Final status of the unit.
    pub status: UnitStatus,
    /// Installed version, skip reason or error text.
    pub message: Option<String>,
}

/// How a unit finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    /// The unit installed something during this run.
    Ok,
    /// The unit was already satisfied; nothing was done.
    AlreadyInstalled,
    /// The unit was deliberately not run (e.g., opted out, version skip).
    Skipped,
    /// The unit failed; the error was recorded in the state document.
    Failed,
}

/// Logging surface handed to units and the scheduler.
pub trait Log: Send + Sync {
    /// Phase banner.
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Verbose-only on the console.
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Framed report for a failed pipeline stage.
    fn error_box(&self, unit: &str, err: &PipelineError) {
        for line in super::logger::error_box_lines(unit, err) {
            self.error(&line);
        }
    }
    /// Remember an outcome for the summary.
    fn record_unit(&self, name: &str, status: UnitStatus, message: Option<&str>);
}
