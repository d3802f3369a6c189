//! The [`Logger`] handed to units: forwards to `tracing` and keeps the
//! per-unit outcomes for the end-of-run summary.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::subscriber::STAGE_TARGET;
use super::types::{Log, UnitEntry, UnitStatus};
use super::utils::log_file_path;
use crate::error::PipelineError;

/// Console and file logger for one command invocation.
///
/// Output itself goes through the global subscriber; the logger only
/// remembers where the log file lives so the summary can point at it.
#[derive(Debug)]
pub struct Logger {
    entries: Mutex<Vec<UnitEntry>>,
    log_file: Option<PathBuf>,
}

/// Outcome counts over a set of unit entries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    /// Units that installed or configured something.
    pub installed: usize,
    /// Units that were already satisfied.
    pub present: usize,
    /// Units that chose not to act.
    pub skipped: usize,
    /// Units that failed.
    pub failed: usize,
}

impl Tally {
    fn of(entries: &[UnitEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut t, e| {
            match e.status {
                UnitStatus::Ok => t.installed += 1,
                UnitStatus::AlreadyInstalled => t.present += 1,
                UnitStatus::Skipped => t.skipped += 1,
                UnitStatus::Failed => t.failed += 1,
            }
            t
        })
    }

    const fn total(self) -> usize {
        self.installed + self.present + self.skipped + self.failed
    }
}

impl Logger {
    /// Logger for `command`, pointing at its file under the cache directory.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(log_file_path(command))
    }

    /// Logger that reports `log_file` (if any) in its summary.
    #[must_use]
    pub const fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Where this run's log is written.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Snapshot of the recorded outcomes, in recording order.
    #[must_use]
    pub fn entries(&self) -> Vec<UnitEntry> {
        self.entries.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Counts over the recorded outcomes.
    #[must_use]
    pub fn tally(&self) -> Tally {
        Tally::of(&self.entries())
    }

    /// Log an error.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Phase banner.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log progress.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Hidden on the console unless `--verbose`; always in the log file.
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Remember a unit outcome for the summary.
    pub fn record_unit(&self, name: &str, status: UnitStatus, message: Option<&str>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(UnitEntry {
                name: name.to_owned(),
                status,
                message: message.map(str::to_owned),
            });
        }
    }

    /// Emit the per-unit list and totals. Does nothing if no unit ran.
    pub fn print_summary(&self) {
        let entries = self.entries();
        if entries.is_empty() {
            return;
        }
        self.stage("Summary");
        for line in summary_lines(&entries) {
            self.info(&line);
        }
        if let Some(path) = self.log_path() {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

const fn marker(status: UnitStatus) -> (&'static str, &'static str) {
    match status {
        UnitStatus::Ok => ("✓", "32"),
        UnitStatus::AlreadyInstalled => ("·", "2"),
        UnitStatus::Skipped => ("○", "33"),
        UnitStatus::Failed => ("✗", "31"),
    }
}

/// Summary body: one coloured line per unit followed by the totals.
#[must_use]
pub fn summary_lines(entries: &[UnitEntry]) -> Vec<String> {
    let mut lines: Vec<String> = entries
        .iter()
        .map(|e| {
            let (icon, colour) = marker(e.status);
            let detail = e.message.as_deref().map(|m| format!(" ({m})")).unwrap_or_default();
            format!("\x1b[{colour}m{icon} {}{detail}\x1b[0m", e.name)
        })
        .collect();
    let t = Tally::of(entries);
    lines.push(format!(
        "{} units: {} installed, {} present, {} skipped, {} failed",
        t.total(),
        t.installed,
        t.present,
        t.skipped,
        t.failed
    ));
    lines
}

/// Lines of the framed report shown when a pipeline stage fails.
#[must_use]
pub fn error_box_lines(unit: &str, err: &PipelineError) -> Vec<String> {
    let mut lines = vec![
        format!("┌─ {unit}: {} failed", err.component()),
        format!("│ operation: {}", err.operation()),
        format!("│ {err}"),
    ];
    let suggestions = err.suggestions();
    if !suggestions.is_empty() {
        lines.push("│ try:".to_owned());
        for (n, s) in (1..).zip(suggestions.iter()) {
            lines.push(format!("│   {n}. {s}"));
        }
    }
    lines.push("└─".to_owned());
    lines
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        Self::stage(self, msg);
    }

    fn info(&self, msg: &str) {
        Self::info(self, msg);
    }

    fn debug(&self, msg: &str) {
        Self::debug(self, msg);
    }

    fn warn(&self, msg: &str) {
        Self::warn(self, msg);
    }

    fn error(&self, msg: &str) {
        Self::error(self, msg);
    }

    fn record_unit(&self, name: &str, status: UnitStatus, message: Option<&str>) {
        Self::record_unit(self, name, status, message);
    }
}
