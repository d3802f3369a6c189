//! Console and file logging for command runs.
//!
//! Every message is routed through `tracing`. The console shows `info` and
//! above (or `debug` with `--verbose`); the per-command log file under the
//! cache directory always receives `debug` and above.

mod logger;
mod subscriber;
mod types;
mod utils;

pub use logger::{Logger, Tally, error_box_lines, summary_lines};
pub use subscriber::init_subscriber;
pub use types::{Log, UnitEntry, UnitStatus};

/// Logger whose events land in a temporary log file for the current thread.
///
/// Keep the returned guard alive while the test logs.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::layer::SubscriberExt as _;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("run.log");
    let layer = subscriber::FileLayer::at(&path).expect("open run.log");
    let dispatch = tracing::Dispatch::new(tracing_subscriber::registry().with(layer));
    let guard = tracing::dispatcher::set_default(&dispatch);
    (Logger::with_log_file(Some(path)), dir, guard)
}
