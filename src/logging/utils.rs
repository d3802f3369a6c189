//! Log file placement, timestamps and escape-code removal.
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

/// CSI sequences (colours, cursor movement, erase) and bare two-byte escapes.
static ESCAPES: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|[@-Z\\-_])").ok());

/// Remove terminal escape sequences so log files stay plain text.
pub(super) fn strip_ansi(s: &str) -> Cow<'_, str> {
    ESCAPES
        .as_ref()
        .map_or(Cow::Borrowed(s), |re| re.replace_all(s, ""))
}

/// Directory log files live in, from an arbitrary variable lookup.
fn log_dir_from(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    let non_empty = |var: &str| lookup(var).filter(|v| !v.is_empty()).map(PathBuf::from);
    non_empty("XDG_CACHE_HOME")
        .or_else(|| non_empty("HOME").map(|h| h.join(".cache")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("devsetup")
}

/// `$XDG_CACHE_HOME/devsetup/<command>.log`, creating the directory.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let dir = log_dir_from(|var| std::env::var(var).ok());
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Wall-clock stamp for one log line.
pub(super) fn line_stamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}

/// RFC 3339 stamp for the run header.
pub(super) fn run_stamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
