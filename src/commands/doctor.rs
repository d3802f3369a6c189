//! Command: check prerequisites without changing anything.
use std::ffi::OsStr;
use std::path::Path;

use anyhow::Result;

use super::{EXIT_FATAL, Session};

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// What was checked.
    pub name: &'static str,
    /// Whether the check passed.
    pub passed: bool,
    /// Detail shown next to the name.
    pub detail: String,
}

impl Check {
    fn new(name: &'static str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed,
            detail: detail.into(),
        }
    }
}

/// Whether `bin_dir` is one of the entries of a `PATH`-style value.
#[must_use]
pub fn bin_dir_on_path(bin_dir: &Path, path: &OsStr) -> bool {
    std::env::split_paths(path).any(|p| p == bin_dir)
}

/// Run every check; `path` is the `PATH` value to inspect.
#[must_use]
pub fn checks(session: &Session<'_>, path: &OsStr) -> Vec<Check> {
    let mut out = Vec::new();
    let env = session.detect();
    match &env {
        Ok(env) => out.push(Check::new("environment", true, env.to_string())),
        Err(e) => out.push(Check::new("environment", false, e.to_string())),
    }

    let mut required = vec!["tar", "unzip"];
    if env.as_ref().is_ok_and(|e| !e.is_root) {
        required.push("sudo");
    }
    for tool in required {
        let found = session.executor.which(tool);
        out.push(Check::new(
            "command",
            found.is_some(),
            found.map_or_else(
                || format!("{tool} not found on PATH"),
                |p| format!("{tool} at {}", p.display()),
            ),
        ));
    }

    let bin_dir = &session.settings.bin_dir;
    let on_path = bin_dir_on_path(bin_dir, path);
    out.push(Check::new(
        "bin dir",
        on_path,
        if on_path {
            format!("{} is on PATH", bin_dir.display())
        } else {
            format!("add {} to PATH", bin_dir.display())
        },
    ));

    let store = session.store();
    match store.load() {
        Ok(doc) if store.path().exists() => out.push(Check::new(
            "state",
            true,
            format!("{} ({} tools recorded)", store.path().display(), doc.tools.len()),
        )),
        Ok(_) => out.push(Check::new(
            "state",
            true,
            format!("{} not created yet", store.path().display()),
        )),
        Err(e) => out.push(Check::new("state", false, e.to_string())),
    }
    out
}

/// Run the doctor command: 0 when every check passes, 1 otherwise.
///
/// # Errors
///
/// Never fails; the signature matches the other commands.
pub fn run(session: &Session<'_>) -> Result<i32> {
    let log = session.log;
    log.stage("Checking prerequisites");
    let path = std::env::var_os("PATH").unwrap_or_default();
    let results = checks(session, &path);
    for check in &results {
        if check.passed {
            log.info(&format!("\x1b[32m✓\x1b[0m {}: {}", check.name, check.detail));
        } else {
            log.warn(&format!("✗ {}: {}", check.name, check.detail));
        }
    }

    // Informational only: unauthenticated API requests still work.
    if session.settings.github_token.is_some() {
        log.info("GITHUB_TOKEN is set; API requests are authenticated");
    } else {
        log.info("GITHUB_TOKEN is not set; GitHub API requests are rate limited");
    }

    let failed = results.iter().filter(|c| !c.passed).count();
    if failed == 0 {
        log.info("everything looks good");
        Ok(0)
    } else {
        log.warn(&format!("{failed} check(s) failed"));
        Ok(EXIT_FATAL)
    }
}
