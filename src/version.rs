//! Version resolution (pinned override or latest upstream release) and
//! generic version ordering.
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use crate::error::PipelineError;
use crate::exec::Executor;
use crate::http::Transport;

/// Dotted numeric version somewhere in a `--version` banner.
static VERSION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)+").ok());

/// Resolves the version to install for a tool.
///
/// Pinned versions win; otherwise the latest GitHub release tag is used.
/// Results are memoised for the lifetime of the resolver.
pub struct VersionResolver<'a> {
    transport: &'a dyn Transport,
    pinned: &'a BTreeMap<String, String>,
    resolved: RefCell<HashMap<String, String>>,
}

impl std::fmt::Debug for VersionResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionResolver")
            .field("pinned", &self.pinned)
            .finish_non_exhaustive()
    }
}

impl<'a> VersionResolver<'a> {
    /// Create a resolver.
    #[must_use]
    pub fn new(transport: &'a dyn Transport, pinned: &'a BTreeMap<String, String>) -> Self {
        Self {
            transport,
            pinned,
            resolved: RefCell::new(HashMap::new()),
        }
    }

    /// Version to install for `tool`, released from the GitHub `repo`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::VersionUnresolved`] if the release API fails
    /// or returns no usable tag.
    pub fn resolve(&self, tool: &str, repo: &str) -> Result<String, PipelineError> {
        if let Some(pin) = self.pinned.get(tool) {
            return Ok(normalize_tag(pin));
        }
        if let Some(hit) = self.resolved.borrow().get(tool) {
            return Ok(hit.clone());
        }

        let url = format!("https://api.github.com/repos/{repo}/releases/latest");
        let unresolved = |reason: String| PipelineError::VersionUnresolved {
            tool: tool.to_string(),
            reason,
        };
        let body = self
            .transport
            .get_text(&url, true)
            .map_err(|e| unresolved(e.to_string()))?;
        let tag = parse_tag_name(&body)
            .ok_or_else(|| unresolved("release response has no tag_name".to_string()))?;
        let version = normalize_tag(&tag);
        if version.is_empty() {
            return Err(unresolved(format!("unusable tag {tag:?}")));
        }
        self.resolved
            .borrow_mut()
            .insert(tool.to_string(), version.clone());
        Ok(version)
    }
}

/// Extract `tag_name` from a GitHub release JSON document.
#[must_use]
pub fn parse_tag_name(json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    value.get("tag_name")?.as_str().map(str::to_string)
}

/// Strip surrounding whitespace and a leading `v` from a release tag.
#[must_use]
pub fn normalize_tag(tag: &str) -> String {
    let tag = tag.trim();
    tag.strip_prefix('v').unwrap_or(tag).to_string()
}

/// First dotted numeric version in `text` (e.g. `ripgrep 14.1.0 (rev ...)`).
#[must_use]
pub fn extract_version(text: &str) -> Option<String> {
    VERSION_RE
        .as_ref()?
        .find(text)
        .map(|m| m.as_str().to_string())
}

/// Version of an installed command, parsed from `<command> --version`.
///
/// The command is looked up on `PATH` first, then in `bin_dir`, which need
/// not be on `PATH`.
#[must_use]
pub fn local_version(executor: &dyn Executor, command: &str, bin_dir: &Path) -> Option<String> {
    let program = if executor.which(command).is_some() {
        command.to_string()
    } else {
        let candidate = bin_dir.join(command);
        if !candidate.is_file() {
            return None;
        }
        candidate.to_string_lossy().into_owned()
    };
    let result = executor.run_unchecked(&program, &["--version"]).ok()?;
    extract_version(&result.stdout).or_else(|| extract_version(&result.stderr))
}

/// Compare two version strings by version ordering, not lexically.
///
/// Both sides are parsed as semver after padding to three components; if
/// either fails, dotted numeric segments are compared left to right.
#[must_use]
pub fn version_cmp(a: &str, b: &str) -> Ordering {
    match (as_semver(a), as_semver(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => numeric_segments(a).cmp(&numeric_segments(b)),
    }
}

/// Whether `installed` is at least `wanted`.
#[must_use]
pub fn is_satisfied(installed: &str, wanted: &str) -> bool {
    version_cmp(installed, wanted) != Ordering::Less
}

fn as_semver(raw: &str) -> Option<Version> {
    let raw = normalize_tag(raw);
    let (core, rest) = raw
        .find(['-', '+'])
        .map_or((raw.as_str(), ""), |i| raw.split_at(i));
    let parts = core.split('.').count();
    let padded = match parts {
        1 => format!("{core}.0.0{rest}"),
        2 => format!("{core}.0{rest}"),
        _ => format!("{core}{rest}"),
    };
    Version::parse(&padded).ok()
}

fn numeric_segments(raw: &str) -> Vec<u64> {
    raw.split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}
