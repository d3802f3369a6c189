//! Persisted run state: phase completion, per-tool outcomes and the
//! in-progress marker used for resume detection.
//!
//! Every mutation reads the whole document, applies one change in memory and
//! swaps the result into place through a temporary file in the same
//! directory. Only one writer is supported; concurrent invocations against the
//! same state path are undefined.
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::StateError;
use crate::packages::PackageManager;

/// How a tool ended up on the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Debian/Ubuntu packages.
    Apt,
    /// Fedora packages.
    Dnf,
    /// Arch Linux packages.
    Pacman,
    /// Homebrew formulae.
    Brew,
    /// Verified release artifact copied into the bin directory.
    Binary,
    /// Shallow git clone.
    Git,
    /// Upstream installer program.
    Upstream,
}

impl From<PackageManager> for Method {
    fn from(pm: PackageManager) -> Self {
        match pm {
            PackageManager::Apt => Self::Apt,
            PackageManager::Dnf => Self::Dnf,
            PackageManager::Pacman => Self::Pacman,
            PackageManager::Brew => Self::Brew,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Apt => "apt",
            Self::Dnf => "dnf",
            Self::Pacman => "pacman",
            Self::Brew => "brew",
            Self::Binary => "binary",
            Self::Git => "git",
            Self::Upstream => "upstream",
        };
        f.write_str(s)
    }
}

/// Outcome of the most recent install attempt for one tool.
///
/// Serialized flat as `{installed: true, version, method, installed_at, ...}`
/// or `{installed: false, error, failed_at}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawToolRecord", into = "RawToolRecord")]
pub enum ToolRecord {
    /// The tool is installed.
    Installed {
        /// Installed version, as reported by the backend or resolver.
        version: String,
        /// Installation method.
        method: Method,
        /// RFC 3339 timestamp.
        installed_at: String,
        /// Additional string fields (e.g. source repository).
        extra: BTreeMap<String, String>,
    },
    /// The last attempt failed.
    Failed {
        /// Free-text cause.
        error: String,
        /// RFC 3339 timestamp.
        failed_at: String,
    },
}

impl ToolRecord {
    /// Whether this record describes an installed tool.
    #[must_use]
    pub const fn is_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RawToolRecord {
    installed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<Method>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    installed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failed_at: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, String>,
}

impl TryFrom<RawToolRecord> for ToolRecord {
    type Error = StateError;

    fn try_from(raw: RawToolRecord) -> Result<Self, Self::Error> {
        if raw.installed {
            let method = raw.method.ok_or_else(|| {
                StateError::InvalidRecord("installed record without method".to_string())
            })?;
            Ok(Self::Installed {
                version: raw.version.unwrap_or_default(),
                method,
                installed_at: raw.installed_at.unwrap_or_default(),
                extra: raw.extra,
            })
        } else {
            Ok(Self::Failed {
                error: raw.error.unwrap_or_default(),
                failed_at: raw.failed_at.unwrap_or_default(),
            })
        }
    }
}

impl From<ToolRecord> for RawToolRecord {
    fn from(record: ToolRecord) -> Self {
        match record {
            ToolRecord::Installed {
                version,
                method,
                installed_at,
                extra,
            } => Self {
                installed: true,
                version: Some(version),
                method: Some(method),
                installed_at: Some(installed_at),
                error: None,
                failed_at: None,
                extra,
            },
            ToolRecord::Failed { error, failed_at } => Self {
                installed: false,
                version: None,
                method: None,
                installed_at: None,
                error: Some(error),
                failed_at: Some(failed_at),
                extra: BTreeMap::new(),
            },
        }
    }
}

/// The persisted state document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    /// Version of the program that created the file.
    pub version: String,
    /// RFC 3339 creation time.
    pub created: String,
    /// RFC 3339 start time of the latest run.
    pub last_run: String,
    /// Phase indices whose end the scheduler has reached.
    #[serde(default)]
    pub completed_phases: BTreeSet<usize>,
    /// First phase not known complete.
    #[serde(default)]
    pub current_phase: usize,
    /// Tool whose install call is on the stack, if any.
    #[serde(default)]
    pub current_tool: Option<String>,
    /// Latest outcome per tool id.
    #[serde(default)]
    pub tools: BTreeMap<String, ToolRecord>,
}

impl StateDocument {
    /// A fresh document stamped with `now`.
    #[must_use]
    pub fn new(version: &str, now: &str) -> Self {
        Self {
            version: version.to_string(),
            created: now.to_string(),
            last_run: now.to_string(),
            completed_phases: BTreeSet::new(),
            current_phase: 0,
            current_tool: None,
            tools: BTreeMap::new(),
        }
    }

    /// Number of tools recorded as installed.
    #[must_use]
    pub fn count_installed(&self) -> usize {
        self.tools.values().filter(|r| r.is_installed()).count()
    }

    /// Number of tools recorded as failed.
    #[must_use]
    pub fn count_failed(&self) -> usize {
        self.tools.values().filter(|r| !r.is_installed()).count()
    }

    fn advance_cursor(&mut self) {
        self.current_phase = (0..)
            .find(|i| !self.completed_phases.contains(i))
            .unwrap_or_default();
    }
}

/// Current time in the document's timestamp format.
#[must_use]
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Return whichever of two RFC 3339 stamps is later; unparseable stamps lose.
fn later_of(current: &str, candidate: &str) -> String {
    let parse = |s: &str| DateTime::parse_from_rfc3339(s).ok();
    match (parse(current), parse(candidate)) {
        (Some(c), Some(n)) if c > n => current.to_string(),
        _ => candidate.to_string(),
    }
}

/// File-backed store for the [`StateDocument`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    version: String,
}

impl StateStore {
    /// Create a store for the document at `path`; `version` is stamped into
    /// newly created documents.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, version: &str) -> Self {
        Self {
            path: path.into(),
            version: version.to_string(),
        }
    }

    /// Location of the state document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the document exists and stamp `last_run`.
    ///
    /// Returns `true` when the document was created by this call.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the document cannot be read or written.
    pub fn init(&self) -> Result<bool, StateError> {
        let now = now_rfc3339();
        let first_run = !self.path.exists();
        let mut doc = if first_run {
            StateDocument::new(&self.version, &now)
        } else {
            self.load()?
        };
        doc.last_run = later_of(&doc.last_run, &now);
        self.persist(&doc)?;
        Ok(first_run)
    }

    /// Read the document; a missing file yields a fresh, unsaved document.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<StateDocument, StateError> {
        if !self.path.exists() {
            return Ok(StateDocument::new(&self.version, &now_rfc3339()));
        }
        let content = std::fs::read_to_string(&self.path).map_err(|source| StateError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StateError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Whether `phase` has been completed by an earlier or the current run.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the document cannot be read.
    pub fn is_phase_complete(&self, phase: usize) -> Result<bool, StateError> {
        Ok(self.load()?.completed_phases.contains(&phase))
    }

    /// Mark `phase` complete and move the cursor to the first incomplete phase.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the document cannot be read or written.
    pub fn complete_phase(&self, phase: usize) -> Result<(), StateError> {
        self.update(|doc| {
            doc.completed_phases.insert(phase);
            doc.advance_cursor();
        })
    }

    /// Move the cursor to `phase`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the document cannot be read or written.
    pub fn begin_phase(&self, phase: usize) -> Result<(), StateError> {
        self.update(|doc| doc.current_phase = phase)
    }

    /// Set the in-progress marker.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the document cannot be read or written.
    pub fn set_current_tool(&self, id: &str) -> Result<(), StateError> {
        self.update(|doc| doc.current_tool = Some(id.to_string()))
    }

    /// Clear the in-progress marker.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the document cannot be read or written.
    pub fn clear_current_tool(&self) -> Result<(), StateError> {
        self.update(|doc| doc.current_tool = None)
    }

    /// Replace the record for `id` with a success record.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the document cannot be read or written.
    pub fn record_tool_success(
        &self,
        id: &str,
        version: &str,
        method: Method,
        extra: BTreeMap<String, String>,
    ) -> Result<(), StateError> {
        let record = ToolRecord::Installed {
            version: version.to_string(),
            method,
            installed_at: now_rfc3339(),
            extra,
        };
        self.update(|doc| {
            doc.tools.insert(id.to_string(), record);
        })
    }

    /// Replace the record for `id` with a failure record.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the document cannot be read or written.
    pub fn record_tool_failed(&self, id: &str, error: &str) -> Result<(), StateError> {
        let record = ToolRecord::Failed {
            error: error.to_string(),
            failed_at: now_rfc3339(),
        };
        self.update(|doc| {
            doc.tools.insert(id.to_string(), record);
        })
    }

    /// Whether the previous run stopped with a unit mid-install.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the document cannot be read.
    pub fn is_resume(&self) -> Result<bool, StateError> {
        Ok(self.load()?.current_tool.is_some())
    }

    /// The phase cursor.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the document cannot be read.
    pub fn resume_phase(&self) -> Result<usize, StateError> {
        Ok(self.load()?.current_phase)
    }

    /// Number of tools recorded as installed.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the document cannot be read.
    pub fn count_installed(&self) -> Result<usize, StateError> {
        Ok(self.load()?.count_installed())
    }

    /// Number of tools recorded as failed.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the document cannot be read.
    pub fn count_failed(&self) -> Result<usize, StateError> {
        Ok(self.load()?.count_failed())
    }

    /// The record for `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the document cannot be read.
    pub fn tool(&self, id: &str) -> Result<Option<ToolRecord>, StateError> {
        Ok(self.load()?.tools.remove(id))
    }

    fn update(&self, mutate: impl FnOnce(&mut StateDocument)) -> Result<(), StateError> {
        let mut doc = self.load()?;
        mutate(&mut doc);
        self.persist(&doc)
    }

    fn persist(&self, doc: &StateDocument) -> Result<(), StateError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StateError::Io { path, source }
        };
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(io_err(dir))?;

        let body = serde_json::to_string_pretty(doc).map_err(|source| StateError::Parse {
            path: self.path.clone(),
            source,
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err(dir))?;
        let tmp_path = tmp.path().to_path_buf();
        writeln!(tmp, "{body}").map_err(io_err(&tmp_path))?;
        tmp.as_file().sync_all().map_err(io_err(&tmp_path))?;
        tmp.persist(&self.path)
            .map_err(|e| io_err(&self.path)(e.error))?;
        Ok(())
    }
}
