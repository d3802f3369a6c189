//! Domain-specific error types for the setup engine.
//!
//! Internal modules return typed errors (e.g., [`PipelineError`],
//! [`StateError`]) while unit bodies and command handlers convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! SetupError
//! ├── Platform(PlatformError)   unsupported OS, arch or package manager
//! ├── State(StateError)         state document I/O and parsing
//! ├── Pipeline(PipelineError)   version, checksum, download, extract, install
//! ├── Package(PackageError)     package manager invocations
//! └── Transport(TransportError) HTTP requests
//! ```

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the setup engine.
#[derive(Error, Debug)]
pub enum SetupError {
    /// Environment detection failed before any phase ran.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// The state document could not be read or written.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// A stage of the binary acquisition pipeline failed.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// A package manager command failed.
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// An HTTP request failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors raised while detecting the host environment.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The operating system is neither Linux nor macOS.
    #[error("unsupported operating system: {0}")]
    UnsupportedOs(String),

    /// The CPU architecture is neither x86_64 nor aarch64.
    #[error("unsupported architecture: {0}")]
    UnsupportedArch(String),

    /// None of apt, dnf, pacman or brew is available.
    #[error("no supported package manager found (looked for {0})")]
    NoPackageManager(String),
}

/// Errors raised by the persisted state document.
#[derive(Error, Debug)]
pub enum StateError {
    /// Reading, writing or renaming the state file failed.
    #[error("state file I/O error at {path}: {source}")]
    Io {
        /// Path of the state file or its temporary sibling.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The state file exists but is not a valid document.
    #[error("state file {path} is not valid JSON: {source}")]
    Parse {
        /// Path of the state file.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// A tool record violates the record shape.
    #[error("invalid tool record: {0}")]
    InvalidRecord(String),
}

/// Stage of the binary acquisition pipeline that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// Version resolution.
    Resolver,
    /// Checksum manifest lookup.
    Checksum,
    /// Artifact download.
    Download,
    /// Digest verification.
    Verify,
    /// Archive extraction.
    Extract,
    /// Binary location inside the extracted tree.
    Locate,
    /// Installation into the bin directory.
    Install,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolver => "version resolver",
            Self::Checksum => "checksum provider",
            Self::Download => "downloader",
            Self::Verify => "verifier",
            Self::Extract => "extractor",
            Self::Locate => "binary locator",
            Self::Install => "installer",
        };
        f.write_str(name)
    }
}

/// Errors raised by the download/verify/extract pipeline.
///
/// Each variant knows which [`Component`] raised it, the operation that was
/// underway and an ordered list of recovery suggestions, which together feed
/// the structured error box printed at the unit boundary.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No version could be determined for the tool.
    #[error("could not resolve a version for {tool}: {reason}")]
    VersionUnresolved {
        /// Tool identifier.
        tool: String,
        /// Why resolution failed.
        reason: String,
    },

    /// The upstream manifest has no digest for the artifact.
    #[error("checksum unavailable for {artifact} (manifest {manifest})")]
    ChecksumUnavailable {
        /// Artifact file name.
        artifact: String,
        /// Manifest file name.
        manifest: String,
    },

    /// The artifact digest differs from the published one.
    #[error("checksum mismatch for {artifact}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Artifact file name.
        artifact: String,
        /// Published digest.
        expected: String,
        /// Computed digest.
        actual: String,
    },

    /// The URL does not use https.
    #[error("refusing insecure URL: {0}")]
    InsecureUrl(String),

    /// Every download attempt failed.
    #[error("download of {url} failed after {attempts} attempt(s): {reason}")]
    DownloadFailed {
        /// Last URL attempted.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// Last error seen.
        reason: String,
    },

    /// Reading or writing a cached artifact failed.
    #[error("artifact I/O error at {path}: {source}")]
    ArtifactIo {
        /// Artifact or cache path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The artifact extension is not a known archive format.
    #[error("unsupported archive format: {0}")]
    UnsupportedArchive(String),

    /// The extraction command failed.
    #[error("failed to extract {archive}: {reason}")]
    ExtractFailed {
        /// Archive path.
        archive: PathBuf,
        /// Extraction tool output.
        reason: String,
    },

    /// The expected binary is not present in the extracted tree.
    #[error("binary {name} not found in archive; contents: {listing}")]
    BinaryNotFound {
        /// Binary file name searched for.
        name: String,
        /// Truncated listing of the extracted tree.
        listing: String,
    },

    /// Copying the binary into the bin directory failed.
    #[error("failed to install {path}: {reason}")]
    InstallFailed {
        /// Destination path.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },
}

impl PipelineError {
    /// The pipeline stage that raised this error.
    #[must_use]
    pub const fn component(&self) -> Component {
        match self {
            Self::VersionUnresolved { .. } => Component::Resolver,
            Self::ChecksumUnavailable { .. } => Component::Checksum,
            Self::ChecksumMismatch { .. } => Component::Verify,
            Self::InsecureUrl(_) | Self::DownloadFailed { .. } | Self::ArtifactIo { .. } => {
                Component::Download
            }
            Self::UnsupportedArchive(_) | Self::ExtractFailed { .. } => Component::Extract,
            Self::BinaryNotFound { .. } => Component::Locate,
            Self::InstallFailed { .. } => Component::Install,
        }
    }

    /// Short name of the operation that was underway.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::VersionUnresolved { .. } => "resolve_version",
            Self::ChecksumUnavailable { .. } => "fetch_checksum",
            Self::ChecksumMismatch { .. } => "verify",
            Self::InsecureUrl(_) | Self::DownloadFailed { .. } => "download",
            Self::ArtifactIo { .. } => "cache",
            Self::UnsupportedArchive(_) | Self::ExtractFailed { .. } => "extract",
            Self::BinaryNotFound { .. } => "locate_binary",
            Self::InstallFailed { .. } => "install",
        }
    }

    /// Ordered recovery suggestions, most likely fix first.
    #[must_use]
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::VersionUnresolved { tool, .. } => vec![
                "check network connectivity to api.github.com".to_string(),
                "set GITHUB_TOKEN if the API rate limit was hit".to_string(),
                format!("pin a version under [versions] {tool} = \"...\" in the config file"),
            ],
            Self::ChecksumUnavailable { manifest, .. } => vec![
                format!("confirm the release publishes {manifest}"),
                "pin a version whose release carries checksums".to_string(),
            ],
            Self::ChecksumMismatch { .. } => vec![
                "re-run to fetch a fresh copy".to_string(),
                "report the mismatch upstream if it persists".to_string(),
            ],
            Self::InsecureUrl(_) => vec!["use an https:// URL".to_string()],
            Self::DownloadFailed { .. } => vec![
                "check network connectivity".to_string(),
                "check for a proxy or firewall blocking github.com".to_string(),
                "re-run; completed phases are skipped".to_string(),
            ],
            Self::ArtifactIo { path, .. } => vec![
                format!("check permissions on {}", path.display()),
                "check free disk space".to_string(),
            ],
            Self::UnsupportedArchive(_) => {
                vec!["declare the artifact as a raw binary or a supported archive".to_string()]
            }
            Self::ExtractFailed { .. } => vec![
                "run `devsetup doctor` to confirm tar and unzip are installed".to_string(),
                "delete the cached artifact and re-run".to_string(),
            ],
            Self::BinaryNotFound { .. } => {
                vec!["the upstream archive layout may have changed; pin an older version".to_string()]
            }
            Self::InstallFailed { .. } => vec![
                "check that the bin directory is writable".to_string(),
                "check free disk space".to_string(),
            ],
        }
    }
}

/// Errors raised by package manager invocations.
#[derive(Error, Debug)]
pub enum PackageError {
    /// The install command failed.
    #[error("{manager} failed to install {package}: {reason}")]
    InstallFailed {
        /// Package name passed to the manager.
        package: String,
        /// Package manager name.
        manager: String,
        /// Trimmed manager output.
        reason: String,
    },

    /// The index refresh command failed.
    #[error("{manager} failed to refresh its package index: {reason}")]
    RefreshFailed {
        /// Package manager name.
        manager: String,
        /// Trimmed manager output.
        reason: String,
    },
}

/// Errors raised by the HTTP transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("HTTP {code} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        code: u16,
    },

    /// The request failed before a response was received.
    #[error("request to {url} failed: {reason}")]
    Network {
        /// Requested URL.
        url: String,
        /// Underlying failure.
        reason: String,
    },

    /// Writing the response body to disk failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl TransportError {
    /// Whether repeating the request could succeed.
    ///
    /// Client errors other than 408 and 429 are final.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Status { code, .. } => !(*code >= 400 && *code < 500) || matches!(*code, 408 | 429),
            Self::Network { .. } | Self::Io { .. } => true,
        }
    }

    /// Whether the server reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { code: 404, .. })
    }
}
