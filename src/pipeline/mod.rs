//! Binary acquisition: version resolution, checksum lookup, download with
//! retry, verification, extraction and installation into the bin directory.
//!
//! ```text
//! resolve_version ─► version skip? ─► fetch_checksum ─► cache / download ─► verify
//!                                                                             │
//!                        install_binary ◄── locate_binary ◄── extract ◄───────┘
//! ```
pub mod archive;
pub mod download;
pub mod install;
pub mod locate;
pub mod template;
pub mod verify;

use std::path::{Path, PathBuf};

pub use archive::{ArchiveKind, extract};
pub use download::{Downloader, RetryPolicy};
pub use install::install_binary;
pub use locate::locate_binary;
pub use template::{TemplateVars, expand};
pub use verify::{compute_sha256, verify};

use crate::checksum::{ChecksumProvider, release_urls};
use crate::error::PipelineError;
use crate::exec::Executor;
use crate::http::Transport;
use crate::logging::Log;
use crate::platform::Environment;
use crate::settings::Settings;
use crate::version::{VersionResolver, is_satisfied, local_version};

/// How to fetch one tool from its GitHub releases.
///
/// Templates accept the placeholders documented on [`expand`]; the manifest
/// template may also use `{artifact}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSpec {
    /// Tool id, also the state record key and pin key.
    pub tool: &'static str,
    /// GitHub `owner/name`.
    pub repo: &'static str,
    /// Release asset name.
    pub artifact: &'static str,
    /// Checksum manifest asset name.
    pub manifest: &'static str,
    /// Path of the binary inside the archive.
    pub binary: &'static str,
    /// Installed command name.
    pub command: &'static str,
    /// The asset is the binary itself; no extraction.
    pub raw: bool,
}

/// What [`Pipeline::install`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquired {
    /// The local command already satisfies the resolved version.
    UpToDate {
        /// Version reported by the local command.
        installed: String,
        /// Resolved upstream version.
        wanted: String,
    },
    /// A verified binary was installed.
    Installed {
        /// Installed version.
        version: String,
        /// Destination path.
        path: PathBuf,
    },
}

/// Drives a [`DownloadSpec`] through every pipeline stage.
pub struct Pipeline<'a> {
    env: &'a Environment,
    executor: &'a dyn Executor,
    transport: &'a dyn Transport,
    log: &'a dyn Log,
    resolver: VersionResolver<'a>,
    cache_dir: &'a Path,
    bin_dir: &'a Path,
    retry: RetryPolicy,
}

impl std::fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("env", &self.env)
            .field("cache_dir", &self.cache_dir)
            .field("bin_dir", &self.bin_dir)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline using the cache, bin directory and pins from `settings`.
    #[must_use]
    pub fn new(
        env: &'a Environment,
        executor: &'a dyn Executor,
        transport: &'a dyn Transport,
        log: &'a dyn Log,
        settings: &'a Settings,
    ) -> Self {
        Self {
            env,
            executor,
            transport,
            log,
            resolver: VersionResolver::new(transport, &settings.pinned),
            cache_dir: &settings.cache_dir,
            bin_dir: &settings.bin_dir,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Directory binaries are installed into.
    #[must_use]
    pub const fn bin_dir(&self) -> &Path {
        self.bin_dir
    }

    /// Version to install for `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::VersionUnresolved`] if none can be determined.
    pub fn resolve_version(&self, spec: &DownloadSpec) -> Result<String, PipelineError> {
        self.resolver.resolve(spec.tool, spec.repo)
    }

    /// Install `spec` unless the local command is already at least as new as
    /// the resolved version.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] of the first stage that fails.
    pub fn install(&self, spec: &DownloadSpec) -> Result<Acquired, PipelineError> {
        let version = self.resolve_version(spec)?;
        if let Some(installed) = local_version(self.executor, spec.command, self.bin_dir)
            && is_satisfied(&installed, &version)
        {
            self.log.debug(&format!(
                "{}: {installed} satisfies {version}, skipping download",
                spec.tool
            ));
            return Ok(Acquired::UpToDate {
                installed,
                wanted: version,
            });
        }

        let vars = TemplateVars::new(&version, self.env);
        let artifact = expand(spec.artifact, &vars);
        let manifest = expand(spec.manifest, &vars.with_artifact(&artifact));
        let expected = ChecksumProvider::new(self.transport)
            .fetch_checksum(spec.repo, &version, &manifest, &artifact)?;

        self.log
            .info(&format!("fetching {} {version} ({artifact})", spec.tool));
        let urls = release_urls(spec.repo, &version, &artifact);
        let cached = self.cache_path(spec.tool, &version, &artifact);
        let archive = self.fetch_verified(&urls, &cached, &expected)?;

        let path = if spec.raw {
            install_binary(&archive, self.bin_dir, spec.command)?
        } else {
            let staging = self.staging_dir(&cached)?;
            extract(self.executor, &archive, staging.path())?;
            let binary = locate_binary(staging.path(), &expand(spec.binary, &vars))?;
            install_binary(&binary, self.bin_dir, spec.command)?
        };
        Ok(Acquired::Installed { version, path })
    }

    /// Fetch a file published outside GitHub releases, verified against the
    /// digest in its companion checksum file. Returns the cached path.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] of the first stage that fails.
    pub fn fetch_upstream(
        &self,
        tool: &str,
        url: &str,
        checksum_url: &str,
    ) -> Result<PathBuf, PipelineError> {
        download::require_https(url)?;
        download::require_https(checksum_url)?;
        let artifact = url.rsplit('/').next().unwrap_or(tool).to_string();
        let expected =
            ChecksumProvider::new(self.transport).fetch_checksum_from(checksum_url, &artifact)?;
        let key: String = expected.chars().take(12).collect();
        let cached = self.cache_path(tool, &key, &artifact);
        self.fetch_verified(&[url.to_string()], &cached, &expected)
    }

    /// Cache location for one artifact of one tool version.
    #[must_use]
    pub fn cache_path(&self, tool: &str, version: &str, artifact: &str) -> PathBuf {
        self.cache_dir.join(tool).join(version).join(artifact)
    }

    /// Reuse `cached` if it re-verifies, otherwise download it from the first
    /// of `urls` that exists and verify the fresh copy.
    fn fetch_verified(
        &self,
        urls: &[String],
        cached: &Path,
        expected: &str,
    ) -> Result<PathBuf, PipelineError> {
        if cached.exists() {
            match verify(cached, expected) {
                Ok(()) => {
                    self.log
                        .debug(&format!("using cached {}", cached.display()));
                    return Ok(cached.to_path_buf());
                }
                Err(PipelineError::ChecksumMismatch { .. }) => {
                    self.log.warn(&format!(
                        "cached {} failed verification; downloading again",
                        cached.display()
                    ));
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(dir) = cached.parent() {
            std::fs::create_dir_all(dir).map_err(|source| PipelineError::ArtifactIo {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let downloader = Downloader::new(self.transport, self.log, self.retry);
        let used = downloader.download_first(urls, cached)?;
        self.log.debug(&format!("downloaded {used}"));
        verify(cached, expected)?;
        Ok(cached.to_path_buf())
    }

    fn staging_dir(&self, cached: &Path) -> Result<tempfile::TempDir, PipelineError> {
        let parent = cached.parent().unwrap_or(self.cache_dir);
        tempfile::Builder::new()
            .prefix(".extract-")
            .tempdir_in(parent)
            .map_err(|source| PipelineError::ArtifactIo {
                path: parent.to_path_buf(),
                source,
            })
    }
}
