//! Artifact download with a bounded retry loop.
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PipelineError, TransportError};
use crate::http::Transport;
use crate::logging::Log;

/// Maximum attempts per URL.
const RETRY_COUNT: u32 = 3;

/// Seconds to wait between attempts.
const RETRY_DELAY: u64 = 2;

/// How often and how patiently a download is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts per URL, including the first.
    pub attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: RETRY_COUNT,
            delay: Duration::from_secs(RETRY_DELAY),
        }
    }
}

impl RetryPolicy {
    /// The default attempt count with no delay between attempts.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Fetches artifacts over https into a destination path.
pub struct Downloader<'a> {
    transport: &'a dyn Transport,
    log: &'a dyn Log,
    retry: RetryPolicy,
}

impl std::fmt::Debug for Downloader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<'a> Downloader<'a> {
    /// Create a downloader.
    #[must_use]
    pub const fn new(transport: &'a dyn Transport, log: &'a dyn Log, retry: RetryPolicy) -> Self {
        Self {
            transport,
            log,
            retry,
        }
    }

    /// Download `url` into `dest`, retrying transient failures.
    ///
    /// The body lands in a `.part` sibling that is renamed over `dest` only
    /// after the transfer completes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InsecureUrl`] before any request for a
    /// non-https URL, or [`PipelineError::DownloadFailed`] once the attempts
    /// are exhausted or the server answers with a final client error.
    pub fn download(&self, url: &str, dest: &Path) -> Result<u64, PipelineError> {
        require_https(url)?;
        self.fetch(url, dest).map_err(|(attempts, e)| failed(url, attempts, &e))
    }

    /// Download the first of `urls` that exists, returning the URL used.
    ///
    /// A 404 moves on to the next candidate without retrying; any other
    /// failure ends the search.
    ///
    /// # Errors
    ///
    /// As for [`Downloader::download`]; every candidate is checked for https
    /// before the first request.
    pub fn download_first(&self, urls: &[String], dest: &Path) -> Result<String, PipelineError> {
        for url in urls {
            require_https(url)?;
        }
        let mut last = None;
        for url in urls {
            match self.fetch(url, dest) {
                Ok(_) => return Ok(url.clone()),
                Err((attempts, e)) if e.is_not_found() => {
                    self.log.debug(&format!("{url} not found"));
                    last = Some(failed(url, attempts, &e));
                }
                Err((attempts, e)) => return Err(failed(url, attempts, &e)),
            }
        }
        Err(last.unwrap_or_else(|| PipelineError::DownloadFailed {
            url: String::new(),
            attempts: 0,
            reason: "no candidate URLs".to_string(),
        }))
    }

    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, (u32, TransportError)> {
        let part = part_path(dest);
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.log
                .debug(&format!("GET {url} (attempt {attempt}/{})", self.retry.attempts));
            let err = match self.transport.download(url, &part) {
                Ok(bytes) => match std::fs::rename(&part, dest) {
                    Ok(()) => return Ok(bytes),
                    Err(source) => TransportError::Io {
                        path: dest.to_path_buf(),
                        source,
                    },
                },
                Err(e) => e,
            };
            let _ = std::fs::remove_file(&part);
            if !err.is_retryable() || attempt >= self.retry.attempts {
                return Err((attempt, err));
            }
            self.log.warn(&format!(
                "download attempt {attempt} failed: {err}; retrying in {}s",
                self.retry.delay.as_secs()
            ));
            std::thread::sleep(self.retry.delay);
        }
    }
}

/// Reject anything but `https://` before a request is made.
pub(crate) fn require_https(url: &str) -> Result<(), PipelineError> {
    if url.starts_with("https://") {
        Ok(())
    } else {
        Err(PipelineError::InsecureUrl(url.to_string()))
    }
}

fn failed(url: &str, attempts: u32, err: &TransportError) -> PipelineError {
    PipelineError::DownloadFailed {
        url: url.to_string(),
        attempts,
        reason: err.to_string(),
    }
}

/// In-flight sibling of `dest`: `name` becomes `name.part`.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
