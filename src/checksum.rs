//! Expected digests from upstream-published checksum manifests.
use crate::error::{PipelineError, TransportError};
use crate::http::Transport;
use crate::pipeline::download::require_https;

/// Release download URLs for `file`, with a `v`-prefixed tag first.
#[must_use]
pub fn release_urls(repo: &str, version: &str, file: &str) -> [String; 2] {
    [
        format!("https://github.com/{repo}/releases/download/v{version}/{file}"),
        format!("https://github.com/{repo}/releases/download/{version}/{file}"),
    ]
}

/// Looks up published digests for release artifacts.
pub struct ChecksumProvider<'a> {
    transport: &'a dyn Transport,
}

impl std::fmt::Debug for ChecksumProvider<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChecksumProvider").finish_non_exhaustive()
    }
}

impl<'a> ChecksumProvider<'a> {
    /// Create a provider.
    #[must_use]
    pub const fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Expected SHA-256 of `artifact` from the release's `manifest`.
    ///
    /// There is no unverified fallback: a manifest that is missing or does
    /// not list the artifact is an error.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ChecksumUnavailable`] if no manifest lists the
    /// artifact, or [`PipelineError::DownloadFailed`] if the manifest request
    /// fails for a reason other than "not found".
    pub fn fetch_checksum(
        &self,
        repo: &str,
        version: &str,
        manifest: &str,
        artifact: &str,
    ) -> Result<String, PipelineError> {
        let unavailable = || PipelineError::ChecksumUnavailable {
            artifact: artifact.to_string(),
            manifest: manifest.to_string(),
        };
        for url in release_urls(repo, version, manifest) {
            match self.transport.get_text(&url, false) {
                Ok(body) => return parse_manifest(&body, artifact).ok_or_else(unavailable),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(manifest_fetch_failed(&url, &e)),
            }
        }
        Err(unavailable())
    }

    /// Expected SHA-256 of `artifact` from a companion file at `url`, for
    /// artifacts published outside GitHub releases.
    ///
    /// # Errors
    ///
    /// As for [`ChecksumProvider::fetch_checksum`].
    pub fn fetch_checksum_from(&self, url: &str, artifact: &str) -> Result<String, PipelineError> {
        require_https(url)?;
        let unavailable = || PipelineError::ChecksumUnavailable {
            artifact: artifact.to_string(),
            manifest: url.to_string(),
        };
        match self.transport.get_text(url, false) {
            Ok(body) => parse_manifest(&body, artifact).ok_or_else(unavailable),
            Err(e) if e.is_not_found() => Err(unavailable()),
            Err(e) => Err(manifest_fetch_failed(url, &e)),
        }
    }
}

fn manifest_fetch_failed(url: &str, err: &TransportError) -> PipelineError {
    PipelineError::DownloadFailed {
        url: url.to_string(),
        attempts: 1,
        reason: err.to_string(),
    }
}

/// Find the digest for `artifact` in a checksum manifest.
///
/// Accepts GNU coreutils lines (`<digest>  <name>` or `<digest> *<name>`,
/// names optionally carrying a directory prefix), BSD lines
/// (`SHA256 (<name>) = <digest>`) and single-digest files.
#[must_use]
pub fn parse_manifest(content: &str, artifact: &str) -> Option<String> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();

    for line in &lines {
        if let Some(rest) = line.strip_prefix("SHA256 (")
            && let Some((name, digest)) = rest.split_once(") = ")
        {
            if basename(name) == artifact && is_sha256(digest.trim()) {
                return Some(digest.trim().to_string());
            }
            continue;
        }
        let mut parts = line.split_whitespace();
        if let (Some(digest), Some(name)) = (parts.next(), parts.next())
            && is_sha256(digest)
            && basename(name.trim_start_matches('*')) == artifact
        {
            return Some(digest.to_string());
        }
    }

    if let [only] = lines.as_slice() {
        let mut parts = only.split_whitespace();
        if let (Some(digest), None) = (parts.next(), parts.next())
            && is_sha256(digest)
        {
            return Some(digest.to_string());
        }
    }
    None
}

fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn is_sha256(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}
