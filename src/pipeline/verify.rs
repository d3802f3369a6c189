//! SHA-256 verification of downloaded artifacts.
use std::io;
use std::path::Path;

use crate::error::PipelineError;

/// Lowercase hex SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn compute_sha256(path: &Path) -> io::Result<String> {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let mut hasher = Sha256::new();
    io::copy(&mut std::fs::File::open(path)?, &mut hasher)?;
    Ok(hasher.finalize().iter().fold(String::with_capacity(64), |mut hex, b| {
        let _ = write!(hex, "{b:02x}");
        hex
    }))
}

/// Check `path` against `expected`, removing the file on mismatch.
///
/// The comparison is exact; digests are not case-folded.
///
/// # Errors
///
/// Returns [`PipelineError::ChecksumMismatch`] carrying both digests, or
/// [`PipelineError::ArtifactIo`] if the file cannot be read.
pub fn verify(path: &Path, expected: &str) -> Result<(), PipelineError> {
    let actual = compute_sha256(path).map_err(|source| PipelineError::ArtifactIo {
        path: path.to_path_buf(),
        source,
    })?;
    if actual == expected {
        return Ok(());
    }
    // Corrupt artifacts never stay in the cache.
    let _ = std::fs::remove_file(path);
    Err(PipelineError::ChecksumMismatch {
        artifact: path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned()),
        expected: expected.to_string(),
        actual,
    })
}
