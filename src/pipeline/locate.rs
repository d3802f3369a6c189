//! Finding the executable inside an extracted release archive.
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::PipelineError;

/// Entries shown in a [`PipelineError::BinaryNotFound`] listing.
const LISTING_LIMIT: usize = 20;

/// Locate the binary under `dir`.
///
/// `expected` is the archive-relative path after placeholder expansion. If
/// nothing is there, the tree is searched for a regular file with the same
/// basename.
///
/// # Errors
///
/// Returns [`PipelineError::BinaryNotFound`] with a truncated listing of the
/// tree when neither lookup finds the file.
pub fn locate_binary(dir: &Path, expected: &str) -> Result<PathBuf, PipelineError> {
    let direct = dir.join(expected);
    if direct.is_file() {
        return Ok(direct);
    }

    let name = Path::new(expected)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| expected.to_string());
    let found = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .find(|e| e.file_name().to_string_lossy() == name.as_str());
    if let Some(entry) = found {
        return Ok(entry.into_path());
    }

    Err(PipelineError::BinaryNotFound {
        name,
        listing: listing(dir),
    })
}

/// Archive-relative paths under `dir`, cut to [`LISTING_LIMIT`] entries.
fn listing(dir: &Path) -> String {
    let entries: Vec<String> = WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter_map(|e| {
            e.path()
                .strip_prefix(dir)
                .ok()
                .map(|p| p.display().to_string())
        })
        .collect();
    if entries.is_empty() {
        return "(empty)".to_string();
    }
    let shown: Vec<&str> = entries.iter().take(LISTING_LIMIT).map(String::as_str).collect();
    let mut out = shown.join(", ");
    if entries.len() > LISTING_LIMIT {
        write!(out, ", ... ({} more)", entries.len() - LISTING_LIMIT).unwrap_or(());
    }
    out
}
