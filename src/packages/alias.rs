//! Best-effort links for distributions that ship a tool under another name
//! (Debian's `fdfind` and `batcat`).
use anyhow::{Context as _, Result};
use std::path::Path;

use crate::exec::Executor;

/// Link `bin_dir/expected` to the binary named `actual` when `expected` is not
/// on `PATH` but `actual` is.
///
/// Returns `true` if a link was created.
///
/// # Errors
///
/// Returns an error if the bin directory or the link cannot be created.
pub fn link_alias(
    executor: &dyn Executor,
    bin_dir: &Path,
    actual: &str,
    expected: &str,
) -> Result<bool> {
    if executor.which(expected).is_some() {
        return Ok(false);
    }
    let Some(target) = executor.which(actual) else {
        return Ok(false);
    };
    let link = bin_dir.join(expected);
    if link.symlink_metadata().is_ok() {
        return Ok(false);
    }
    std::fs::create_dir_all(bin_dir)
        .with_context(|| format!("creating {}", bin_dir.display()))?;
    std::os::unix::fs::symlink(&target, &link)
        .with_context(|| format!("linking {} -> {}", link.display(), target.display()))?;
    Ok(true)
}
