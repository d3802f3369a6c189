//! Copying a located binary into the user bin directory.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Sibling used while the new binary is staged: `name` becomes `name.new`.
fn tmp_path(binary: &Path) -> PathBuf {
    let mut name = binary
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    name.push(".new");
    binary.with_file_name(name)
}

/// Copy `source` to `bin_dir/command`, marked executable.
///
/// The copy is staged next to the destination and renamed into place, so a
/// running copy of the previous binary is never truncated.
///
/// # Errors
///
/// Returns [`PipelineError::InstallFailed`] if the directory cannot be
/// created or the copy, chmod or rename fails.
pub fn install_binary(source: &Path, bin_dir: &Path, command: &str) -> Result<PathBuf, PipelineError> {
    let dest = bin_dir.join(command);
    let fail = |reason: String| PipelineError::InstallFailed {
        path: dest.clone(),
        reason,
    };

    std::fs::create_dir_all(bin_dir)
        .map_err(|e| fail(format!("creating {}: {e}", bin_dir.display())))?;
    let tmp = tmp_path(&dest);
    std::fs::copy(source, &tmp).map_err(|e| fail(format!("copying {}: {e}", source.display())))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o755)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(fail(format!("setting permissions: {e}")));
        }
    }

    if let Err(e) = std::fs::rename(&tmp, &dest) {
        let _ = std::fs::remove_file(&tmp);
        return Err(fail(format!("renaming into place: {e}")));
    }
    Ok(dest)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_appends_new_suffix() {
        let tmp = tmp_path(Path::new("/home/u/.local/bin/just"));
        assert_eq!(tmp, Path::new("/home/u/.local/bin/just.new"));
    }

    #[test]
    fn installs_executable_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("extracted-just");
        std::fs::write(&src, "#!/bin/sh\n").unwrap();
        let bin = dir.path().join("bin");
        let dest = install_binary(&src, &bin, "just").unwrap();
        assert_eq!(dest, bin.join("just"));
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "#!/bin/sh\n");
        assert!(!bin.join("just.new").exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn replaces_existing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("uv"), "old").unwrap();
        let src = dir.path().join("uv");
        std::fs::write(&src, "new").unwrap();
        install_binary(&src, &bin, "uv").unwrap();
        assert_eq!(std::fs::read_to_string(bin.join("uv")).unwrap(), "new");
    }

    #[test]
    fn missing_source_is_install_failed() {
        let dir = tempfile::tempdir().unwrap();
        let err = install_binary(&dir.path().join("nope"), dir.path(), "nope").unwrap_err();
        assert!(matches!(err, PipelineError::InstallFailed { .. }));
    }
}
