//! Archive extraction through the system `tar` and `unzip`.
use std::path::Path;

use crate::error::PipelineError;
use crate::exec::Executor;

/// Archive formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.tar.gz` / `.tgz`
    TarGz,
    /// `.tar.xz` / `.txz`
    TarXz,
    /// `.tar.bz2` / `.tbz2`
    TarBz2,
    /// `.zip`
    Zip,
}

impl ArchiveKind {
    /// Detect the format from a file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let has = |exts: &[&str]| exts.iter().any(|e| lower.ends_with(e));
        if has(&[".tar.gz", ".tgz"]) {
            Some(Self::TarGz)
        } else if has(&[".tar.xz", ".txz"]) {
            Some(Self::TarXz)
        } else if has(&[".tar.bz2", ".tbz2"]) {
            Some(Self::TarBz2)
        } else if has(&[".zip"]) {
            Some(Self::Zip)
        } else {
            None
        }
    }

    fn command<'a>(self, archive: &'a str, dest: &'a str) -> (&'static str, Vec<&'a str>) {
        match self {
            Self::TarGz => ("tar", vec!["-xzf", archive, "-C", dest]),
            Self::TarXz => ("tar", vec!["-xJf", archive, "-C", dest]),
            Self::TarBz2 => ("tar", vec!["-xjf", archive, "-C", dest]),
            Self::Zip => ("unzip", vec!["-q", "-o", archive, "-d", dest]),
        }
    }
}

/// Unpack `archive` into the existing directory `dest`.
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedArchive`] for unknown extensions and
/// [`PipelineError::ExtractFailed`] if the extraction command fails.
pub fn extract(executor: &dyn Executor, archive: &Path, dest: &Path) -> Result<(), PipelineError> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = ArchiveKind::from_name(&name).ok_or(PipelineError::UnsupportedArchive(name))?;

    let archive_arg = archive.to_string_lossy();
    let dest_arg = dest.to_string_lossy();
    let (program, args) = kind.command(&archive_arg, &dest_arg);
    executor
        .run(program, &args)
        .map(|_| ())
        .map_err(|e| PipelineError::ExtractFailed {
            archive: archive.to_path_buf(),
            reason: format!("{e:#}"),
        })
}
