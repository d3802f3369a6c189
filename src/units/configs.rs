//! Deployment of templated configuration files into `$HOME`.
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context as _, Result};
use walkdir::WalkDir;

use super::{Context, Unit, UnitOutcome};

/// Copies `<root>/config/**` into `$HOME`, substituting `{{HOME}}` and
/// `{{USER}}` in UTF-8 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigUnit;

/// Counts from one deployment.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeployStats {
    /// Files created or replaced.
    pub written: usize,
    /// Files already identical.
    pub unchanged: usize,
}

/// Substitute template variables; non-UTF-8 content is copied verbatim.
fn render(content: Vec<u8>, home: &Path, user: &str) -> Vec<u8> {
    match String::from_utf8(content) {
        Ok(text) => text
            .replace("{{HOME}}", &home.to_string_lossy())
            .replace("{{USER}}", user)
            .into_bytes(),
        Err(e) => e.into_bytes(),
    }
}

/// Write `content` to `dest` through a temporary sibling, preserving the
/// source file's permissions.
fn write_atomic(dest: &Path, content: &[u8], permissions: std::fs::Permissions) -> Result<()> {
    let dir = dest
        .parent()
        .with_context(|| format!("{} has no parent directory", dest.display()))?;
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    tmp.write_all(content)
        .with_context(|| format!("writing {}", dest.display()))?;
    tmp.as_file()
        .set_permissions(permissions)
        .with_context(|| format!("setting permissions on {}", dest.display()))?;
    tmp.persist(dest)
        .with_context(|| format!("replacing {}", dest.display()))?;
    Ok(())
}

/// Deploy every regular file under `source` into `home`.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or a file cannot be read
/// or written.
pub fn deploy(source: &Path, home: &Path, user: &str) -> Result<DeployStats> {
    let mut stats = DeployStats::default();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", source.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(source)
            .with_context(|| format!("{} is outside {}", entry.path().display(), source.display()))?;
        let dest = home.join(rel);

        let raw = std::fs::read(entry.path())
            .with_context(|| format!("reading {}", entry.path().display()))?;
        let rendered = render(raw, home, user);
        if std::fs::read(&dest).is_ok_and(|existing| existing == rendered) {
            stats.unchanged += 1;
            continue;
        }
        let permissions = entry
            .metadata()
            .with_context(|| format!("reading metadata of {}", entry.path().display()))?
            .permissions();
        write_atomic(&dest, &rendered, permissions)?;
        stats.written += 1;
    }
    Ok(stats)
}

impl Unit for ConfigUnit {
    fn id(&self) -> &str {
        "configs"
    }

    fn is_satisfied(&self, _ctx: &Context<'_>) -> Result<bool> {
        Ok(false)
    }

    fn install(&self, ctx: &Context<'_>) -> Result<UnitOutcome> {
        let source = ctx.settings.config_source();
        if !source.is_dir() {
            return Ok(UnitOutcome::Skipped(format!(
                "no config directory at {}",
                source.display()
            )));
        }
        let stats = deploy(&source, &ctx.settings.home, &ctx.settings.user)?;
        ctx.log.debug(&format!(
            "configs: {} written, {} unchanged",
            stats.written, stats.unchanged
        ));
        Ok(UnitOutcome::Configured(format!(
            "{} written, {} unchanged",
            stats.written, stats.unchanged
        )))
    }

    fn is_present(&self, _ctx: &Context<'_>) -> Option<bool> {
        None
    }
}
