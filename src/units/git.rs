//! Shallow git clones (zsh plugins).
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use git2::build::RepoBuilder;
use git2::{FetchOptions, Repository};

use super::{Context, Unit, UnitOutcome};
use crate::state::Method;

/// A repository cloned to a fixed location under `$HOME`.
#[derive(Debug, Clone, Copy)]
pub struct GitUnit {
    id: &'static str,
    url: &'static str,
    dest: &'static str,
}

impl GitUnit {
    /// Clone `url` to `$HOME/<dest>`.
    #[must_use]
    pub const fn new(id: &'static str, url: &'static str, dest: &'static str) -> Self {
        Self { id, url, dest }
    }

    fn target(&self, ctx: &Context<'_>) -> PathBuf {
        ctx.settings.home.join(self.dest)
    }
}

/// Abbreviated id of the commit `HEAD` points at.
fn short_head(repo: &Repository) -> Result<String> {
    let commit = repo.head()?.peel_to_commit()?;
    let short = commit.as_object().short_id()?;
    Ok(short.as_str().unwrap_or_default().to_string())
}

/// Whether `path` holds a repository whose `HEAD` resolves to a commit.
///
/// An interrupted clone can leave `.git` behind with no commits.
fn has_checkout(path: &Path) -> bool {
    Repository::open(path)
        .ok()
        .is_some_and(|repo| repo.head().and_then(|h| h.peel_to_commit()).is_ok())
}

/// Remove `path` if it exists but is not a usable checkout.
fn clear_incomplete(path: &Path) -> Result<bool> {
    if !path.exists() || has_checkout(path) {
        return Ok(false);
    }
    std::fs::remove_dir_all(path).with_context(|| format!("removing {}", path.display()))?;
    Ok(true)
}

/// Depth-1 clone of `url` into `dest`.
fn shallow_clone(url: &str, dest: &Path) -> Result<Repository> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut fo = FetchOptions::new();
    fo.depth(1);
    RepoBuilder::new()
        .fetch_options(fo)
        .clone(url, dest)
        .with_context(|| format!("cloning {url}"))
}

impl Unit for GitUnit {
    fn id(&self) -> &str {
        self.id
    }

    fn is_satisfied(&self, ctx: &Context<'_>) -> Result<bool> {
        Ok(has_checkout(&self.target(ctx)))
    }

    fn install(&self, ctx: &Context<'_>) -> Result<UnitOutcome> {
        let dest = self.target(ctx);
        if clear_incomplete(&dest)? {
            ctx.log
                .warn(&format!("removed incomplete clone at {}", dest.display()));
        }
        ctx.log
            .info(&format!("cloning {} into {}", self.url, dest.display()));
        let repo = shallow_clone(self.url, &dest)?;
        let mut extra = BTreeMap::new();
        extra.insert("url".to_string(), self.url.to_string());
        extra.insert("path".to_string(), dest.display().to_string());
        Ok(UnitOutcome::Installed {
            version: short_head(&repo)?,
            method: Method::Git,
            extra,
        })
    }

    fn is_present(&self, ctx: &Context<'_>) -> Option<bool> {
        Some(has_checkout(&self.target(ctx)))
    }
}
