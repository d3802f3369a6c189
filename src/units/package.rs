//! Tools installed through the native package manager.
use std::collections::BTreeMap;

use anyhow::Result;

use super::{Context, Unit, UnitOutcome};
use crate::packages::{PackageManager, PackageOutcome, link_alias};
use crate::state::Method;

/// Package names per backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageNames {
    /// Debian/Ubuntu.
    pub apt: &'static str,
    /// Fedora.
    pub dnf: &'static str,
    /// Arch Linux.
    pub pacman: &'static str,
    /// Homebrew.
    pub brew: &'static str,
}

impl PackageNames {
    /// The same name on every backend.
    #[must_use]
    pub const fn same(name: &'static str) -> Self {
        Self {
            apt: name,
            dnf: name,
            pacman: name,
            brew: name,
        }
    }

    /// Name for `pm`.
    #[must_use]
    pub const fn for_manager(&self, pm: PackageManager) -> &'static str {
        match pm {
            PackageManager::Apt => self.apt,
            PackageManager::Dnf => self.dnf,
            PackageManager::Pacman => self.pacman,
            PackageManager::Brew => self.brew,
        }
    }
}

/// A tool installed from the system package manager.
#[derive(Debug, Clone)]
pub struct PackageUnit {
    id: &'static str,
    command: &'static str,
    names: PackageNames,
    alias: Option<&'static str>,
}

impl PackageUnit {
    /// A package named `id` on every backend, providing the `id` command.
    #[must_use]
    pub const fn simple(id: &'static str) -> Self {
        Self::new(id, id, PackageNames::same(id))
    }

    /// A package whose names or command differ from its id.
    #[must_use]
    pub const fn new(id: &'static str, command: &'static str, names: PackageNames) -> Self {
        Self {
            id,
            command,
            names,
            alias: None,
        }
    }

    /// Link `command` to `actual` when a distribution renames the binary.
    #[must_use]
    pub const fn with_alias(mut self, actual: &'static str) -> Self {
        self.alias = Some(actual);
        self
    }

    fn package(&self, ctx: &Context<'_>) -> &'static str {
        self.names.for_manager(ctx.env.package_manager)
    }

    fn link(&self, ctx: &Context<'_>) {
        let Some(actual) = self.alias else {
            return;
        };
        match link_alias(ctx.executor, &ctx.settings.bin_dir, actual, self.command) {
            Ok(true) => ctx
                .log
                .info(&format!("linked {} -> {actual}", self.command)),
            Ok(false) => {}
            Err(e) => ctx
                .log
                .warn(&format!("could not link {} -> {actual}: {e:#}", self.command)),
        }
    }
}

impl Unit for PackageUnit {
    fn id(&self) -> &str {
        self.id
    }

    fn is_satisfied(&self, ctx: &Context<'_>) -> Result<bool> {
        if !ctx.packages.is_installed(self.package(ctx))? {
            return Ok(false);
        }
        Ok(self.alias.is_none() || ctx.has_command(self.command))
    }

    fn install(&self, ctx: &Context<'_>) -> Result<UnitOutcome> {
        let package = self.package(ctx);
        let outcome = ctx.packages.install(package, self.id)?;
        self.link(ctx);
        Ok(match outcome {
            PackageOutcome::AlreadyInstalled { version } => UnitOutcome::AlreadyPresent(version),
            PackageOutcome::Installed { version } => {
                let mut extra = BTreeMap::new();
                if package != self.id {
                    extra.insert("package".to_string(), package.to_string());
                }
                UnitOutcome::Installed {
                    version,
                    method: Method::from(ctx.packages.manager()),
                    extra,
                }
            }
        })
    }

    fn is_present(&self, ctx: &Context<'_>) -> Option<bool> {
        Some(ctx.has_command(self.command))
    }
}
