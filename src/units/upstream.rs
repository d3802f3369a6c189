//! Tools installed by running a verified upstream installer (rustup).
use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};

use super::{Context, Unit, UnitOutcome};
use crate::pipeline::install_binary;
use crate::state::Method;
use crate::version::extract_version;

/// Installs the Rust toolchain manager with `rustup-init`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustupUnit;

const INSTALLER_ARGS: &[&str] = &["-y", "--no-modify-path"];

/// Distribution builds of rustup refuse `self update` with this message.
const SELF_UPDATE_DISABLED: &str = "self-update is disabled";

impl RustupUnit {
    fn installer_url(ctx: &Context<'_>) -> String {
        format!(
            "https://static.rust-lang.org/rustup/dist/{}/rustup-init",
            ctx.env.gnu_target_triple()
        )
    }

    fn rustup_path(ctx: &Context<'_>) -> PathBuf {
        ctx.settings.home.join(".cargo/bin/rustup")
    }

    fn present(ctx: &Context<'_>) -> bool {
        ctx.executor.which("rustup").is_some() || Self::rustup_path(ctx).is_file()
    }

    fn program(ctx: &Context<'_>) -> String {
        ctx.executor
            .which("rustup")
            .unwrap_or_else(|| Self::rustup_path(ctx))
            .to_string_lossy()
            .into_owned()
    }

    fn installed_version(ctx: &Context<'_>) -> String {
        ctx.executor
            .run_unchecked(&Self::program(ctx), &["--version"])
            .ok()
            .and_then(|r| extract_version(&r.stdout))
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Let an existing rustup replace itself with the latest release.
    fn self_update(ctx: &Context<'_>) -> Result<UnitOutcome> {
        let before = Self::installed_version(ctx);
        ctx.log.info("running rustup self update");
        let result = ctx
            .executor
            .run_unchecked(&Self::program(ctx), &["self", "update"])?;
        if !result.success {
            if result.stderr.contains(SELF_UPDATE_DISABLED) {
                return Ok(UnitOutcome::Skipped(
                    "rustup is managed by the system package manager".to_string(),
                ));
            }
            bail!("rustup self update failed: {}", result.stderr.trim());
        }
        let after = Self::installed_version(ctx);
        if after == before {
            return Ok(UnitOutcome::AlreadyPresent(after));
        }
        let mut extra = BTreeMap::new();
        extra.insert("source".to_string(), "rustup self update".to_string());
        Ok(UnitOutcome::Installed {
            version: after,
            method: Method::Upstream,
            extra,
        })
    }
}

impl Unit for RustupUnit {
    fn id(&self) -> &str {
        "rustup"
    }

    fn is_satisfied(&self, ctx: &Context<'_>) -> Result<bool> {
        Ok(Self::present(ctx))
    }

    fn install(&self, ctx: &Context<'_>) -> Result<UnitOutcome> {
        // Only reached for a present rustup when the satisfied check is
        // bypassed, i.e. by `update`.
        if Self::present(ctx) {
            return Self::self_update(ctx);
        }

        let url = Self::installer_url(ctx);
        let cached = ctx
            .pipeline
            .fetch_upstream("rustup", &url, &format!("{url}.sha256"))?;
        let staging = tempfile::tempdir().context("creating installer staging directory")?;
        let installer = install_binary(&cached, staging.path(), "rustup-init")?;

        ctx.log.info("running rustup-init");
        ctx.executor
            .run(&installer.to_string_lossy(), INSTALLER_ARGS)
            .context("rustup-init failed")?;

        let mut extra = BTreeMap::new();
        extra.insert("source".to_string(), url);
        Ok(UnitOutcome::Installed {
            version: Self::installed_version(ctx),
            method: Method::Upstream,
            extra,
        })
    }

    fn is_present(&self, ctx: &Context<'_>) -> Option<bool> {
        Some(Self::present(ctx))
    }

    fn is_updatable(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::MockExecutor;
    use crate::packages::PackageManager;
    use crate::pipeline::compute_sha256;
    use crate::units::test_helpers::TestBed;

    #[test]
    fn present_rustup_is_satisfied() {
        let bed = TestBed::new(PackageManager::Apt);
        let exec = MockExecutor::default().with_path(&["rustup"]);
        let ctx = bed.context(&exec);
        assert!(RustupUnit.is_satisfied(&ctx).unwrap());
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn update_runs_self_update_and_records_new_version() {
        let bed = TestBed::new(PackageManager::Apt);
        let exec = MockExecutor::with_responses(vec![
            (true, "rustup 1.27.1 (54dd3d00f 2024-04-24)".to_string()),
            (true, "info: checking for self-update".to_string()),
            (true, "rustup 1.28.2 (e4f3ad6f8 2025-04-28)".to_string()),
        ])
        .with_path(&["rustup"]);
        let ctx = bed.context(&exec);

        match RustupUnit.install(&ctx).unwrap() {
            UnitOutcome::Installed {
                version, method, ..
            } => {
                assert_eq!(version, "1.28.2");
                assert_eq!(method, Method::Upstream);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(exec.calls()[1], "/usr/bin/rustup self update");
    }

    #[test]
    fn update_without_new_release_leaves_record() {
        let bed = TestBed::new(PackageManager::Apt);
        let exec = MockExecutor::with_responses(vec![
            (true, "rustup 1.28.2".to_string()),
            (true, String::new()),
            (true, "rustup 1.28.2".to_string()),
        ])
        .with_path(&["rustup"]);
        let ctx = bed.context(&exec);
        assert_eq!(
            RustupUnit.install(&ctx).unwrap(),
            UnitOutcome::AlreadyPresent("1.28.2".to_string())
        );
    }

    #[test]
    fn distribution_rustup_is_skipped() {
        let bed = TestBed::new(PackageManager::Apt);
        let exec = MockExecutor::with_responses(vec![
            (true, "rustup 1.27.1".to_string()),
            (false, "error: self-update is disabled for this build of rustup".to_string()),
        ])
        .with_path(&["rustup"]);
        let ctx = bed.context(&exec);
        assert!(matches!(
            RustupUnit.install(&ctx).unwrap(),
            UnitOutcome::Skipped(_)
        ));
    }

    #[test]
    fn installer_is_verified_then_run() {
        let mut bed = TestBed::new(PackageManager::Apt);
        let payload = bed.dir.path().join("payload");
        std::fs::write(&payload, b"#!/bin/sh\n").unwrap();
        let digest = compute_sha256(&payload).unwrap();
        bed.transport.expect_get_text().times(1).returning(move |url, _| {
            assert!(url.ends_with("/x86_64-unknown-linux-gnu/rustup-init.sha256"), "{url}");
            Ok(format!("{digest}  target/x86_64-unknown-linux-gnu/release/rustup-init\n"))
        });
        bed.transport.expect_download().times(1).returning(|_, dest| {
            std::fs::write(dest, b"#!/bin/sh\n").unwrap();
            Ok(10)
        });
        let exec = MockExecutor::with_responses(vec![
            (true, String::new()),
            (true, "rustup 1.27.1".to_string()),
        ]);
        let ctx = bed.context(&exec);

        match RustupUnit.install(&ctx).unwrap() {
            UnitOutcome::Installed {
                version, method, ..
            } => {
                assert_eq!(version, "1.27.1");
                assert_eq!(method, Method::Upstream);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let calls = exec.calls();
        assert!(calls[0].ends_with("rustup-init -y --no-modify-path"), "{}", calls[0]);
    }

    #[test]
    fn failed_installer_is_an_error() {
        let mut bed = TestBed::new(PackageManager::Apt);
        let payload = bed.dir.path().join("payload");
        std::fs::write(&payload, b"x").unwrap();
        let digest = compute_sha256(&payload).unwrap();
        bed.transport
            .expect_get_text()
            .returning(move |_, _| Ok(format!("{digest}  rustup-init\n")));
        bed.transport.expect_download().returning(|_, dest| {
            std::fs::write(dest, b"x").unwrap();
            Ok(1)
        });
        let exec = MockExecutor::fail();
        let ctx = bed.context(&exec);
        assert!(RustupUnit.install(&ctx).is_err());
    }
}
