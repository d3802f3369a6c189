//! Tools installed from verified GitHub release artifacts.
use std::collections::BTreeMap;

use anyhow::Result;

use super::{Context, Unit, UnitOutcome};
use crate::pipeline::{Acquired, DownloadSpec};
use crate::state::Method;

/// A tool fetched through the binary acquisition pipeline.
///
/// Never reports itself satisfied up front: the pipeline's version check
/// decides, so an outdated local copy gets replaced.
#[derive(Debug, Clone, Copy)]
pub struct BinaryUnit {
    spec: DownloadSpec,
}

impl BinaryUnit {
    /// Wrap a download spec.
    #[must_use]
    pub const fn new(spec: DownloadSpec) -> Self {
        Self { spec }
    }

    /// The download spec.
    #[must_use]
    pub const fn spec(&self) -> &DownloadSpec {
        &self.spec
    }
}

impl Unit for BinaryUnit {
    fn id(&self) -> &str {
        self.spec.tool
    }

    fn is_satisfied(&self, _ctx: &Context<'_>) -> Result<bool> {
        Ok(false)
    }

    fn install(&self, ctx: &Context<'_>) -> Result<UnitOutcome> {
        Ok(match ctx.pipeline.install(&self.spec)? {
            Acquired::UpToDate { installed, wanted } => {
                UnitOutcome::AlreadyPresent(format!("{installed} (latest {wanted})"))
            }
            Acquired::Installed { version, path } => {
                let mut extra = BTreeMap::new();
                extra.insert("repo".to_string(), self.spec.repo.to_string());
                extra.insert("path".to_string(), path.display().to_string());
                UnitOutcome::Installed {
                    version,
                    method: Method::Binary,
                    extra,
                }
            }
        })
    }

    fn is_present(&self, ctx: &Context<'_>) -> Option<bool> {
        Some(ctx.has_command(self.spec.command))
    }

    fn is_updatable(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::exec::test_helpers::MockExecutor;
    use crate::packages::PackageManager;
    use crate::pipeline::compute_sha256;
    use crate::units::test_helpers::TestBed;

    const SPEC: DownloadSpec = DownloadSpec {
        tool: "hx",
        repo: "example/hx",
        artifact: "hx-{arch}",
        manifest: "SHA256SUMS",
        binary: "hx",
        command: "hx",
        raw: true,
    };

    #[test]
    fn installed_record_carries_repo_and_path() {
        let mut bed = TestBed::new(PackageManager::Apt);
        bed.settings.pinned.insert("hx".to_string(), "2.0.0".to_string());
        let payload = bed.dir.path().join("payload");
        std::fs::write(&payload, b"hx binary").unwrap();
        let digest = compute_sha256(&payload).unwrap();
        bed.transport
            .expect_get_text()
            .returning(move |_, _| Ok(format!("{digest}  hx-x86_64\n")));
        bed.transport.expect_download().returning(|_, dest| {
            std::fs::write(dest, b"hx binary").unwrap();
            Ok(9)
        });
        let exec = MockExecutor::default();
        let ctx = bed.context(&exec);

        match BinaryUnit::new(SPEC).install(&ctx).unwrap() {
            UnitOutcome::Installed {
                version,
                method,
                extra,
            } => {
                assert_eq!(version, "2.0.0");
                assert_eq!(method, Method::Binary);
                assert_eq!(extra.get("repo").map(String::as_str), Some("example/hx"));
                assert!(extra.contains_key("path"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(BinaryUnit::new(SPEC).is_present(&ctx).unwrap());
    }

    #[test]
    fn pipeline_errors_survive_as_pipeline_errors() {
        let mut bed = TestBed::new(PackageManager::Apt);
        bed.settings.pinned.insert("hx".to_string(), "2.0.0".to_string());
        bed.transport
            .expect_get_text()
            .returning(|_, _| Ok("nothing useful\n".to_string()));
        let exec = MockExecutor::default();
        let ctx = bed.context(&exec);

        let err = BinaryUnit::new(SPEC).install(&ctx).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ChecksumUnavailable { .. })
        ));
    }

    #[test]
    fn never_satisfied_up_front() {
        let bed = TestBed::new(PackageManager::Apt);
        let exec = MockExecutor::default().with_path(&["hx"]);
        let ctx = bed.context(&exec);
        assert!(!BinaryUnit::new(SPEC).is_satisfied(&ctx).unwrap());
        assert!(BinaryUnit::new(SPEC).is_updatable());
    }
}
