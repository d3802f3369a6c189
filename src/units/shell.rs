//! Login shell switch to zsh.
use anyhow::{Context as _, Result, bail};

use super::{Context, Unit, UnitOutcome};

/// Makes zsh the login shell with `chsh`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultShellUnit;

const TARGET: &str = "zsh";

impl Unit for DefaultShellUnit {
    fn id(&self) -> &str {
        "default-shell"
    }

    fn is_satisfied(&self, ctx: &Context<'_>) -> Result<bool> {
        Ok(ctx.settings.shell.ends_with(&format!("/{TARGET}")))
    }

    fn install(&self, ctx: &Context<'_>) -> Result<UnitOutcome> {
        if ctx.settings.skip_chsh {
            return Ok(UnitOutcome::Skipped("DEVSETUP_SKIP_CHSH is set".to_string()));
        }
        if ctx.settings.ci {
            // chsh needs a password prompt.
            return Ok(UnitOutcome::Skipped("running in CI".to_string()));
        }
        let Some(path) = ctx.executor.which(TARGET) else {
            bail!("{TARGET} is not installed");
        };
        let path = path.to_string_lossy().into_owned();
        if !ctx
            .prompt
            .confirm(&format!("Change your login shell to {path}?"), true)
        {
            return Ok(UnitOutcome::Skipped("declined".to_string()));
        }
        ctx.executor
            .run("chsh", &["-s", &path])
            .context("chsh failed")?;
        Ok(UnitOutcome::Configured(format!("login shell set to {path}")))
    }

    fn is_present(&self, _ctx: &Context<'_>) -> Option<bool> {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::MockExecutor;
    use crate::packages::PackageManager;
    use crate::prompt::FixedPrompt;
    use crate::units::test_helpers::TestBed;

    #[test]
    fn satisfied_when_already_zsh() {
        let mut bed = TestBed::new(PackageManager::Apt);
        bed.settings.shell = "/usr/bin/zsh".to_string();
        let exec = MockExecutor::default();
        assert!(DefaultShellUnit.is_satisfied(&bed.context(&exec)).unwrap());
    }

    #[test]
    fn runs_chsh_with_resolved_path() {
        let bed = TestBed::new(PackageManager::Apt);
        let exec = MockExecutor::ok("").with_path(&["zsh"]);
        let ctx = bed.context(&exec);
        assert!(!DefaultShellUnit.is_satisfied(&ctx).unwrap());
        let outcome = DefaultShellUnit.install(&ctx).unwrap();
        assert!(matches!(outcome, UnitOutcome::Configured(_)));
        assert_eq!(exec.calls()[0], "chsh -s /usr/bin/zsh");
    }

    #[test]
    fn skip_flag_wins() {
        let mut bed = TestBed::new(PackageManager::Apt);
        bed.settings.skip_chsh = true;
        let exec = MockExecutor::default().with_path(&["zsh"]);
        let outcome = DefaultShellUnit.install(&bed.context(&exec)).unwrap();
        assert!(matches!(outcome, UnitOutcome::Skipped(_)));
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn ci_is_skipped() {
        let mut bed = TestBed::new(PackageManager::Apt);
        bed.settings.ci = true;
        let exec = MockExecutor::default().with_path(&["zsh"]);
        let outcome = DefaultShellUnit.install(&bed.context(&exec)).unwrap();
        assert!(matches!(outcome, UnitOutcome::Skipped(_)));
    }

    #[test]
    fn declining_skips() {
        let mut bed = TestBed::new(PackageManager::Apt);
        bed.prompt = FixedPrompt(false);
        let exec = MockExecutor::default().with_path(&["zsh"]);
        let outcome = DefaultShellUnit.install(&bed.context(&exec)).unwrap();
        assert_eq!(outcome, UnitOutcome::Skipped("declined".to_string()));
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn missing_zsh_is_an_error() {
        let bed = TestBed::new(PackageManager::Apt);
        let exec = MockExecutor::default();
        assert!(DefaultShellUnit.install(&bed.context(&exec)).is_err());
    }
}
