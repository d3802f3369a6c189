//! Artifact name placeholders.
use crate::platform::Environment;

/// Values substituted into artifact, manifest and binary path templates.
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    /// Release version without a `v` prefix.
    pub version: &'a str,
    /// Detected environment.
    pub env: &'a Environment,
    /// Expanded artifact name, once known.
    pub artifact: Option<&'a str>,
}

impl<'a> TemplateVars<'a> {
    /// Variables for `version` on `env`.
    #[must_use]
    pub const fn new(version: &'a str, env: &'a Environment) -> Self {
        Self {
            version,
            env,
            artifact: None,
        }
    }

    /// The same variables with `{artifact}` bound.
    #[must_use]
    pub const fn with_artifact(self, artifact: &'a str) -> Self {
        Self {
            artifact: Some(artifact),
            ..self
        }
    }
}

/// Expand `{version}`, `{os}`, `{Os}`, `{arch}`, `{arch_alt}`, `{target}` and
/// `{artifact}` in `template`. Unknown placeholders are left as written.
#[must_use]
pub fn expand(template: &str, vars: &TemplateVars<'_>) -> String {
    let mut out = template
        .replace("{version}", vars.version)
        .replace("{os}", vars.env.os.artifact_name())
        .replace("{Os}", vars.env.os.artifact_title())
        .replace("{arch_alt}", vars.env.arch.alternate())
        .replace("{arch}", vars.env.arch.canonical())
        .replace("{target}", vars.env.target_triple());
    if let Some(artifact) = vars.artifact {
        out = out.replace("{artifact}", artifact);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::PackageManager;
    use crate::platform::{Arch, Os};

    fn linux() -> Environment {
        Environment::new(Os::Linux, Arch::X86_64, PackageManager::Apt, false)
    }

    fn mac_arm() -> Environment {
        Environment::new(Os::Macos, Arch::Aarch64, PackageManager::Brew, false)
    }

    #[test]
    fn expands_target_triple() {
        let env = linux();
        let vars = TemplateVars::new("1.36.0", &env);
        assert_eq!(
            expand("just-{version}-{target}.tar.gz", &vars),
            "just-1.36.0-x86_64-unknown-linux-musl.tar.gz"
        );
    }

    #[test]
    fn expands_os_and_alternate_arch() {
        let env = mac_arm();
        let vars = TemplateVars::new("0.54.0", &env);
        assert_eq!(
            expand("fzf-{version}-{os}_{arch_alt}.tar.gz", &vars),
            "fzf-0.54.0-darwin_arm64.tar.gz"
        );
        assert_eq!(expand("{Os}-{arch}", &vars), "Darwin-aarch64");
    }

    #[test]
    fn artifact_placeholder_needs_binding() {
        let env = linux();
        let vars = TemplateVars::new("1.0.0", &env);
        assert_eq!(expand("{artifact}.sha256", &vars), "{artifact}.sha256");
        let bound = vars.with_artifact("starship.tar.gz");
        assert_eq!(expand("{artifact}.sha256", &bound), "starship.tar.gz.sha256");
    }
}
