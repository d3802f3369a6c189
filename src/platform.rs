//! Host detection producing the immutable [`Environment`] passed to every
//! backend and the scheduler.
use std::fmt;

use crate::error::PlatformError;
use crate::exec::Executor;
use crate::packages::PackageManager;

/// Detected operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Any Linux distribution.
    Linux,
    /// macOS.
    Macos,
}

impl Os {
    /// Lowercase name used in artifact templates (`{os}`).
    #[must_use]
    pub const fn artifact_name(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "darwin",
        }
    }

    /// Capitalised name used in artifact templates (`{Os}`).
    #[must_use]
    pub const fn artifact_title(self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::Macos => "Darwin",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Macos => write!(f, "macos"),
        }
    }
}

/// Detected CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    /// 64-bit x86.
    X86_64,
    /// 64-bit ARM.
    Aarch64,
}

impl Arch {
    /// Canonical name (`{arch}`).
    #[must_use]
    pub const fn canonical(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }

    /// Alternate Go/Debian-style name (`{arch_alt}`).
    #[must_use]
    pub const fn alternate(self) -> &'static str {
        match self {
            Self::X86_64 => "amd64",
            Self::Aarch64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// Immutable description of the host, constructed once before phase 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Operating system.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
    /// Native package manager, fixed for the run.
    pub package_manager: PackageManager,
    /// Whether the process runs as uid 0 (no `sudo` needed).
    pub is_root: bool,
}

impl Environment {
    /// Create an environment with explicit values.
    #[must_use]
    pub const fn new(os: Os, arch: Arch, package_manager: PackageManager, is_root: bool) -> Self {
        Self {
            os,
            arch,
            package_manager,
            is_root,
        }
    }

    /// Detect the current host.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the OS or architecture is unsupported or
    /// no supported package manager is on `PATH`.
    pub fn detect(executor: &dyn Executor) -> Result<Self, PlatformError> {
        let os = parse_os(std::env::consts::OS)?;
        let arch = parse_arch(std::env::consts::ARCH)?;
        let package_manager = detect_package_manager(os, executor)?;
        let is_root = executor
            .run_unchecked("id", &["-u"])
            .is_ok_and(|r| r.success && r.stdout.trim() == "0");
        Ok(Self::new(os, arch, package_manager, is_root))
    }

    /// Rust toolchain triple (`{target}`); Linux artifacts use musl builds.
    #[must_use]
    pub const fn target_triple(&self) -> &'static str {
        match (self.os, self.arch) {
            (Os::Linux, Arch::X86_64) => "x86_64-unknown-linux-musl",
            (Os::Linux, Arch::Aarch64) => "aarch64-unknown-linux-musl",
            (Os::Macos, Arch::X86_64) => "x86_64-apple-darwin",
            (Os::Macos, Arch::Aarch64) => "aarch64-apple-darwin",
        }
    }

    /// Rust toolchain triple with the glibc environment, used by installers
    /// that ship gnu builds only.
    #[must_use]
    pub const fn gnu_target_triple(&self) -> &'static str {
        match (self.os, self.arch) {
            (Os::Linux, Arch::X86_64) => "x86_64-unknown-linux-gnu",
            (Os::Linux, Arch::Aarch64) => "aarch64-unknown-linux-gnu",
            (Os::Macos, Arch::X86_64) => "x86_64-apple-darwin",
            (Os::Macos, Arch::Aarch64) => "aarch64-apple-darwin",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.os, self.arch, self.package_manager)
    }
}

fn parse_os(name: &str) -> Result<Os, PlatformError> {
    match name {
        "linux" => Ok(Os::Linux),
        "macos" => Ok(Os::Macos),
        other => Err(PlatformError::UnsupportedOs(other.to_string())),
    }
}

fn parse_arch(name: &str) -> Result<Arch, PlatformError> {
    match name {
        "x86_64" | "amd64" => Ok(Arch::X86_64),
        "aarch64" | "arm64" => Ok(Arch::Aarch64),
        other => Err(PlatformError::UnsupportedArch(other.to_string())),
    }
}

fn detect_package_manager(os: Os, executor: &dyn Executor) -> Result<PackageManager, PlatformError> {
    let candidates: &[PackageManager] = match os {
        Os::Macos => &[PackageManager::Brew],
        Os::Linux => &[
            PackageManager::Apt,
            PackageManager::Dnf,
            PackageManager::Pacman,
            PackageManager::Brew,
        ],
    };
    candidates
        .iter()
        .copied()
        .find(|pm| executor.which(pm.detect_command()).is_some())
        .ok_or_else(|| {
            let names: Vec<&str> = candidates.iter().map(|pm| pm.detect_command()).collect();
            PlatformError::NoPackageManager(names.join(", "))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::MockExecutor;

    #[test]
    fn parse_supported_os() {
        assert_eq!(parse_os("linux").unwrap(), Os::Linux);
        assert_eq!(parse_os("macos").unwrap(), Os::Macos);
    }

    #[test]
    fn parse_unsupported_os() {
        let err = parse_os("windows").unwrap_err();
        assert_eq!(err.to_string(), "unsupported operating system: windows");
    }

    #[test]
    fn parse_arch_aliases() {
        assert_eq!(parse_arch("amd64").unwrap(), Arch::X86_64);
        assert_eq!(parse_arch("arm64").unwrap(), Arch::Aarch64);
        assert!(parse_arch("riscv64").is_err());
    }

    #[test]
    fn apt_preferred_on_linux() {
        let exec = MockExecutor::default().with_path(&["apt-get", "brew"]);
        assert_eq!(
            detect_package_manager(Os::Linux, &exec).unwrap(),
            PackageManager::Apt
        );
    }

    #[test]
    fn pacman_detected() {
        let exec = MockExecutor::default().with_path(&["pacman"]);
        assert_eq!(
            detect_package_manager(Os::Linux, &exec).unwrap(),
            PackageManager::Pacman
        );
    }

    #[test]
    fn macos_requires_brew() {
        let exec = MockExecutor::default().with_path(&["apt-get"]);
        let err = detect_package_manager(Os::Macos, &exec).unwrap_err();
        assert!(matches!(err, PlatformError::NoPackageManager(_)));
    }

    #[test]
    fn no_package_manager_lists_candidates() {
        let exec = MockExecutor::default();
        let err = detect_package_manager(Os::Linux, &exec).unwrap_err();
        assert!(err.to_string().contains("apt-get, dnf, pacman, brew"));
    }

    #[test]
    fn target_triples() {
        let env = Environment::new(Os::Linux, Arch::Aarch64, PackageManager::Apt, false);
        assert_eq!(env.target_triple(), "aarch64-unknown-linux-musl");
        assert_eq!(env.gnu_target_triple(), "aarch64-unknown-linux-gnu");
        let env = Environment::new(Os::Macos, Arch::X86_64, PackageManager::Brew, false);
        assert_eq!(env.target_triple(), "x86_64-apple-darwin");
    }

    #[test]
    fn arch_names() {
        assert_eq!(Arch::X86_64.canonical(), "x86_64");
        assert_eq!(Arch::X86_64.alternate(), "amd64");
        assert_eq!(Arch::Aarch64.alternate(), "arm64");
    }

    #[test]
    fn environment_display() {
        let env = Environment::new(Os::Linux, Arch::X86_64, PackageManager::Dnf, true);
        assert_eq!(env.to_string(), "linux/x86_64 (dnf)");
    }
}
