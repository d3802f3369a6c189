//! Native package manager backends behind one install / is-installed /
//! installed-version contract.
mod alias;
mod installer;

pub use alias::link_alias;
pub use installer::{PackageInstaller, PackageOutcome};

use std::fmt;

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// Debian and Ubuntu (`apt-get` / `dpkg-query`).
    Apt,
    /// Fedora and RHEL (`dnf` / `rpm`).
    Dnf,
    /// Arch Linux (`pacman`).
    Pacman,
    /// Homebrew on macOS or Linux.
    Brew,
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apt => write!(f, "apt"),
            Self::Dnf => write!(f, "dnf"),
            Self::Pacman => write!(f, "pacman"),
            Self::Brew => write!(f, "brew"),
        }
    }
}

/// A command line with optional extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program to run.
    pub program: &'static str,
    /// Arguments.
    pub args: Vec<String>,
    /// Extra environment variables.
    pub env: Vec<(&'static str, &'static str)>,
}

impl CommandLine {
    fn new(program: &'static str, args: &[&str]) -> Self {
        Self {
            program,
            args: args.iter().map(|a| (*a).to_string()).collect(),
            env: Vec::new(),
        }
    }

    fn with_env(mut self, key: &'static str, value: &'static str) -> Self {
        self.env.push((key, value));
        self
    }

    /// Wrap the command in `sudo env ...` so extra variables survive
    /// sudo's environment reset.
    #[must_use]
    pub fn with_sudo(self) -> Self {
        let mut args: Vec<String> = vec!["env".to_string()];
        args.extend(self.env.iter().map(|(k, v)| format!("{k}={v}")));
        args.push(self.program.to_string());
        args.extend(self.args);
        Self {
            program: "sudo",
            args,
            env: Vec::new(),
        }
    }
}

impl PackageManager {
    /// Program whose presence on `PATH` selects this manager.
    #[must_use]
    pub const fn detect_command(self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Pacman => "pacman",
            Self::Brew => "brew",
        }
    }

    /// Whether installs and refreshes need root.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        !matches!(self, Self::Brew)
    }

    /// Command that exits zero iff `package` is installed.
    #[must_use]
    pub fn query_command(self, package: &str) -> CommandLine {
        match self {
            Self::Apt => CommandLine::new("dpkg-query", &["-W", "-f=${Status}", package]),
            Self::Dnf => CommandLine::new("rpm", &["-q", package]),
            Self::Pacman => CommandLine::new("pacman", &["-Q", package]),
            Self::Brew => CommandLine::new("brew", &["list", "--versions", package]),
        }
    }

    /// Interpret the output of [`query_command`](Self::query_command).
    #[must_use]
    pub fn query_says_installed(self, success: bool, stdout: &str) -> bool {
        match self {
            Self::Apt => success && stdout.contains("install ok installed"),
            Self::Brew => success && !stdout.trim().is_empty(),
            Self::Dnf | Self::Pacman => success,
        }
    }

    /// Command printing the installed version of `package`.
    #[must_use]
    pub fn version_command(self, package: &str) -> CommandLine {
        match self {
            Self::Apt => CommandLine::new("dpkg-query", &["-W", "-f=${Version}", package]),
            Self::Dnf => CommandLine::new("rpm", &["-q", "--queryformat", "%{VERSION}", package]),
            Self::Pacman => CommandLine::new("pacman", &["-Q", package]),
            Self::Brew => CommandLine::new("brew", &["list", "--versions", package]),
        }
    }

    /// Extract the upstream version from [`version_command`](Self::version_command) output.
    ///
    /// Strips distribution epochs and package revisions, so `1:2.39.2-1ubuntu1`
    /// becomes `2.39.2`.
    #[must_use]
    pub fn parse_version(self, stdout: &str) -> Option<String> {
        let raw = match self {
            Self::Apt | Self::Dnf => stdout.split_whitespace().next(),
            Self::Pacman | Self::Brew => stdout.split_whitespace().nth(1),
        }?;
        let without_epoch = raw.split_once(':').map_or(raw, |(_, v)| v);
        let upstream = match self {
            Self::Brew => without_epoch.split('_').next(),
            _ => without_epoch.split('-').next(),
        }?;
        (!upstream.is_empty()).then(|| upstream.to_string())
    }

    /// Bounded index refresh, run at most once per session.
    #[must_use]
    pub fn refresh_command(self) -> CommandLine {
        match self {
            Self::Apt => CommandLine::new("apt-get", &["update", "-qq"])
                .with_env("DEBIAN_FRONTEND", "noninteractive"),
            Self::Dnf => CommandLine::new("dnf", &["makecache", "-q"]),
            Self::Pacman => CommandLine::new("pacman", &["-Sy", "--noconfirm"]),
            Self::Brew => CommandLine::new("brew", &["update", "--quiet"]),
        }
    }

    /// Non-interactive install of one package.
    #[must_use]
    pub fn install_command(self, package: &str) -> CommandLine {
        match self {
            Self::Apt => CommandLine::new("apt-get", &["install", "-y", "-qq", package])
                .with_env("DEBIAN_FRONTEND", "noninteractive"),
            Self::Dnf => CommandLine::new("dnf", &["install", "-y", "-q", package]),
            Self::Pacman => CommandLine::new("pacman", &["-S", "--needed", "--noconfirm", package]),
            Self::Brew => CommandLine::new("brew", &["install", "--quiet", package])
                .with_env("HOMEBREW_NO_AUTO_UPDATE", "1"),
        }
    }
}
