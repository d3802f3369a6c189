//! The fixed, ordered list of phases and their units.
use super::binary::BinaryUnit;
use super::configs::ConfigUnit;
use super::git::GitUnit;
use super::package::{PackageNames, PackageUnit};
use super::shell::DefaultShellUnit;
use super::upstream::RustupUnit;
use super::Unit;
use crate::pipeline::DownloadSpec;

/// An ordered group of units; completion is tracked per phase.
pub struct Phase {
    /// Position in the catalogue, used as the state index.
    pub index: usize,
    /// Display name.
    pub name: &'static str,
    /// Units in run order.
    pub units: Vec<Box<dyn Unit>>,
}

impl std::fmt::Debug for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.units.iter().map(|u| u.id()).collect();
        f.debug_struct("Phase")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("units", &ids)
            .finish()
    }
}

impl Phase {
    /// Whether `id` belongs to this phase.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.units.iter().any(|u| u.id() == id)
    }
}

const STARSHIP: DownloadSpec = DownloadSpec {
    tool: "starship",
    repo: "starship/starship",
    artifact: "starship-{target}.tar.gz",
    manifest: "{artifact}.sha256",
    binary: "starship",
    command: "starship",
    raw: false,
};

const JUST: DownloadSpec = DownloadSpec {
    tool: "just",
    repo: "casey/just",
    artifact: "just-{version}-{target}.tar.gz",
    manifest: "SHA256SUMS",
    binary: "just",
    command: "just",
    raw: false,
};

const FZF: DownloadSpec = DownloadSpec {
    tool: "fzf",
    repo: "junegunn/fzf",
    artifact: "fzf-{version}-{os}_{arch_alt}.tar.gz",
    manifest: "fzf_{version}_checksums.txt",
    binary: "fzf",
    command: "fzf",
    raw: false,
};

const UV: DownloadSpec = DownloadSpec {
    tool: "uv",
    repo: "astral-sh/uv",
    artifact: "uv-{target}.tar.gz",
    manifest: "{artifact}.sha256",
    binary: "uv-{target}/uv",
    command: "uv",
    raw: false,
};

fn phase(index: usize, name: &'static str, units: Vec<Box<dyn Unit>>) -> Phase {
    Phase { index, name, units }
}

/// Every phase, in run order.
#[must_use]
pub fn catalogue() -> Vec<Phase> {
    vec![
        phase(
            0,
            "Prerequisites",
            vec![
                Box::new(PackageUnit::simple("curl")),
                Box::new(PackageUnit::simple("git")),
                Box::new(PackageUnit::simple("unzip")),
                Box::new(PackageUnit::new(
                    "xz",
                    "xz",
                    PackageNames {
                        apt: "xz-utils",
                        ..PackageNames::same("xz")
                    },
                )),
                Box::new(PackageUnit::simple("bzip2")),
            ],
        ),
        phase(
            1,
            "Shell",
            vec![
                Box::new(PackageUnit::simple("zsh")),
                Box::new(GitUnit::new(
                    "zsh-autosuggestions",
                    "https://github.com/zsh-users/zsh-autosuggestions.git",
                    ".zsh/plugins/zsh-autosuggestions",
                )),
                Box::new(GitUnit::new(
                    "zsh-syntax-highlighting",
                    "https://github.com/zsh-users/zsh-syntax-highlighting.git",
                    ".zsh/plugins/zsh-syntax-highlighting",
                )),
                Box::new(PackageUnit::simple("tmux")),
                Box::new(DefaultShellUnit),
            ],
        ),
        phase(
            2,
            "CLI tools",
            vec![
                Box::new(PackageUnit::new("ripgrep", "rg", PackageNames::same("ripgrep"))),
                Box::new(
                    PackageUnit::new(
                        "fd",
                        "fd",
                        PackageNames {
                            apt: "fd-find",
                            dnf: "fd-find",
                            ..PackageNames::same("fd")
                        },
                    )
                    .with_alias("fdfind"),
                ),
                Box::new(PackageUnit::simple("bat").with_alias("batcat")),
                Box::new(PackageUnit::simple("jq")),
                Box::new(PackageUnit::simple("htop")),
                Box::new(PackageUnit::simple("tree")),
            ],
        ),
        phase(
            3,
            "Binary tools",
            vec![
                Box::new(BinaryUnit::new(STARSHIP)),
                Box::new(BinaryUnit::new(JUST)),
                Box::new(BinaryUnit::new(FZF)),
                Box::new(BinaryUnit::new(UV)),
            ],
        ),
        phase(
            4,
            "Runtimes",
            vec![
                Box::new(RustupUnit),
                Box::new(PackageUnit::new(
                    "nodejs",
                    "node",
                    PackageNames {
                        brew: "node",
                        ..PackageNames::same("nodejs")
                    },
                )),
                Box::new(PackageUnit::new(
                    "python3",
                    "python3",
                    PackageNames {
                        pacman: "python",
                        brew: "python",
                        ..PackageNames::same("python3")
                    },
                )),
                Box::new(PackageUnit::new("neovim", "nvim", PackageNames::same("neovim"))),
            ],
        ),
        phase(5, "Configuration", vec![Box::new(ConfigUnit)]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::PackageManager;
    use crate::platform::{Arch, Environment, Os};
    use crate::pipeline::{TemplateVars, expand};
    use std::collections::HashSet;

    #[test]
    fn indices_match_positions() {
        for (i, phase) in catalogue().iter().enumerate() {
            assert_eq!(phase.index, i);
        }
    }

    #[test]
    fn unit_ids_are_unique() {
        let mut seen = HashSet::new();
        for phase in catalogue() {
            for unit in &phase.units {
                assert!(seen.insert(unit.id().to_string()), "duplicate {}", unit.id());
            }
        }
    }

    #[test]
    fn catalogue_layout() {
        let layout: Vec<String> = catalogue()
            .iter()
            .map(|p| {
                let ids: Vec<&str> = p.units.iter().map(|u| u.id()).collect();
                format!("{} {}: {}", p.index, p.name, ids.join(", "))
            })
            .collect();
        insta::assert_snapshot!(layout.join("\n"), @r"
        0 Prerequisites: curl, git, unzip, xz, bzip2
        1 Shell: zsh, zsh-autosuggestions, zsh-syntax-highlighting, tmux, default-shell
        2 CLI tools: ripgrep, fd, bat, jq, htop, tree
        3 Binary tools: starship, just, fzf, uv
        4 Runtimes: rustup, nodejs, python3, neovim
        5 Configuration: configs
        ");
    }

    #[test]
    fn artifact_names_expand() {
        let env = Environment::new(Os::Linux, Arch::Aarch64, PackageManager::Apt, false);
        let vars = TemplateVars::new("0.54.0", &env);
        assert_eq!(
            expand(FZF.artifact, &vars),
            "fzf-0.54.0-linux_arm64.tar.gz"
        );
        assert_eq!(
            expand(UV.binary, &vars),
            "uv-aarch64-unknown-linux-musl/uv"
        );
    }

    #[test]
    fn only_binary_and_upstream_units_update() {
        let updatable: Vec<String> = catalogue()
            .iter()
            .flat_map(|p| p.units.iter())
            .filter(|u| u.is_updatable())
            .map(|u| u.id().to_string())
            .collect();
        assert_eq!(updatable, ["starship", "just", "fzf", "uv", "rustup"]);
    }
}
