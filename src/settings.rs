//! Run settings assembled from environment variables and an optional TOML
//! config file.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Contents of `$XDG_CONFIG_HOME/devsetup/config.toml`.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Override for the user binary directory; `~` is expanded.
    #[serde(default)]
    pub bin_dir: Option<String>,
    /// Pinned versions by tool id.
    #[serde(default)]
    pub versions: BTreeMap<String, String>,
}

impl FileConfig {
    /// Load the config file, returning defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }
}

/// Everything a run needs to know about its surroundings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// User home directory.
    pub home: PathBuf,
    /// Login name substituted into deployed configs.
    pub user: String,
    /// Repository root holding `config/`.
    pub root: PathBuf,
    /// Directory binaries are installed into.
    pub bin_dir: PathBuf,
    /// Location of the state document.
    pub state_path: PathBuf,
    /// Download cache directory.
    pub cache_dir: PathBuf,
    /// Skip all interactive prompts (`DEVSETUP_YES`).
    pub assume_yes: bool,
    /// Forward captured command output to debug logging (`DEVSETUP_VERBOSE`).
    pub verbose: bool,
    /// Current shell path (`SHELL`).
    pub shell: String,
    /// Leave the login shell alone (`DEVSETUP_SKIP_CHSH`).
    pub skip_chsh: bool,
    /// Running under CI (`CI`).
    pub ci: bool,
    /// Token for authenticated GitHub API requests (`GITHUB_TOKEN`).
    pub github_token: Option<String>,
    /// Pinned versions overriding the resolver.
    pub pinned: BTreeMap<String, String>,
}

impl Settings {
    /// Assemble settings from the process environment and the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if `HOME` is unset or the config file is malformed.
    pub fn load(root: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        Self::from_lookup(|key| std::env::var(key).ok(), root.unwrap_or(cwd), verbose)
    }

    /// Assemble settings from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `HOME` is missing or the config file is malformed.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        root: PathBuf,
        verbose: bool,
    ) -> Result<Self> {
        let home = lookup("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| anyhow::anyhow!("HOME environment variable is not set"))?;
        let xdg = |var: &str, fallback: &str| {
            lookup(var)
                .filter(|v| !v.is_empty())
                .map_or_else(|| home.join(fallback), PathBuf::from)
        };
        let config_dir = xdg("XDG_CONFIG_HOME", ".config").join("devsetup");
        let state_dir = xdg("XDG_STATE_HOME", ".local/state").join("devsetup");
        let cache_dir = xdg("XDG_CACHE_HOME", ".cache").join("devsetup");

        let file = FileConfig::load(&config_dir.join("config.toml"))?;
        let bin_dir = file
            .bin_dir
            .as_deref()
            .map_or_else(|| home.join(".local/bin"), |d| expand_tilde(d, &home));
        let flag = |var: &str| lookup(var).is_some_and(|v| is_truthy(&v));

        Ok(Self {
            user: lookup("USER")
                .or_else(|| lookup("LOGNAME"))
                .unwrap_or_default(),
            root,
            bin_dir,
            state_path: state_dir.join("state.json"),
            cache_dir: cache_dir.join("downloads"),
            assume_yes: flag("DEVSETUP_YES"),
            verbose: verbose || flag("DEVSETUP_VERBOSE"),
            shell: lookup("SHELL").unwrap_or_default(),
            skip_chsh: flag("DEVSETUP_SKIP_CHSH"),
            ci: flag("CI"),
            github_token: lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty()),
            pinned: file.versions,
            home,
        })
    }

    /// Directory holding configuration files to deploy.
    #[must_use]
    pub fn config_source(&self) -> PathBuf {
        self.root.join("config")
    }
}

/// Interpret an environment flag value; unset-like values are false.
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

fn expand_tilde(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        home.to_path_buf()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(path)
    }
}
