// Shared helpers for integration tests.
//
// Provides a stateful fake host (package manager, PATH, version banners), an
// in-memory HTTP transport and a temporary-directory-backed harness so each
// integration test can drive a real command end to end without touching the
// machine or the network.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use devsetup_cli::commands::Session;
use devsetup_cli::error::TransportError;
use devsetup_cli::exec::{ExecResult, Executor};
use devsetup_cli::http::Transport;
use devsetup_cli::logging::Logger;
use devsetup_cli::pipeline::RetryPolicy;
use devsetup_cli::prompt::FixedPrompt;
use devsetup_cli::settings::Settings;
use devsetup_cli::state::StateStore;

/// Commands each apt package puts on `PATH`.
const APT_COMMANDS: &[(&str, &str)] = &[
    ("xz-utils", "xz"),
    ("ripgrep", "rg"),
    ("fd-find", "fdfind"),
    ("bat", "batcat"),
    ("nodejs", "node"),
    ("neovim", "nvim"),
];

/// Release-binary tools and their repositories.
pub const RELEASE_TOOLS: &[(&str, &str)] = &[
    ("starship", "starship/starship"),
    ("just", "casey/just"),
    ("fzf", "junegunn/fzf"),
    ("uv", "astral-sh/uv"),
];

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(64);
    for b in Sha256::digest(bytes) {
        write!(hex, "{b:02x}").unwrap();
    }
    hex
}

/// A Debian-like host that remembers what it installed.
#[derive(Debug, Default)]
pub struct FakeSystem {
    installed: Mutex<HashSet<String>>,
    on_path: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeSystem {
    /// A host with apt and nothing else installed.
    pub fn apt() -> Self {
        let system = Self::default();
        system.add_command("apt-get");
        system
    }

    /// Put `command` on `PATH`.
    pub fn add_command(&self, command: &str) {
        self.on_path.lock().unwrap().insert(command.to_string());
    }

    /// Take `command` off `PATH`.
    pub fn remove_command(&self, command: &str) {
        self.on_path.lock().unwrap().remove(command);
    }

    /// Make installs of `package` fail.
    pub fn fail_package(&self, package: &str) {
        self.failing.lock().unwrap().insert(package.to_string());
    }

    /// Every command line run so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Packages passed to `apt-get install`, in order.
    pub fn package_installs(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|c| c.contains("apt-get install"))
            .filter_map(|c| c.rsplit(' ').next().map(String::from))
            .collect()
    }

    fn respond(&self, program: &str, args: &[&str]) -> (bool, String) {
        match (program, args) {
            ("id", _) => (true, "1000\n".to_string()),
            ("sudo", ["env", rest @ ..]) => {
                let mut rest = rest.iter().skip_while(|a| a.contains('='));
                let Some(inner) = rest.next() else {
                    return (false, "sudo: no command".to_string());
                };
                let inner_args: Vec<&str> = rest.copied().collect();
                self.respond(inner, &inner_args)
            }
            ("dpkg-query", ["-W", format, package]) => {
                if !self.installed.lock().unwrap().contains(*package) {
                    return (false, format!("dpkg-query: no packages found matching {package}"));
                }
                if format.contains("Status") {
                    (true, "install ok installed".to_string())
                } else {
                    (true, "1.0.0-1".to_string())
                }
            }
            ("apt-get", ["update", ..]) => (true, String::new()),
            ("apt-get", ["install", .., package]) => {
                if self.failing.lock().unwrap().contains(*package) {
                    return (false, format!("E: Unable to locate package {package}"));
                }
                self.installed.lock().unwrap().insert((*package).to_string());
                let command = APT_COMMANDS
                    .iter()
                    .find(|(p, _)| p == package)
                    .map_or(*package, |(_, c)| *c);
                self.add_command(command);
                (true, String::new())
            }
            (command, ["--version"]) if self.on_path.lock().unwrap().contains(command) => {
                (true, format!("{command} 1.0.0\n"))
            }
            // Installed scripts echo their own banner.
            (path, ["--version"]) if Path::new(path).is_absolute() && Path::new(path).is_file() => {
                (true, std::fs::read_to_string(path).unwrap_or_default())
            }
            _ => (false, "unexpected call".to_string()),
        }
    }

    fn record(&self, program: &str, args: &[&str]) -> (bool, String) {
        let mut line = program.to_string();
        for a in args {
            line.push(' ');
            line.push_str(a);
        }
        self.calls.lock().unwrap().push(line);
        self.respond(program, args)
    }
}

impl Executor for FakeSystem {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        let (success, stdout) = self.record(program, args);
        if !success {
            anyhow::bail!("{program} failed: {stdout}");
        }
        Ok(ExecResult {
            stdout,
            stderr: String::new(),
            success,
            code: Some(0),
        })
    }

    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        _env: &[(&str, &str)],
    ) -> anyhow::Result<ExecResult> {
        self.run(program, args)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        let (success, stdout) = self.record(program, args);
        Ok(ExecResult {
            stdout,
            stderr: String::new(),
            success,
            code: Some(i32::from(!success)),
        })
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        self.on_path
            .lock()
            .unwrap()
            .contains(program)
            .then(|| PathBuf::from("/usr/bin").join(program))
    }
}

/// In-memory transport; anything not served answers 404.
#[derive(Debug, Default)]
pub struct FakeTransport {
    texts: Mutex<HashMap<String, String>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    flaky: Mutex<HashMap<String, u32>>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    /// Answer GETs of `url` with `body`.
    pub fn serve_text(&self, url: &str, body: &str) {
        self.texts
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    /// Answer downloads of `url` with `bytes`.
    pub fn serve_file(&self, url: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes.to_vec());
    }

    /// Fail the next `times` downloads of `url` with a network error.
    pub fn fail_downloads(&self, url: &str, times: u32) {
        self.flaky.lock().unwrap().insert(url.to_string(), times);
    }

    /// Every requested URL, text and download alike.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of download attempts for `url`.
    pub fn download_attempts(&self, url: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.strip_prefix("download ") == Some(url))
            .count()
    }

    fn not_found(url: &str) -> TransportError {
        TransportError::Status {
            url: url.to_string(),
            code: 404,
        }
    }
}

impl Transport for FakeTransport {
    fn get_text(&self, url: &str, _api: bool) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(format!("get {url}"));
        self.texts
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Self::not_found(url))
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64, TransportError> {
        self.requests.lock().unwrap().push(format!("download {url}"));
        if let Some(left) = self.flaky.lock().unwrap().get_mut(url)
            && *left > 0
        {
            *left -= 1;
            return Err(TransportError::Network {
                url: url.to_string(),
                reason: "connection reset by peer".to_string(),
            });
        }
        let Some(bytes) = self.files.lock().unwrap().get(url).cloned() else {
            return Err(Self::not_found(url));
        };
        std::fs::write(dest, &bytes).map_err(|source| TransportError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        Ok(bytes.len() as u64)
    }
}

/// An isolated host rooted in a [`tempfile::TempDir`].
///
/// The default harness is an apt host where every release tool is already
/// installed at the latest version, rustup is present, the zsh plugins are
/// cloned and `DEVSETUP_SKIP_CHSH` is set, so a full install can succeed.
pub struct Harness {
    /// Scratch directory holding home, XDG dirs and the repository root.
    pub dir: tempfile::TempDir,
    /// Settings pointing into `dir`.
    pub settings: Settings,
    /// Logger without a log file.
    pub log: Logger,
    /// Answer for every confirmation.
    pub prompt: FixedPrompt,
    /// Fake host.
    pub system: FakeSystem,
    /// Fake network.
    pub transport: FakeTransport,
}

/// A repository at `path` with one commit containing `file`, as left by a
/// finished clone.
fn commit_checkout(path: &Path, file: &str) {
    let repo = git2::Repository::init(path).expect("init plugin repo");
    std::fs::write(path.join(file), "# plugin\n").expect("write plugin file");
    let mut index = repo.index().expect("open index");
    index.add_path(Path::new(file)).expect("stage plugin file");
    index.write().expect("write index");
    let tree = repo
        .find_tree(index.write_tree().expect("write tree"))
        .expect("find tree");
    let sig = git2::Signature::now("dev", "dev@example.com").expect("signature");
    repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
        .expect("commit");
}

impl Harness {
    /// A ready-to-install apt host.
    pub fn apt_host() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let system = FakeSystem::apt();
        let transport = FakeTransport::default();
        for (tool, repo) in RELEASE_TOOLS {
            system.add_command(tool);
            transport.serve_text(
                &format!("https://api.github.com/repos/{repo}/releases/latest"),
                r#"{"tag_name": "v1.0.0", "name": "1.0.0"}"#,
            );
        }
        system.add_command("rustup");

        let home = dir.path().join("home");
        for plugin in ["zsh-autosuggestions", "zsh-syntax-highlighting"] {
            let path = home.join(".zsh/plugins").join(plugin);
            std::fs::create_dir_all(&path).expect("create plugin dir");
            commit_checkout(&path, &format!("{plugin}.zsh"));
        }
        let config = dir.path().join("repo/config");
        std::fs::create_dir_all(&config).expect("create config dir");
        std::fs::write(
            config.join(".zshrc"),
            "export PATH={{HOME}}/.local/bin:$PATH\n",
        )
        .expect("write .zshrc");

        let settings = load_settings(dir.path());
        Self {
            dir,
            settings,
            log: Logger::with_log_file(None),
            prompt: FixedPrompt(true),
            system,
            transport,
        }
    }

    /// Pin tool versions through the config file.
    pub fn with_pins(mut self, pins: &[(&str, &str)]) -> Self {
        let config_dir = self.dir.path().join("xdg/devsetup");
        std::fs::create_dir_all(&config_dir).expect("create config dir");
        let mut body = "[versions]\n".to_string();
        for (tool, version) in pins {
            writeln!(body, "{tool} = \"{version}\"").unwrap();
        }
        std::fs::write(config_dir.join("config.toml"), body).expect("write config.toml");
        self.settings = load_settings(self.dir.path());
        self
    }

    /// Session over the fakes with immediate retries.
    pub fn session(&self) -> Session<'_> {
        Session {
            settings: &self.settings,
            executor: &self.system,
            transport: &self.transport,
            log: &self.log,
            prompt: &self.prompt,
            retry: RetryPolicy::immediate(),
        }
    }

    /// Store over the harness state file.
    pub fn store(&self) -> StateStore {
        StateStore::new(self.settings.state_path.clone(), "test")
    }

    /// The fake home directory.
    pub fn home(&self) -> &Path {
        &self.settings.home
    }
}

fn load_settings(root: &Path) -> Settings {
    let home = root.join("home").display().to_string();
    let xdg = root.join("xdg").display().to_string();
    Settings::from_lookup(
        |key| match key {
            "HOME" => Some(home.clone()),
            "USER" => Some("dev".to_string()),
            "SHELL" => Some("/bin/bash".to_string()),
            "DEVSETUP_SKIP_CHSH" => Some("1".to_string()),
            "XDG_CONFIG_HOME" | "XDG_CACHE_HOME" | "XDG_STATE_HOME" => Some(xdg.clone()),
            _ => None,
        },
        root.join("repo"),
        false,
    )
    .expect("load settings")
}
