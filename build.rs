//! Build script that embeds the crate version string.

use std::process::Command;

/// Release builds export `DEVSETUP_VERSION`; local builds use `git describe`.
fn describe() -> Option<String> {
    if let Ok(v) = std::env::var("DEVSETUP_VERSION") {
        return Some(v);
    }
    let out = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    let v = String::from_utf8_lossy(&out.stdout).trim().to_owned();
    (!v.is_empty()).then_some(v)
}

fn main() {
    if let Some(version) = describe() {
        println!("cargo:rustc-env=DEVSETUP_VERSION={version}");
    }
    for path in [".git/HEAD", ".git/refs/"] {
        println!("cargo:rerun-if-changed={path}");
    }
    println!("cargo:rerun-if-env-changed=DEVSETUP_VERSION");
}
