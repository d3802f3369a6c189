#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Integration tests for the binary acquisition pipeline: checksum gate,
//! retry bound, version skip and insecure URL rejection.

mod common;

use common::{Harness, sha256_hex};
use devsetup_cli::error::PipelineError;
use devsetup_cli::packages::PackageManager;
use devsetup_cli::pipeline::{Acquired, DownloadSpec, Pipeline, RetryPolicy};
use devsetup_cli::platform::{Arch, Environment, Os};

const SPEC: DownloadSpec = DownloadSpec {
    tool: "tool",
    repo: "acme/tool",
    artifact: "tool-{version}-{target}",
    manifest: "SHA256SUMS",
    binary: "tool",
    command: "tool",
    raw: true,
};

const ENV: Environment = Environment::new(Os::Linux, Arch::X86_64, PackageManager::Apt, false);

const ARTIFACT: &str = "tool-1.2.0-x86_64-unknown-linux-musl";
const ARTIFACT_URL: &str =
    "https://github.com/acme/tool/releases/download/v1.2.0/tool-1.2.0-x86_64-unknown-linux-musl";
const MANIFEST_URL: &str = "https://github.com/acme/tool/releases/download/v1.2.0/SHA256SUMS";

const PAYLOAD: &[u8] = b"#!/bin/sh\necho tool 1.2.0\n";

fn pinned() -> Harness {
    Harness::apt_host().with_pins(&[("tool", "1.2.0")])
}

fn pipeline(h: &Harness) -> Pipeline<'_> {
    Pipeline::new(&ENV, &h.system, &h.transport, &h.log, &h.settings)
        .with_retry(RetryPolicy::immediate())
}

fn publish_manifest(h: &Harness, digest: &str) {
    h.transport
        .serve_text(MANIFEST_URL, &format!("{digest}  {ARTIFACT}\n"));
}

// ---------------------------------------------------------------------------
// Checksum gate
// ---------------------------------------------------------------------------

#[test]
fn verified_artifact_is_installed() {
    let h = pinned();
    publish_manifest(&h, &sha256_hex(PAYLOAD));
    h.transport.serve_file(ARTIFACT_URL, PAYLOAD);

    let p = pipeline(&h);
    match p.install(&SPEC).unwrap() {
        Acquired::Installed { version, path } => {
            assert_eq!(version, "1.2.0");
            assert_eq!(path, h.settings.bin_dir.join("tool"));
            assert_eq!(std::fs::read(&path).unwrap(), PAYLOAD);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(p.cache_path("tool", "1.2.0", ARTIFACT).exists());
}

#[test]
fn tampered_artifact_is_rejected_and_removed() {
    let h = pinned();
    publish_manifest(&h, &sha256_hex(PAYLOAD));
    h.transport.serve_file(ARTIFACT_URL, b"something else entirely");

    let p = pipeline(&h);
    let err = p.install(&SPEC).unwrap_err();
    match &err {
        PipelineError::ChecksumMismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, &sha256_hex(PAYLOAD));
            assert_eq!(actual, &sha256_hex(b"something else entirely"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.transport.download_attempts(ARTIFACT_URL), 1);
    assert!(!p.cache_path("tool", "1.2.0", ARTIFACT).exists());
    assert!(!h.settings.bin_dir.join("tool").exists());
}

#[test]
fn missing_manifest_stops_before_download() {
    let h = pinned();
    h.transport.serve_file(ARTIFACT_URL, PAYLOAD);

    let err = pipeline(&h).install(&SPEC).unwrap_err();
    assert!(matches!(err, PipelineError::ChecksumUnavailable { .. }), "{err}");
    assert!(err.to_string().contains("checksum unavailable"));
    assert_eq!(h.transport.download_attempts(ARTIFACT_URL), 0);
}

// ---------------------------------------------------------------------------
// Retry bound
// ---------------------------------------------------------------------------

#[test]
fn network_failures_stop_after_three_attempts() {
    let h = pinned();
    publish_manifest(&h, &sha256_hex(PAYLOAD));
    h.transport.fail_downloads(ARTIFACT_URL, 10);

    let err = pipeline(&h).install(&SPEC).unwrap_err();
    match err {
        PipelineError::DownloadFailed { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.transport.download_attempts(ARTIFACT_URL), 3);
}

#[test]
fn success_on_second_attempt_installs() {
    let h = pinned();
    publish_manifest(&h, &sha256_hex(PAYLOAD));
    h.transport.serve_file(ARTIFACT_URL, PAYLOAD);
    h.transport.fail_downloads(ARTIFACT_URL, 1);

    let outcome = pipeline(&h).install(&SPEC).unwrap();
    assert!(matches!(outcome, Acquired::Installed { .. }));
    assert_eq!(h.transport.download_attempts(ARTIFACT_URL), 2);
}

// ---------------------------------------------------------------------------
// Version skip
// ---------------------------------------------------------------------------

#[test]
fn newer_local_version_skips_download() {
    // The fake host reports `tool 1.0.0`; pin something older.
    let h = Harness::apt_host().with_pins(&[("tool", "0.9.5")]);
    h.system.add_command("tool");

    match pipeline(&h).install(&SPEC).unwrap() {
        Acquired::UpToDate { installed, wanted } => {
            assert_eq!(installed, "1.0.0");
            assert_eq!(wanted, "0.9.5");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(h.transport.requests().is_empty());
}

#[test]
fn older_local_version_is_replaced() {
    let h = pinned();
    h.system.add_command("tool");
    publish_manifest(&h, &sha256_hex(PAYLOAD));
    h.transport.serve_file(ARTIFACT_URL, PAYLOAD);

    let outcome = pipeline(&h).install(&SPEC).unwrap();
    assert!(matches!(outcome, Acquired::Installed { .. }));
}

#[test]
fn installed_tool_outside_path_is_not_fetched_again() {
    let h = pinned();
    publish_manifest(&h, &sha256_hex(PAYLOAD));
    h.transport.serve_file(ARTIFACT_URL, PAYLOAD);
    assert!(matches!(
        pipeline(&h).install(&SPEC).unwrap(),
        Acquired::Installed { .. }
    ));
    let requests_after_install = h.transport.requests().len();

    // The bin dir is not on PATH in the harness; the installed copy still counts.
    match pipeline(&h).install(&SPEC).unwrap() {
        Acquired::UpToDate { installed, wanted } => {
            assert_eq!(installed, "1.2.0");
            assert_eq!(wanted, "1.2.0");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(h.transport.requests().len(), requests_after_install);
}

// ---------------------------------------------------------------------------
// Insecure URLs
// ---------------------------------------------------------------------------

#[test]
fn insecure_download_url_is_rejected_without_attempts() {
    let h = pinned();
    let url = "http://example.com/tool-installer";
    h.transport.serve_text(
        "https://example.com/tool-installer.sha256",
        &format!("{}  tool-installer\n", sha256_hex(PAYLOAD)),
    );
    h.transport.serve_file(url, PAYLOAD);

    let err = pipeline(&h)
        .fetch_upstream("tool", url, "https://example.com/tool-installer.sha256")
        .unwrap_err();
    assert!(matches!(err, PipelineError::InsecureUrl(ref u) if u == url), "{err}");
    assert_eq!(h.transport.download_attempts(url), 0);
    assert!(
        h.transport.requests().is_empty(),
        "checksum must not be fetched for an insecure download: {:?}",
        h.transport.requests()
    );
}

#[test]
fn insecure_checksum_url_is_rejected_without_requests() {
    let h = pinned();
    let err = pipeline(&h)
        .fetch_upstream(
            "tool",
            "https://example.com/tool-installer",
            "http://example.com/tool-installer.sha256",
        )
        .unwrap_err();
    assert!(matches!(err, PipelineError::InsecureUrl(_)), "{err}");
    assert!(h.transport.requests().is_empty());
}
