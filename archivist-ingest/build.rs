//! Build script for archivist-ingest
//!
//! Exposes build identification to the binary, logged at startup:
//! - `GIT_HASH`: `git describe --always --dirty`, or "unknown" outside a checkout
//! - `BUILD_TIMESTAMP`: RFC 3339 local time
//! - `BUILD_PROFILE`: cargo profile (debug/release)

use std::process::Command;

fn git_describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn main() {
    let git_hash = git_describe().unwrap_or_else(|| "unknown".to_string());
    let build_timestamp =
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
}
