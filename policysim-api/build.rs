//! Build script for policysim-api
//!
//! Exposes build identification to the startup log:
//! - `GIT_HASH`: short commit hash, `POLICYSIM_GIT_HASH` when set (container
//!   builds without a `.git` directory), else `unknown`
//! - `BUILD_TIMESTAMP`: ISO 8601 with local offset
//! - `BUILD_PROFILE`: cargo profile (debug/release)

use std::process::Command;

const GIT_HASH_ENV: &str = "POLICYSIM_GIT_HASH";

fn main() {
    println!("cargo:rerun-if-env-changed={}", GIT_HASH_ENV);
    // Workspace root holds the repository; HEAD moves on every commit
    println!("cargo:rerun-if-changed=../.git/HEAD");

    println!("cargo:rustc-env=GIT_HASH={}", git_hash());
    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
    );
    println!(
        "cargo:rustc-env=BUILD_PROFILE={}",
        std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string())
    );
}

fn git_hash() -> String {
    if let Ok(hash) = std::env::var(GIT_HASH_ENV) {
        let hash = hash.trim();
        if !hash.is_empty() {
            return hash.chars().take(8).collect();
        }
    }

    Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
