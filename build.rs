//! Build script for fellowship-agent
//!
//! Embeds build-time information into the binaries:
//! - Git commit hash, branch and dirty flag
//! - Build timestamp
//! - Target and host triples
//! - Rust version

use std::env;
use std::process::Command;

fn main() {
    // Rerun if git HEAD changes
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-changed=config/personas");

    let git_hash = run("git", &["rev-parse", "--short=8", "HEAD"]);
    let git_branch = run("git", &["rev-parse", "--abbrev-ref", "HEAD"]);
    let git_dirty = is_git_dirty();

    let build_timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let host = env::var("HOST").unwrap_or_else(|_| "unknown".to_string());
    let rustc_version = run("rustc", &["--version"]);

    println!("cargo:rustc-env=FELLOWSHIP_GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=FELLOWSHIP_GIT_BRANCH={}", git_branch);
    println!("cargo:rustc-env=FELLOWSHIP_GIT_DIRTY={}", git_dirty);
    println!("cargo:rustc-env=FELLOWSHIP_BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=FELLOWSHIP_TARGET={}", target);
    println!("cargo:rustc-env=FELLOWSHIP_PROFILE={}", profile);
    println!("cargo:rustc-env=FELLOWSHIP_RUSTC_VERSION={}", rustc_version);
    println!("cargo:rustc-env=FELLOWSHIP_HOST={}", host);
}

/// Run a command and return its trimmed stdout, or "unknown"
fn run(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Check if the git working directory is dirty
fn is_git_dirty() -> &'static str {
    Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .map(|output| {
            if output.status.success() && !output.stdout.is_empty() {
                "true"
            } else {
                "false"
            }
        })
        .unwrap_or("unknown")
}
