//! Embeds the build's git revision as `GIT_HASH`.
//!
//! A `GIT_HASH` set in the build environment (CI, source tarballs) is used
//! as-is; otherwise it is the short HEAD hash, `-dirty` when the tree has
//! uncommitted changes, or `unknown` outside a checkout.

use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn revision() -> String {
    if let Some(hash) = std::env::var("GIT_HASH").ok().filter(|h| !h.trim().is_empty()) {
        return hash;
    }
    let Some(head) = git(&["rev-parse", "--short", "HEAD"]) else {
        return "unknown".to_string();
    };
    match git(&["status", "--porcelain", "--untracked-files=no"]) {
        Some(changes) if !changes.is_empty() => format!("{}-dirty", head),
        _ => head,
    }
}

fn main() {
    println!("cargo:rustc-env=GIT_HASH={}", revision());
    println!("cargo:rerun-if-env-changed=GIT_HASH");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
}
