// build.rs
use std::process::Command;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let version = std::env::var("CARGO_PKG_VERSION")?;
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    let hash = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| short_hash(&String::from_utf8_lossy(&output.stdout)))
        .unwrap_or_else(|| "unknown".to_string());

    let dirty = Command::new("git")
        .args(["diff", "--quiet"])
        .status()
        .map(|status| if status.success() { "" } else { "-dirty" })
        .unwrap_or("");

    let full_version = format!("{} {}{}-{}", version, hash, dirty, profile);
    println!("cargo:rustc-env=XSPHARM_VERSION={}", full_version);

    println!("cargo:rerun-if-changed=.git/HEAD");

    Ok(())
}

fn short_hash(raw: &str) -> String {
    raw.trim().chars().take(8).collect()
}
