use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_COMMIT_HASH");
    // Local checkouts: re-run when HEAD moves.
    println!("cargo:rerun-if-changed=.git/HEAD");

    println!("cargo:rustc-env=DDB_FERRY_GIT_COMMIT_HASH={}", commit_hash());
}

/// CI hands us `SOURCE_COMMIT_HASH`; local builds fall back to asking git directly.
fn commit_hash() -> String {
    if let Ok(hash) = std::env::var("SOURCE_COMMIT_HASH") {
        let hash = hash.trim();
        if !hash.is_empty() {
            return hash.to_string();
        }
    }

    git_head_commit().unwrap_or_else(|| "unknown".to_string())
}

fn git_head_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--verify", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    if hash.is_empty() {
        None
    } else {
        Some(hash.to_string())
    }
}
