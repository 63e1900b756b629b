/// Build identity baked in at compile time.
///
/// Both binaries report `VERSION_WITH_COMMIT` for `--version`, and the logging
/// context carries the same values as `build_version` / `build_commit`, so a log
/// line can always be traced back to the exact build that wrote it.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_COMMIT_HASH: &str = env!("DDB_FERRY_GIT_COMMIT_HASH");
pub const VERSION_WITH_COMMIT: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "+",
    env!("DDB_FERRY_GIT_COMMIT_HASH")
);

const SHORT_HASH_LEN: usize = 12;

/// Shortened commit hash for log fields; `"unknown"` passes through untouched
/// because it is already shorter than the cutoff.
pub fn short_commit_hash() -> &'static str {
    &GIT_COMMIT_HASH[..GIT_COMMIT_HASH.len().min(SHORT_HASH_LEN)]
}
