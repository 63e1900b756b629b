use clap::{Parser, ValueEnum};

use crate::build_info;
use crate::migration::DEFAULT_STAGE_PREFIX;

/// How the export worker reacts to a failed scan page or stage flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScanFailureMode {
    /// Stop the segment on a failed page request; drop the batch on a failed flush.
    Abort,
    /// Retry transient scan and flush failures with backoff before giving up.
    Retry,
}

#[derive(Debug, Parser, Clone)]
#[command(
    about = "Export one table segment to staged JSON blobs",
    version = build_info::VERSION_WITH_COMMIT,
    long_version = build_info::VERSION_WITH_COMMIT
)]
pub struct ExportArgs {
    #[arg(long = "flush-threshold", default_value_t = 10_000)]
    /// Buffered items that trigger a stage flush.
    pub flush_threshold: usize,
    #[arg(long = "stage-prefix", default_value = DEFAULT_STAGE_PREFIX)]
    pub stage_prefix: String,

    #[arg(long = "scan-failure-mode", value_enum, default_value_t = ScanFailureMode::Abort)]
    pub scan_failure_mode: ScanFailureMode,

    #[arg(long = "retry-attempts", default_value_t = 5)]
    pub retry_attempts: u32,
    #[arg(long = "retry-initial-ms", default_value_t = 100)]
    pub retry_initial_ms: u64,
    #[arg(long = "retry-max-ms", default_value_t = 5000)]
    pub retry_max_ms: u64,
    #[arg(long = "retry-jitter-ms", default_value_t = 25)]
    pub retry_jitter_ms: u64,

    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Parser, Clone)]
#[command(
    about = "Import staged JSON blobs into the destination table",
    version = build_info::VERSION_WITH_COMMIT,
    long_version = build_info::VERSION_WITH_COMMIT
)]
pub struct ImportArgs {
    #[arg(long = "batch-size", default_value_t = 25)]
    /// Items per batch-write request; the store rejects more than 25.
    pub batch_size: usize,

    #[arg(long = "retry-attempts", default_value_t = 10)]
    pub retry_attempts: u32,
    #[arg(long = "retry-initial-ms", default_value_t = 2000)]
    pub retry_initial_ms: u64,
    #[arg(long = "retry-max-ms", default_value_t = 600_000)]
    pub retry_max_ms: u64,
    #[arg(long = "retry-jitter-ms", default_value_t = 0)]
    pub retry_jitter_ms: u64,

    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,
}

pub fn validate_export_args(args: &ExportArgs) -> Result<(), String> {
    if args.flush_threshold == 0 {
        return Err("--flush-threshold must be > 0".to_string());
    }
    if args.retry_attempts == 0 {
        return Err("--retry-attempts must be > 0".to_string());
    }
    if args.retry_max_ms < args.retry_initial_ms {
        return Err(format!(
            "--retry-max-ms ({}) must be >= --retry-initial-ms ({})",
            args.retry_max_ms, args.retry_initial_ms
        ));
    }

    Ok(())
}

pub fn validate_import_args(args: &ImportArgs) -> Result<(), String> {
    if args.batch_size == 0 {
        return Err("--batch-size must be > 0".to_string());
    }
    if args.batch_size > 25 {
        return Err(format!(
            "--batch-size must be <= 25 (store batch-write limit), got {}",
            args.batch_size
        ));
    }
    if args.retry_attempts == 0 {
        return Err("--retry-attempts must be > 0".to_string());
    }
    if args.retry_max_ms < args.retry_initial_ms {
        return Err(format!(
            "--retry-max-ms ({}) must be >= --retry-initial-ms ({})",
            args.retry_max_ms, args.retry_initial_ms
        ));
    }

    Ok(())
}
