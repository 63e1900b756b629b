use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use dotenv::dotenv;
use tracing::{error, info};

use crate::cli::{
    validate_export_args, validate_import_args, ExportArgs, ImportArgs, ScanFailureMode,
};
use crate::config::{ExportConfig, ImportConfig};
use crate::logging::init_logging;
use crate::migration::types::{
    BatchPolicy, ExportWorkerConfig, FailurePolicy, FlushPolicy, ImportRunSummary,
    ImportWorkerConfig, RetryPolicy, SegmentDescriptor, SegmentExportStatus, SegmentWork,
};
use crate::migration::{
    DynamoScanSource, DynamoWriteSink, S3BlobStore, SegmentExportExecutor, StageImportExecutor,
    StageReader, StageWriter,
};

const SERVICE_NAME: &str = "ddb_ferry";

/// Runs one segment export pass and exits.
///
/// Exit code 2 is reserved for argument/environment problems; the export itself never
/// fails the process. A segment that aborts mid-scan is reported through logs and the
/// outcome summary, exactly as an orchestrator re-running segments expects.
pub async fn run_export(args: ExportArgs, logging_mode: &str) -> i32 {
    dotenv().ok();

    let logging_context = init_logging(SERVICE_NAME, logging_mode, &args.log_level);
    let run_span = tracing::info_span!(
        "worker_run",
        service = %logging_context.service,
        environment = %logging_context.environment,
        mode = %logging_context.mode,
        run_id = %logging_context.run_id,
        build_version = %logging_context.build_version,
        build_commit = %logging_context.build_commit
    );
    let _run_guard = run_span.enter();
    info!(
        event = "export_starting",
        mode = logging_mode,
        "starting export run"
    );

    if let Err(err) = validate_export_args(&args) {
        eprintln!("{err}");
        return 2;
    }

    let config = match ExportConfig::from_env() {
        Ok(value) => value,
        Err(err) => {
            eprintln!("{err}");
            return 2;
        }
    };

    let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let table_client = aws_sdk_dynamodb::Client::new(&sdk_config);
    let stage_client = aws_sdk_s3::Client::new(&sdk_config);

    let executor = SegmentExportExecutor::new(
        DynamoScanSource::new(table_client, config.table.clone()),
        StageWriter::new(
            S3BlobStore::new(stage_client, config.bucket.clone()),
            args.stage_prefix.clone(),
        ),
        export_worker_config(&args),
    );

    let work = SegmentWork {
        descriptor: SegmentDescriptor {
            segment_index: config.segment,
            total_segments: config.total_segments,
        },
        resume_cursor: None,
    };

    let outcome = executor.export_segment(&work).await;

    let status_label = match outcome.status {
        SegmentExportStatus::Completed => "completed",
        SegmentExportStatus::Aborted => "aborted",
    };
    info!(
        event = "export_run_complete",
        status = status_label,
        segment_index = outcome.descriptor.segment_index,
        total_segments = outcome.descriptor.total_segments,
        pages_fetched = outcome.pages_fetched,
        items_seen = outcome.items_seen,
        scanned_count = outcome.scanned_count,
        staged_blob_count = outcome.staged_blobs.len(),
        items_staged = outcome.items_staged(),
        items_lost = outcome.items_lost,
        resumable = outcome.last_cursor.is_some(),
        "export run finished"
    );
    0
}

/// Runs one import pass over the configured key list and exits.
///
/// Per-key failures are logged and skipped so one bad blob cannot strand the rest of
/// the staged data.
pub async fn run_import(args: ImportArgs, logging_mode: &str) -> i32 {
    dotenv().ok();

    let logging_context = init_logging(SERVICE_NAME, logging_mode, &args.log_level);
    let run_span = tracing::info_span!(
        "worker_run",
        service = %logging_context.service,
        environment = %logging_context.environment,
        mode = %logging_context.mode,
        run_id = %logging_context.run_id,
        build_version = %logging_context.build_version,
        build_commit = %logging_context.build_commit
    );
    let _run_guard = run_span.enter();
    info!(
        event = "import_starting",
        mode = logging_mode,
        "starting import run"
    );

    if let Err(err) = validate_import_args(&args) {
        eprintln!("{err}");
        return 2;
    }

    let config = match ImportConfig::from_env() {
        Ok(value) => value,
        Err(err) => {
            eprintln!("{err}");
            return 2;
        }
    };

    let keys = match config.stage_keys.clone() {
        Some(keys) => keys,
        None => {
            error!(
                event = "no_stage_keys",
                "S3_KEYS is empty; nothing to import"
            );
            return 0;
        }
    };

    let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    // Only the destination table is pinned to REGION; the staging bucket keeps the
    // ambient credential chain's region, matching how the stages were written.
    let table_config = aws_sdk_dynamodb::config::Builder::from(&sdk_config)
        .region(Region::new(config.region.clone()))
        .build();
    let table_client = aws_sdk_dynamodb::Client::from_conf(table_config);
    let stage_client = aws_sdk_s3::Client::new(&sdk_config);

    let executor = StageImportExecutor::new(
        StageReader::new(S3BlobStore::new(stage_client, config.bucket.clone())),
        DynamoWriteSink::new(table_client, config.table.clone()),
        import_worker_config(&args),
    );

    let mut summary = ImportRunSummary {
        keys_total: keys.len(),
        ..Default::default()
    };
    for key in &keys {
        match executor.import_stage(key).await {
            Ok(outcome) => {
                summary.keys_imported += 1;
                summary.items_attempted += outcome.items_attempted as u64;
                summary.items_unresolved += outcome.unresolved_items() as u64;
            }
            Err(err) => {
                summary.keys_failed += 1;
                error!(
                    event = "stage_import_failed",
                    key = %key,
                    error = %err,
                    "stage import failed; continuing with next key"
                );
            }
        }
    }

    info!(
        event = "import_run_complete",
        keys_total = summary.keys_total,
        keys_imported = summary.keys_imported,
        keys_failed = summary.keys_failed,
        items_attempted = summary.items_attempted,
        items_unresolved = summary.items_unresolved,
        "import run finished"
    );
    0
}

fn export_worker_config(args: &ExportArgs) -> ExportWorkerConfig {
    ExportWorkerConfig {
        flush_policy: FlushPolicy {
            max_items: args.flush_threshold,
        },
        failure_policy: match args.scan_failure_mode {
            ScanFailureMode::Abort => FailurePolicy::AbortSegment,
            ScanFailureMode::Retry => FailurePolicy::RetryWithBackoff(RetryPolicy {
                max_attempts: args.retry_attempts,
                initial_backoff: Duration::from_millis(args.retry_initial_ms),
                max_backoff: Duration::from_millis(args.retry_max_ms),
                jitter: Duration::from_millis(args.retry_jitter_ms),
            }),
        },
    }
}

fn import_worker_config(args: &ImportArgs) -> ImportWorkerConfig {
    ImportWorkerConfig {
        batch_policy: BatchPolicy {
            max_items: args.batch_size,
        },
        retry_policy: RetryPolicy {
            max_attempts: args.retry_attempts,
            initial_backoff: Duration::from_millis(args.retry_initial_ms),
            max_backoff: Duration::from_millis(args.retry_max_ms),
            jitter: Duration::from_millis(args.retry_jitter_ms),
        },
    }
}
