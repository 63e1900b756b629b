use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::Item;

/// Immutable segment assignment for one parallel scan worker.
///
/// The worker never claims or rebalances segments; it executes one pass over this
/// assignment and reports what happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentDescriptor {
    pub segment_index: u32,
    pub total_segments: u32,
}

impl SegmentDescriptor {
    /// Validates orchestrator-provided segment bounds.
    ///
    /// This intentionally fails fast on invalid assignments. Producing a clear fatal
    /// result is safer than letting the store reject every page request.
    pub fn validate(&self) -> Result<(), String> {
        if self.total_segments == 0 {
            return Err("total_segments must be >= 1".to_string());
        }
        if self.segment_index >= self.total_segments {
            return Err(format!(
                "segment_index ({}) must be < total_segments ({})",
                self.segment_index, self.total_segments
            ));
        }

        Ok(())
    }
}

/// Opaque scan resumption token: the store's last evaluated key for a segment.
///
/// Serializable so a supervisor can checkpoint it between runs; `None` in the places
/// that carry an `Option<ScanCursor>` means the segment is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCursor(pub Item);

/// One unit of export work: a segment assignment plus an optional resume point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentWork {
    pub descriptor: SegmentDescriptor,
    pub resume_cursor: Option<ScanCursor>,
}

impl SegmentWork {
    pub fn validate(&self) -> Result<(), String> {
        self.descriptor.validate()
    }
}

/// Configures retry behavior for store calls and unprocessed-remainder resubmits.
///
/// The delay before attempt `k` (k >= 2) is `initial_backoff * 2^(k-2)`, capped at
/// `max_backoff`, plus deterministic jitter in `[0, jitter]`. Defaults describe the
/// destination writer's reference schedule: sleeps of 2s, 4s, ... 512s across ten
/// attempts, no jitter, and a cap the default schedule never reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first attempt.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(600),
            jitter: Duration::ZERO,
        }
    }
}

/// Configures write chunking for the import side.
///
/// `max_items` must stay within the store's batch-write item limit; the default is
/// exactly that limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub max_items: usize,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self { max_items: 25 }
    }
}

/// Configures stage flushing for the export side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    pub max_items: usize,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self { max_items: 10_000 }
    }
}

/// What the segment scanner does when a store call fails.
///
/// `AbortSegment` preserves the pipeline's historical behavior: a failed page request
/// stops the segment (keeping whatever was already staged), and a failed flush drops
/// that one batch while scanning continues. `RetryWithBackoff` first retries transient
/// page and flush failures under the given policy; exhaustion then falls back to the
/// same terminal behavior per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    AbortSegment,
    RetryWithBackoff(RetryPolicy),
}

/// Export worker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportWorkerConfig {
    pub flush_policy: FlushPolicy,
    pub failure_policy: FailurePolicy,
}

/// Import worker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportWorkerConfig {
    pub batch_policy: BatchPolicy,
    pub retry_policy: RetryPolicy,
}

/// One page of scan results from the source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Items the store examined for this page, which can exceed `items.len()`.
    pub scanned_count: u64,
    pub next_cursor: Option<ScanCursor>,
}

/// Normalized scan failure classes used by retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorKind {
    Network,
    Throttled,
    StoreUnavailable,
    TableMissing,
    MalformedItem,
    Other,
}

/// Typed scan failure with human-readable details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScanError {
    pub kind: ScanErrorKind,
    pub message: String,
}

impl ScanError {
    pub fn new(kind: ScanErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ScanErrorKind::Network | ScanErrorKind::Throttled | ScanErrorKind::StoreUnavailable
        )
    }
}

/// Normalized staging-store failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageErrorKind {
    Network,
    Throttled,
    NotFound,
    AccessDenied,
    Encode,
    Decode,
    Other,
}

/// Typed staging failure with human-readable details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StageError {
    pub kind: StageErrorKind,
    pub message: String,
}

impl StageError {
    pub fn new(kind: StageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, StageErrorKind::Network | StageErrorKind::Throttled)
    }
}

/// Normalized batch-write failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteErrorKind {
    Network,
    Throttled,
    StoreUnavailable,
    TableMissing,
    MalformedItem,
    Other,
}

/// Typed batch-write submit failure.
///
/// This covers whole-request rejections only; per-item throttling surfaces as the
/// store's unprocessed subset, not as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WriteError {
    pub kind: WriteErrorKind,
    pub message: String,
}

impl WriteError {
    pub fn new(kind: WriteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            WriteErrorKind::Network | WriteErrorKind::Throttled | WriteErrorKind::StoreUnavailable
        )
    }
}

/// Per-key import failure, carried past the key without aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// One staged blob the export side produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBlob {
    pub key: String,
    pub item_count: usize,
}

/// Top-level result of a single segment export pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentExportStatus {
    Completed,
    Aborted,
}

/// Terminal scan failure with the attempt count that led to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub attempts: u32,
    pub error: ScanError,
}

/// Aggregate export result returned to the caller.
///
/// `last_cursor` is the resume point a supervisor would persist: the cursor preceding
/// the first page that did not complete. `None` on a completed segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentExportOutcome {
    pub descriptor: SegmentDescriptor,
    pub status: SegmentExportStatus,
    pub pages_fetched: u64,
    pub items_seen: u64,
    pub scanned_count: u64,
    pub staged_blobs: Vec<StagedBlob>,
    pub items_lost: u64,
    pub last_cursor: Option<ScanCursor>,
    pub failure: Option<ScanFailure>,
}

impl SegmentExportOutcome {
    pub fn items_staged(&self) -> u64 {
        self.staged_blobs
            .iter()
            .map(|blob| blob.item_count as u64)
            .sum()
    }
}

/// Result of driving one write chunk to resolution (or attempt exhaustion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkWriteOutcome {
    pub chunk_index: usize,
    pub items: usize,
    pub attempts: u32,
    /// Items the store still had not accepted when attempts ran out. Empty means the
    /// chunk resolved.
    pub unprocessed: Vec<Item>,
}

impl ChunkWriteOutcome {
    pub fn resolved(&self) -> bool {
        self.unprocessed.is_empty()
    }
}

/// Aggregate result of importing one staged blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageImportOutcome {
    pub key: String,
    pub items_attempted: usize,
    pub chunks: Vec<ChunkWriteOutcome>,
}

impl StageImportOutcome {
    pub fn unresolved_items(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.unprocessed.len()).sum()
    }

    pub fn unresolved_chunks(&self) -> usize {
        self.chunks
            .iter()
            .filter(|chunk| !chunk.resolved())
            .count()
    }
}

/// Whole-run roll-up the import worker logs before exiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportRunSummary {
    pub keys_total: usize,
    pub keys_imported: usize,
    pub keys_failed: usize,
    pub items_attempted: u64,
    pub items_unresolved: u64,
}
