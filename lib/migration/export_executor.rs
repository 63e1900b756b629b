use tracing::{debug, error, info};

use crate::item::Item;

use super::blob_store::BlobStore;
use super::retry::run_with_retry;
use super::scan_source::ScanSource;
use super::stage_writer::StageWriter;
use super::types::{
    ExportWorkerConfig, FailurePolicy, ScanCursor, ScanError, ScanErrorKind, ScanFailure,
    ScanPage, SegmentDescriptor, SegmentExportOutcome, SegmentExportStatus, SegmentWork,
    StageError, StagedBlob,
};

/// Segment-oriented executor for the export phase.
///
/// Owns page walking, cursor advancement, threshold-based flushing, and outcome
/// accounting. Store specifics stay behind [`ScanSource`] and the stage writer, so the
/// control flow here is exercised directly by tests with scripted stores.
pub struct SegmentExportExecutor<S, B>
where
    S: ScanSource,
    B: BlobStore,
{
    scan_source: S,
    stage_writer: StageWriter<B>,
    config: ExportWorkerConfig,
}

impl<S, B> SegmentExportExecutor<S, B>
where
    S: ScanSource,
    B: BlobStore,
{
    pub fn new(scan_source: S, stage_writer: StageWriter<B>, config: ExportWorkerConfig) -> Self {
        Self {
            scan_source,
            stage_writer,
            config,
        }
    }

    /// Executes one export pass over the assigned segment.
    ///
    /// Never returns `Err`: every failure mode is folded into the outcome so the
    /// caller decides what it means for the process. The outcome satisfies
    /// `items_seen == items_staged() + items_lost` whichever path terminated the pass.
    pub async fn export_segment(&self, work: &SegmentWork) -> SegmentExportOutcome {
        let descriptor = work.descriptor;

        if let Err(message) = work.validate() {
            error!(
                event = "segment_assignment_invalid",
                segment_index = descriptor.segment_index,
                total_segments = descriptor.total_segments,
                error = %message,
                "refusing invalid segment assignment"
            );
            return SegmentExportOutcome {
                descriptor,
                status: SegmentExportStatus::Aborted,
                pages_fetched: 0,
                items_seen: 0,
                scanned_count: 0,
                staged_blobs: Vec::new(),
                items_lost: 0,
                last_cursor: work.resume_cursor.clone(),
                failure: Some(ScanFailure {
                    attempts: 0,
                    error: ScanError::new(
                        ScanErrorKind::Other,
                        format!("invalid segment assignment: {message}"),
                    ),
                }),
            };
        }

        let flush_threshold = self.config.flush_policy.max_items.max(1);
        let mut cursor = work.resume_cursor.clone();
        let mut buffer: Vec<Item> = Vec::new();
        let mut staged_blobs: Vec<StagedBlob> = Vec::new();
        let mut pages_fetched: u64 = 0;
        let mut items_seen: u64 = 0;
        let mut scanned_count: u64 = 0;
        let mut items_lost: u64 = 0;
        let mut flush_seq: u64 = 0;

        info!(
            event = "segment_export_starting",
            segment_index = descriptor.segment_index,
            total_segments = descriptor.total_segments,
            resuming = cursor.is_some(),
            flush_threshold,
            "starting segment export"
        );

        let mut failure: Option<ScanFailure> = None;

        loop {
            let page = match self
                .fetch_page(&descriptor, cursor.as_ref(), pages_fetched)
                .await
            {
                Ok(page) => page,
                Err(scan_failure) => {
                    error!(
                        event = "segment_scan_failed",
                        segment_index = descriptor.segment_index,
                        total_segments = descriptor.total_segments,
                        pages_fetched,
                        attempts = scan_failure.attempts,
                        buffered_items = buffer.len(),
                        error = %scan_failure.error,
                        "scan page failed; flushing buffered remainder and aborting"
                    );
                    failure = Some(scan_failure);
                    break;
                }
            };

            pages_fetched += 1;
            items_seen += page.items.len() as u64;
            scanned_count += page.scanned_count;
            debug!(
                event = "scan_page_fetched",
                segment_index = descriptor.segment_index,
                page = pages_fetched,
                page_items = page.items.len(),
                items_seen,
                scanned_count,
                "fetched one scan page"
            );

            buffer.extend(page.items);

            while buffer.len() >= flush_threshold {
                let batch: Vec<Item> = buffer.drain(..flush_threshold).collect();
                flush_seq += 1;
                match self.flush_batch(&descriptor, &batch, flush_seq).await {
                    Ok(blob) => staged_blobs.push(blob),
                    Err(_) => items_lost += batch.len() as u64,
                }
            }

            match page.next_cursor {
                Some(next_cursor) => cursor = Some(next_cursor),
                None => break,
            }
        }

        // Runs on both exits. On the failure path the buffered items all came from
        // pages the cursor has already moved past; a resumed scan starts at the
        // failed page and never re-reads them, so staging them now is what keeps
        // them in the dump.
        if !buffer.is_empty() {
            let batch = std::mem::take(&mut buffer);
            flush_seq += 1;
            match self.flush_batch(&descriptor, &batch, flush_seq).await {
                Ok(blob) => staged_blobs.push(blob),
                Err(_) => items_lost += batch.len() as u64,
            }
        }

        if let Some(failure) = failure {
            return SegmentExportOutcome {
                descriptor,
                status: SegmentExportStatus::Aborted,
                pages_fetched,
                items_seen,
                scanned_count,
                staged_blobs,
                items_lost,
                last_cursor: cursor,
                failure: Some(failure),
            };
        }

        info!(
            event = "segment_export_complete",
            segment_index = descriptor.segment_index,
            total_segments = descriptor.total_segments,
            pages_fetched,
            items_seen,
            scanned_count,
            staged_blob_count = staged_blobs.len(),
            items_lost,
            "segment exhausted"
        );

        SegmentExportOutcome {
            descriptor,
            status: SegmentExportStatus::Completed,
            pages_fetched,
            items_seen,
            scanned_count,
            staged_blobs,
            items_lost,
            last_cursor: None,
            failure: None,
        }
    }

    /// Fetches the next page under the configured failure policy.
    async fn fetch_page(
        &self,
        descriptor: &SegmentDescriptor,
        cursor: Option<&ScanCursor>,
        page_seq: u64,
    ) -> Result<ScanPage, ScanFailure> {
        match self.config.failure_policy {
            FailurePolicy::AbortSegment => self
                .scan_source
                .scan_page(descriptor, cursor)
                .await
                .map_err(|error| ScanFailure { attempts: 1, error }),
            FailurePolicy::RetryWithBackoff(retry_policy) => {
                let seed = retry_seed(descriptor, page_seq);
                match run_with_retry(
                    &retry_policy,
                    seed,
                    |_| self.scan_source.scan_page(descriptor, cursor),
                    |error: &ScanError| error.is_retryable(),
                )
                .await
                {
                    Ok((page, attempts)) => {
                        if attempts > 1 {
                            info!(
                                event = "scan_page_retried",
                                segment_index = descriptor.segment_index,
                                attempts,
                                "scan page succeeded after retries"
                            );
                        }
                        Ok(page)
                    }
                    Err(terminal) => Err(ScanFailure {
                        attempts: terminal.attempts,
                        error: terminal.error,
                    }),
                }
            }
        }
    }

    /// Stages one batch under the configured failure policy.
    ///
    /// A terminal flush failure is logged here; the caller only does the loss
    /// accounting.
    async fn flush_batch(
        &self,
        descriptor: &SegmentDescriptor,
        batch: &[Item],
        flush_seq: u64,
    ) -> Result<StagedBlob, StageError> {
        let result = match self.config.failure_policy {
            FailurePolicy::AbortSegment => self.stage_writer.write_stage(batch).await,
            FailurePolicy::RetryWithBackoff(retry_policy) => {
                let seed = retry_seed(descriptor, flush_seq);
                // One key across attempts: a put that landed before the error
                // reported gets overwritten on retry, not staged under a second key.
                let key = self.stage_writer.next_stage_key();
                run_with_retry(
                    &retry_policy,
                    seed,
                    |_| self.stage_writer.write_stage_at(&key, batch),
                    |error: &StageError| error.is_retryable(),
                )
                .await
                .map(|(blob, _attempts)| blob)
                .map_err(|terminal| terminal.error)
            }
        };

        result.map_err(|err| {
            error!(
                event = "stage_flush_failed",
                segment_index = descriptor.segment_index,
                batch_items = batch.len(),
                error = %err,
                "dropping batch after stage flush failure"
            );
            err
        })
    }
}

/// Jitter seed that separates concurrent segment workers from each other.
fn retry_seed(descriptor: &SegmentDescriptor, sequence: u64) -> u64 {
    ((descriptor.segment_index as u64) << 32) ^ sequence
}
