use tracing::{error, info, warn};

use crate::item::Item;

use super::retry::compute_backoff_delay;
use super::types::{ChunkWriteOutcome, RetryPolicy, WriteError};
use super::write_sink::BatchWriteSink;

/// Drives one write chunk to resolution against the destination table.
///
/// The store acknowledges batch writes item by item: a submit can succeed while
/// handing back an unprocessed remainder. Each round resubmits only that remainder.
/// The remainder usually shrinks between rounds, but nothing here depends on it.
pub struct RetryingBatchWriter<W>
where
    W: BatchWriteSink,
{
    sink: W,
    retry_policy: RetryPolicy,
}

impl<W> RetryingBatchWriter<W>
where
    W: BatchWriteSink,
{
    pub fn new(sink: W, retry_policy: RetryPolicy) -> Self {
        Self { sink, retry_policy }
    }

    /// Submits one chunk, resubmitting unprocessed remainders with backoff.
    ///
    /// Attempt exhaustion with items still unprocessed is an outcome, not an error:
    /// the caller gets the leftover items back and moves on. `Err` is reserved for
    /// submit rejections that are fatal or still failing once attempts run out.
    /// Exhaustion never sleeps; there is no attempt left for a delay to serve.
    pub async fn write_chunk(
        &self,
        chunk_index: usize,
        chunk: &[Item],
    ) -> Result<ChunkWriteOutcome, WriteError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut pending: Vec<Item> = chunk.to_vec();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            info!(
                event = "batch_write_attempt",
                chunk_index,
                attempt = attempts,
                pending_items = pending.len(),
                "submitting write chunk"
            );

            match self.sink.submit_batch(&pending).await {
                Ok(unprocessed) if unprocessed.is_empty() => {
                    info!(
                        event = "chunk_resolved",
                        chunk_index,
                        attempts,
                        items = chunk.len(),
                        "write chunk fully accepted"
                    );
                    return Ok(ChunkWriteOutcome {
                        chunk_index,
                        items: chunk.len(),
                        attempts,
                        unprocessed: Vec::new(),
                    });
                }
                Ok(unprocessed) => {
                    if attempts >= max_attempts {
                        error!(
                            event = "chunk_unresolved",
                            chunk_index,
                            attempts,
                            unprocessed_items = unprocessed.len(),
                            "giving up on write chunk with items still unprocessed"
                        );
                        return Ok(ChunkWriteOutcome {
                            chunk_index,
                            items: chunk.len(),
                            attempts,
                            unprocessed,
                        });
                    }

                    warn!(
                        event = "batch_write_unprocessed",
                        chunk_index,
                        attempt = attempts,
                        unprocessed_items = unprocessed.len(),
                        "store returned unprocessed items; backing off before resubmit"
                    );
                    self.sleep_backoff(attempts, chunk_index).await;
                    pending = unprocessed;
                }
                Err(err) if err.is_retryable() && attempts < max_attempts => {
                    warn!(
                        event = "batch_write_submit_retry",
                        chunk_index,
                        attempt = attempts,
                        error = %err,
                        "transient submit failure; backing off before resubmit"
                    );
                    self.sleep_backoff(attempts, chunk_index).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn sleep_backoff(&self, attempt: u32, chunk_index: usize) {
        let delay = compute_backoff_delay(&self.retry_policy, attempt, chunk_index as u64);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
