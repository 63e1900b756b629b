use tracing::info;

use super::blob_store::BlobStore;
use super::retrying_writer::RetryingBatchWriter;
use super::stage_reader::StageReader;
use super::types::{ChunkWriteOutcome, ImportError, ImportWorkerConfig, StageImportOutcome};
use super::write_sink::BatchWriteSink;

/// Key-oriented executor for the import phase.
///
/// Reads one staged blob, splits it into chunks within the store's batch-write limit,
/// and drives each chunk through the retrying writer in order. Unresolved chunks are
/// reported in the outcome; a hard submit failure aborts the rest of the key.
pub struct StageImportExecutor<B, W>
where
    B: BlobStore,
    W: BatchWriteSink,
{
    stage_reader: StageReader<B>,
    writer: RetryingBatchWriter<W>,
    config: ImportWorkerConfig,
}

impl<B, W> StageImportExecutor<B, W>
where
    B: BlobStore,
    W: BatchWriteSink,
{
    pub fn new(stage_reader: StageReader<B>, sink: W, config: ImportWorkerConfig) -> Self {
        Self {
            stage_reader,
            writer: RetryingBatchWriter::new(sink, config.retry_policy),
            config,
        }
    }

    /// Imports every item staged under `key` into the destination table.
    pub async fn import_stage(&self, key: &str) -> Result<StageImportOutcome, ImportError> {
        let items = self.stage_reader.read_stage(key).await?;
        let chunk_limit = self.config.batch_policy.max_items.max(1);

        info!(
            event = "stage_import_starting",
            key = %key,
            items = items.len(),
            chunk_limit,
            "importing staged blob"
        );

        let mut chunks: Vec<ChunkWriteOutcome> = Vec::new();
        for (chunk_index, chunk) in items.chunks(chunk_limit).enumerate() {
            let outcome = self.writer.write_chunk(chunk_index, chunk).await?;
            chunks.push(outcome);
        }

        let outcome = StageImportOutcome {
            key: key.to_string(),
            items_attempted: items.len(),
            chunks,
        };

        info!(
            event = "stage_import_complete",
            key = %key,
            items_attempted = outcome.items_attempted,
            chunk_count = outcome.chunks.len(),
            unresolved_items = outcome.unresolved_items(),
            "finished staged blob"
        );

        Ok(outcome)
    }
}
