mod blob_store;
mod convert;
mod error_mapping;
mod export_executor;
mod import_executor;
mod retry;
mod retrying_writer;
mod scan_source;
mod stage_reader;
mod stage_writer;
mod write_sink;
pub mod types;

pub use blob_store::{BlobStore, S3BlobStore};
pub use export_executor::SegmentExportExecutor;
pub use import_executor::StageImportExecutor;
pub use retry::{compute_backoff_delay, run_with_retry, RetryTerminal};
pub use retrying_writer::RetryingBatchWriter;
pub use scan_source::{DynamoScanSource, ScanSource};
pub use stage_reader::StageReader;
pub use stage_writer::{StageWriter, DEFAULT_STAGE_PREFIX, STAGE_CONTENT_TYPE};
pub use write_sink::{BatchWriteSink, DynamoWriteSink};

#[cfg(test)]
mod import_tests;
#[cfg(test)]
mod test_support;
