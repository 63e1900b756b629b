use std::sync::Arc;

use crate::item::{encode_items, Item};

use super::import_executor::StageImportExecutor;
use super::retrying_writer::RetryingBatchWriter;
use super::stage_reader::StageReader;
use super::test_support::{make_item, make_items, zero_delay_retry, MemoryBlobStore, MockWriteSink};
use super::types::{
    BatchPolicy, ImportError, ImportWorkerConfig, StageErrorKind, WriteError, WriteErrorKind,
};

fn import_executor(
    store: &Arc<MemoryBlobStore>,
    sink: &Arc<MockWriteSink>,
    batch_size: usize,
    max_attempts: u32,
) -> StageImportExecutor<Arc<MemoryBlobStore>, Arc<MockWriteSink>> {
    StageImportExecutor::new(
        StageReader::new(Arc::clone(store)),
        Arc::clone(sink),
        ImportWorkerConfig {
            batch_policy: BatchPolicy {
                max_items: batch_size,
            },
            retry_policy: zero_delay_retry(max_attempts),
        },
    )
}

fn seed_stage(store: &MemoryBlobStore, key: &str, items: &[Item]) {
    let payload = encode_items(items).expect("test items must encode");
    store.insert_blob(key, payload);
}

fn transient_write_error() -> WriteError {
    WriteError::new(WriteErrorKind::Throttled, "scripted write throttle")
}

fn fatal_write_error() -> WriteError {
    WriteError::new(WriteErrorKind::TableMissing, "scripted missing table")
}

#[tokio::test]
async fn items_chunk_at_the_batch_write_limit() {
    let store = Arc::new(MemoryBlobStore::new());
    seed_stage(&store, "dump/full.json", &make_items(0..57));
    let sink = Arc::new(MockWriteSink::accepting());
    let executor = import_executor(&store, &sink, 25, 10);

    let outcome = executor
        .import_stage("dump/full.json")
        .await
        .expect("import should succeed");

    assert_eq!(outcome.items_attempted, 57);
    assert_eq!(outcome.unresolved_items(), 0);

    let chunk_shapes: Vec<(usize, usize, u32)> = outcome
        .chunks
        .iter()
        .map(|chunk| (chunk.chunk_index, chunk.items, chunk.attempts))
        .collect();
    assert_eq!(chunk_shapes, vec![(0, 25, 1), (1, 25, 1), (2, 7, 1)]);

    let sizes: Vec<usize> = sink.submitted_batches().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![25, 25, 7]);
    assert_eq!(
        sink.accepted_items(),
        make_items(0..57),
        "every staged item must land exactly once, in order"
    );
}

#[tokio::test]
async fn unprocessed_remainder_is_resubmitted_until_resolved() {
    let store = Arc::new(MemoryBlobStore::new());
    let items = make_items(0..4);
    seed_stage(&store, "dump/retry.json", &items);
    let sink = Arc::new(MockWriteSink::with_plan(vec![
        Ok(items[2..4].to_vec()),
        Ok(Vec::new()),
    ]));
    let executor = import_executor(&store, &sink, 25, 10);

    let outcome = executor
        .import_stage("dump/retry.json")
        .await
        .expect("import should succeed");

    assert_eq!(outcome.chunks.len(), 1);
    assert_eq!(outcome.chunks[0].attempts, 2);
    assert!(outcome.chunks[0].resolved());

    assert_eq!(
        sink.submitted_batches(),
        vec![items.clone(), items[2..4].to_vec()],
        "only the unprocessed remainder is resubmitted"
    );
    assert_eq!(sink.accepted_items(), items);
}

#[tokio::test]
async fn exhaustion_reports_attempts_and_the_importer_moves_on() {
    let store = Arc::new(MemoryBlobStore::new());
    seed_stage(&store, "dump/stuck.json", &make_items(0..4));
    let stuck = vec![make_item(1)];
    let sink = Arc::new(MockWriteSink::with_plan(vec![
        Ok(stuck.clone()),
        Ok(stuck.clone()),
        Ok(stuck.clone()),
    ]));
    let executor = import_executor(&store, &sink, 2, 3);

    let outcome = executor
        .import_stage("dump/stuck.json")
        .await
        .expect("an unresolved chunk is an outcome, not an error");

    assert_eq!(outcome.chunks.len(), 2);
    assert_eq!(outcome.chunks[0].attempts, 3);
    assert!(!outcome.chunks[0].resolved());
    assert_eq!(outcome.chunks[0].unprocessed, stuck);
    assert!(
        outcome.chunks[1].resolved(),
        "the next chunk still gets imported"
    );
    assert_eq!(outcome.unresolved_items(), 1);
    assert_eq!(outcome.unresolved_chunks(), 1);

    let sizes: Vec<usize> = sink.submitted_batches().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 1, 1, 2], "rounds 2 and 3 resubmit the remainder only");
}

#[tokio::test]
async fn hard_submit_error_aborts_the_remaining_chunks() {
    let store = Arc::new(MemoryBlobStore::new());
    seed_stage(&store, "dump/fatal.json", &make_items(0..6));
    let sink = Arc::new(MockWriteSink::with_plan(vec![
        Ok(Vec::new()),
        Err(fatal_write_error()),
    ]));
    let executor = import_executor(&store, &sink, 2, 10);

    let err = executor
        .import_stage("dump/fatal.json")
        .await
        .expect_err("a fatal submit failure surfaces as the per-key error");

    match err {
        ImportError::Write(write_err) => {
            assert_eq!(write_err.kind, WriteErrorKind::TableMissing)
        }
        other => panic!("expected a write error, got {other:?}"),
    }
    assert_eq!(
        sink.submitted_batches().len(),
        2,
        "the third chunk is never submitted"
    );
    assert_eq!(
        sink.accepted_items(),
        make_items(0..2),
        "chunks written before the failure stay written"
    );
}

#[tokio::test]
async fn transient_submit_failure_resubmits_the_whole_pending_set() {
    let items = make_items(0..3);
    let sink = Arc::new(MockWriteSink::with_plan(vec![
        Err(transient_write_error()),
        Ok(Vec::new()),
    ]));
    let writer = RetryingBatchWriter::new(Arc::clone(&sink), zero_delay_retry(3));

    let outcome = writer
        .write_chunk(0, &items)
        .await
        .expect("the retry should recover");

    assert_eq!(outcome.attempts, 2);
    assert!(outcome.resolved());
    assert_eq!(
        sink.submitted_batches(),
        vec![items.clone(), items],
        "nothing was accepted, so the full set goes out again"
    );
}

#[tokio::test]
async fn retryable_submit_failures_exhaust_into_an_error() {
    let items = make_items(0..3);
    let sink = Arc::new(MockWriteSink::with_plan(vec![
        Err(transient_write_error()),
        Err(transient_write_error()),
    ]));
    let writer = RetryingBatchWriter::new(Arc::clone(&sink), zero_delay_retry(2));

    let err = writer
        .write_chunk(4, &items)
        .await
        .expect_err("exhausted submits propagate the final error");

    assert_eq!(err.kind, WriteErrorKind::Throttled);
    assert_eq!(sink.submitted_batches().len(), 2);
    assert!(sink.accepted_items().is_empty());
}

#[tokio::test]
async fn missing_stage_key_is_a_per_key_error() {
    let store = Arc::new(MemoryBlobStore::new());
    let sink = Arc::new(MockWriteSink::accepting());
    let executor = import_executor(&store, &sink, 25, 10);

    let err = executor
        .import_stage("dump/missing.json")
        .await
        .expect_err("a missing blob cannot be imported");

    match err {
        ImportError::Stage(stage_err) => assert_eq!(stage_err.kind, StageErrorKind::NotFound),
        other => panic!("expected a stage error, got {other:?}"),
    }
    assert!(sink.submitted_batches().is_empty());
}

#[tokio::test]
async fn malformed_stage_payload_is_a_decode_error() {
    let store = Arc::new(MemoryBlobStore::new());
    store.insert_blob("dump/bad.json", b"{\"not\": \"an array\"".to_vec());
    let sink = Arc::new(MockWriteSink::accepting());
    let executor = import_executor(&store, &sink, 25, 10);

    let err = executor
        .import_stage("dump/bad.json")
        .await
        .expect_err("garbage payloads must not import");

    match err {
        ImportError::Stage(stage_err) => {
            assert_eq!(stage_err.kind, StageErrorKind::Decode);
            assert!(stage_err.message.contains("dump/bad.json"));
        }
        other => panic!("expected a stage error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_stage_imports_zero_chunks() {
    let store = Arc::new(MemoryBlobStore::new());
    seed_stage(&store, "dump/empty.json", &[]);
    let sink = Arc::new(MockWriteSink::accepting());
    let executor = import_executor(&store, &sink, 25, 10);

    let outcome = executor
        .import_stage("dump/empty.json")
        .await
        .expect("an empty stage is importable");

    assert_eq!(outcome.items_attempted, 0);
    assert!(outcome.chunks.is_empty());
    assert!(sink.submitted_batches().is_empty());
}
