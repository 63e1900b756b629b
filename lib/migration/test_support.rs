use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::item::{decode_items, AttrValue, Item};

use super::blob_store::BlobStore;
use super::scan_source::ScanSource;
use super::types::{
    RetryPolicy, ScanCursor, ScanError, ScanErrorKind, ScanPage, SegmentDescriptor, SegmentWork,
    StageError, StageErrorKind, WriteError,
};
use super::write_sink::BatchWriteSink;

pub(super) fn zero_delay_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
        jitter: Duration::ZERO,
    }
}

pub(super) fn make_item(id: u32) -> Item {
    let mut item = Item::new();
    item.insert("pk".to_string(), AttrValue::S(format!("item-{id}")));
    item.insert("seq".to_string(), AttrValue::N(id.to_string()));
    item
}

pub(super) fn make_items(ids: std::ops::Range<u32>) -> Vec<Item> {
    ids.map(make_item).collect()
}

pub(super) fn cursor(id: u32) -> ScanCursor {
    ScanCursor(make_item(id))
}

pub(super) fn segment_work(segment_index: u32, total_segments: u32) -> SegmentWork {
    SegmentWork {
        descriptor: SegmentDescriptor {
            segment_index,
            total_segments,
        },
        resume_cursor: None,
    }
}

pub(super) fn page(items: Vec<Item>, next_cursor: Option<ScanCursor>) -> ScanPage {
    let scanned_count = items.len() as u64;
    ScanPage {
        items,
        scanned_count,
        next_cursor,
    }
}

pub(super) fn transient_scan_error() -> ScanError {
    ScanError::new(ScanErrorKind::Throttled, "scripted throttle".to_string())
}

pub(super) fn fatal_scan_error() -> ScanError {
    ScanError::new(ScanErrorKind::TableMissing, "scripted missing table".to_string())
}

/// Scan source driven by a scripted page sequence.
///
/// Records every exclusive-start cursor the executor passes so tests can assert on
/// resumption behavior.
#[derive(Default)]
pub(super) struct MockScanSource {
    pages: Mutex<VecDeque<Result<ScanPage, ScanError>>>,
    calls: Mutex<u32>,
    start_cursors: Mutex<Vec<Option<ScanCursor>>>,
}

impl MockScanSource {
    pub(super) fn with_pages(pages: Vec<Result<ScanPage, ScanError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into_iter().collect()),
            calls: Mutex::new(0),
            start_cursors: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn calls(&self) -> u32 {
        *self.calls.lock().expect("calls mutex poisoned")
    }

    pub(super) fn start_cursors(&self) -> Vec<Option<ScanCursor>> {
        self.start_cursors
            .lock()
            .expect("start_cursors mutex poisoned")
            .clone()
    }
}

impl ScanSource for MockScanSource {
    fn scan_page<'a>(
        &'a self,
        _descriptor: &'a SegmentDescriptor,
        start_after: Option<&'a ScanCursor>,
    ) -> BoxFuture<'a, Result<ScanPage, ScanError>> {
        Box::pin(async move {
            *self.calls.lock().expect("calls mutex poisoned") += 1;
            self.start_cursors
                .lock()
                .expect("start_cursors mutex poisoned")
                .push(start_after.cloned());

            self.pages
                .lock()
                .expect("pages mutex poisoned")
                .pop_front()
                .unwrap_or_else(|| {
                    Err(ScanError::new(
                        ScanErrorKind::Other,
                        "scripted pages exhausted".to_string(),
                    ))
                })
        })
    }
}

/// In-memory blob store with scripted per-put outcomes.
///
/// Puts past the end of the script succeed. Successful puts are recorded in order so
/// tests can decode what was staged.
#[derive(Default)]
pub(super) struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    put_outcomes: Mutex<VecDeque<Result<(), StageError>>>,
    put_attempts: Mutex<u32>,
    attempted: Mutex<Vec<String>>,
    puts: Mutex<Vec<(String, String)>>,
}

impl MemoryBlobStore {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn with_put_outcomes(outcomes: Vec<Result<(), StageError>>) -> Self {
        Self {
            put_outcomes: Mutex::new(outcomes.into_iter().collect()),
            ..Self::default()
        }
    }

    pub(super) fn insert_blob(&self, key: &str, payload: Vec<u8>) {
        self.blobs
            .lock()
            .expect("blobs mutex poisoned")
            .insert(key.to_string(), payload);
    }

    pub(super) fn put_attempts(&self) -> u32 {
        *self.put_attempts.lock().expect("put_attempts mutex poisoned")
    }

    /// Keys of every put attempt, failed ones included, oldest first.
    pub(super) fn attempted_keys(&self) -> Vec<String> {
        self.attempted.lock().expect("attempted mutex poisoned").clone()
    }

    /// Keys of successful puts, oldest first.
    pub(super) fn put_keys(&self) -> Vec<String> {
        self.puts
            .lock()
            .expect("puts mutex poisoned")
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub(super) fn put_content_types(&self) -> Vec<String> {
        self.puts
            .lock()
            .expect("puts mutex poisoned")
            .iter()
            .map(|(_, content_type)| content_type.clone())
            .collect()
    }

    /// Decoded item batches of successful puts, oldest first.
    pub(super) fn staged_batches(&self) -> Vec<Vec<Item>> {
        let blobs = self.blobs.lock().expect("blobs mutex poisoned");
        self.put_keys()
            .iter()
            .map(|key| {
                let payload = blobs.get(key).expect("recorded put has no payload");
                decode_items(payload).expect("staged payload must decode")
            })
            .collect()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put_blob<'a>(
        &'a self,
        key: &'a str,
        payload: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<(), StageError>> {
        Box::pin(async move {
            *self.put_attempts.lock().expect("put_attempts mutex poisoned") += 1;
            self.attempted
                .lock()
                .expect("attempted mutex poisoned")
                .push(key.to_string());

            let next = self
                .put_outcomes
                .lock()
                .expect("put_outcomes mutex poisoned")
                .pop_front()
                .unwrap_or(Ok(()));
            next?;

            self.blobs
                .lock()
                .expect("blobs mutex poisoned")
                .insert(key.to_string(), payload);
            self.puts
                .lock()
                .expect("puts mutex poisoned")
                .push((key.to_string(), content_type.to_string()));
            Ok(())
        })
    }

    fn get_blob<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, StageError>> {
        Box::pin(async move {
            self.blobs
                .lock()
                .expect("blobs mutex poisoned")
                .get(key)
                .cloned()
                .ok_or_else(|| {
                    StageError::new(StageErrorKind::NotFound, format!("no blob at {key}"))
                })
        })
    }
}

/// Write sink driven by a scripted submit plan.
///
/// Each plan entry is the unprocessed subset (or submit error) for one call; entries
/// past the end of the script accept the whole batch. Accepted items accumulate so
/// tests can assert on what actually landed.
#[derive(Default)]
pub(super) struct MockWriteSink {
    plan: Mutex<VecDeque<Result<Vec<Item>, WriteError>>>,
    submitted: Mutex<Vec<Vec<Item>>>,
    accepted: Mutex<Vec<Item>>,
}

impl MockWriteSink {
    pub(super) fn with_plan(plan: Vec<Result<Vec<Item>, WriteError>>) -> Self {
        Self {
            plan: Mutex::new(plan.into_iter().collect()),
            submitted: Mutex::new(Vec::new()),
            accepted: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn accepting() -> Self {
        Self::with_plan(Vec::new())
    }

    pub(super) fn submitted_batches(&self) -> Vec<Vec<Item>> {
        self.submitted
            .lock()
            .expect("submitted mutex poisoned")
            .clone()
    }

    pub(super) fn accepted_items(&self) -> Vec<Item> {
        self.accepted.lock().expect("accepted mutex poisoned").clone()
    }
}

impl BatchWriteSink for MockWriteSink {
    fn submit_batch<'a>(
        &'a self,
        items: &'a [Item],
    ) -> BoxFuture<'a, Result<Vec<Item>, WriteError>> {
        Box::pin(async move {
            self.submitted
                .lock()
                .expect("submitted mutex poisoned")
                .push(items.to_vec());

            let next = self
                .plan
                .lock()
                .expect("plan mutex poisoned")
                .pop_front()
                .unwrap_or(Ok(Vec::new()));

            match next {
                Ok(unprocessed) => {
                    let mut accepted = self.accepted.lock().expect("accepted mutex poisoned");
                    accepted.extend(
                        items
                            .iter()
                            .filter(|item| !unprocessed.contains(item))
                            .cloned(),
                    );
                    Ok(unprocessed)
                }
                Err(err) => Err(err),
            }
        })
    }
}
