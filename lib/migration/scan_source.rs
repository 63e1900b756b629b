use std::sync::Arc;

use aws_sdk_dynamodb::Client;
use futures::future::BoxFuture;

use super::convert::{item_from_sdk, item_to_sdk};
use super::error_mapping::{map_scan_convert_error, map_scan_error};
use super::types::{ScanCursor, ScanError, ScanPage, SegmentDescriptor};

/// Fetches one page of a parallel segmented scan.
///
/// This trait exists so executor logic can be unit-tested against deterministic
/// scripted pages and failures without live network access.
pub trait ScanSource: Send + Sync {
    fn scan_page<'a>(
        &'a self,
        descriptor: &'a SegmentDescriptor,
        start_after: Option<&'a ScanCursor>,
    ) -> BoxFuture<'a, Result<ScanPage, ScanError>>;
}

impl<T> ScanSource for Arc<T>
where
    T: ScanSource + ?Sized,
{
    fn scan_page<'a>(
        &'a self,
        descriptor: &'a SegmentDescriptor,
        start_after: Option<&'a ScanCursor>,
    ) -> BoxFuture<'a, Result<ScanPage, ScanError>> {
        (**self).scan_page(descriptor, start_after)
    }
}

/// DynamoDB-backed scan source used by the production export worker.
pub struct DynamoScanSource {
    client: Client,
    table_name: String,
}

impl DynamoScanSource {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

impl ScanSource for DynamoScanSource {
    fn scan_page<'a>(
        &'a self,
        descriptor: &'a SegmentDescriptor,
        start_after: Option<&'a ScanCursor>,
    ) -> BoxFuture<'a, Result<ScanPage, ScanError>> {
        Box::pin(async move {
            let mut request = self
                .client
                .scan()
                .table_name(&self.table_name)
                .segment(descriptor.segment_index as i32)
                .total_segments(descriptor.total_segments as i32);

            if let Some(cursor) = start_after {
                let start_key = item_to_sdk(&cursor.0).map_err(map_scan_convert_error)?;
                request = request.set_exclusive_start_key(Some(start_key));
            }

            let output = request.send().await.map_err(map_scan_error)?;

            let items = output
                .items()
                .iter()
                .map(item_from_sdk)
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_scan_convert_error)?;
            let next_cursor = output
                .last_evaluated_key()
                .map(item_from_sdk)
                .transpose()
                .map_err(map_scan_convert_error)?
                .map(ScanCursor);
            let scanned_count = output.scanned_count().max(0) as u64;

            Ok(ScanPage {
                items,
                scanned_count,
                next_cursor,
            })
        })
    }
}
