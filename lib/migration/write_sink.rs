use std::sync::Arc;

use aws_sdk_dynamodb::types::{PutRequest, WriteRequest};
use aws_sdk_dynamodb::Client;
use futures::future::BoxFuture;

use crate::item::Item;

use super::convert::{item_from_sdk, item_to_sdk};
use super::error_mapping::{map_batch_write_error, map_write_convert_error};
use super::types::{WriteError, WriteErrorKind};

/// Submits one write chunk to the destination table.
///
/// `submit_batch` returns the store-reported unprocessed subset; an empty vec means
/// every item in the chunk was accepted. Whole-request rejections surface as errors.
pub trait BatchWriteSink: Send + Sync {
    fn submit_batch<'a>(&'a self, items: &'a [Item])
        -> BoxFuture<'a, Result<Vec<Item>, WriteError>>;
}

impl<T> BatchWriteSink for Arc<T>
where
    T: BatchWriteSink + ?Sized,
{
    fn submit_batch<'a>(
        &'a self,
        items: &'a [Item],
    ) -> BoxFuture<'a, Result<Vec<Item>, WriteError>> {
        (**self).submit_batch(items)
    }
}

/// DynamoDB-backed batch write sink used by the production import worker.
pub struct DynamoWriteSink {
    client: Client,
    table_name: String,
}

impl DynamoWriteSink {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

impl BatchWriteSink for DynamoWriteSink {
    fn submit_batch<'a>(
        &'a self,
        items: &'a [Item],
    ) -> BoxFuture<'a, Result<Vec<Item>, WriteError>> {
        Box::pin(async move {
            let mut requests = Vec::with_capacity(items.len());
            for item in items {
                let put = PutRequest::builder()
                    .set_item(Some(item_to_sdk(item).map_err(map_write_convert_error)?))
                    .build()
                    .map_err(|err| {
                        WriteError::new(
                            WriteErrorKind::Other,
                            format!("failed to build put request: {err}"),
                        )
                    })?;
                requests.push(WriteRequest::builder().put_request(put).build());
            }

            let output = self
                .client
                .batch_write_item()
                .request_items(self.table_name.clone(), requests)
                .send()
                .await
                .map_err(map_batch_write_error)?;

            let mut unprocessed = Vec::new();
            if let Some(by_table) = output.unprocessed_items() {
                if let Some(write_requests) = by_table.get(&self.table_name) {
                    for write_request in write_requests {
                        if let Some(put) = write_request.put_request() {
                            unprocessed
                                .push(item_from_sdk(put.item()).map_err(map_write_convert_error)?);
                        }
                    }
                }
            }

            Ok(unprocessed)
        })
    }
}
