use crate::item::{decode_items, Item};

use super::blob_store::BlobStore;
use super::types::{StageError, StageErrorKind};

/// Fetches staged payloads and decodes them back into items.
pub struct StageReader<B>
where
    B: BlobStore,
{
    blob_store: B,
}

impl<B> StageReader<B>
where
    B: BlobStore,
{
    pub fn new(blob_store: B) -> Self {
        Self { blob_store }
    }

    pub async fn read_stage(&self, key: &str) -> Result<Vec<Item>, StageError> {
        let payload = self.blob_store.get_blob(key).await?;
        decode_items(&payload).map_err(|err| {
            StageError::new(
                StageErrorKind::Decode,
                format!("staged payload {key} is not a valid item array: {err}"),
            )
        })
    }
}
