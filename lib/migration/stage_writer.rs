use tracing::info;
use uuid::Uuid;

use crate::item::{encode_items, Item};

use super::blob_store::BlobStore;
use super::types::{StageError, StageErrorKind, StagedBlob};

/// Content type attached to every staged payload.
pub const STAGE_CONTENT_TYPE: &str = "application/json";

/// Default key prefix for staged payloads.
pub const DEFAULT_STAGE_PREFIX: &str = "dump/";

/// Writes item batches to the staging store under fresh unique keys.
pub struct StageWriter<B>
where
    B: BlobStore,
{
    blob_store: B,
    key_prefix: String,
}

impl<B> StageWriter<B>
where
    B: BlobStore,
{
    pub fn new(blob_store: B, key_prefix: impl Into<String>) -> Self {
        Self {
            blob_store,
            key_prefix: key_prefix.into(),
        }
    }

    /// Mints the `<prefix><uuid>.json` key one batch will be staged under.
    ///
    /// The random key is the only collision protection; nothing ever overwrites a
    /// blob staged under a different key.
    pub fn next_stage_key(&self) -> String {
        format!("{}{}.json", self.key_prefix, Uuid::new_v4())
    }

    /// Stages one non-empty batch under a fresh key.
    pub async fn write_stage(&self, items: &[Item]) -> Result<StagedBlob, StageError> {
        let key = self.next_stage_key();
        self.write_stage_at(&key, items).await
    }

    /// Stages one non-empty batch under `key`.
    ///
    /// Retrying callers mint the key once and pass it back in, so a repeated put
    /// targets the same blob instead of staging the batch twice.
    pub async fn write_stage_at(&self, key: &str, items: &[Item]) -> Result<StagedBlob, StageError> {
        debug_assert!(!items.is_empty(), "callers only flush non-empty batches");

        let payload = encode_items(items).map_err(|err| {
            StageError::new(
                StageErrorKind::Encode,
                format!("failed to encode stage payload: {err}"),
            )
        })?;

        self.blob_store
            .put_blob(key, payload, STAGE_CONTENT_TYPE)
            .await?;

        info!(
            event = "stage_blob_written",
            key = %key,
            item_count = items.len(),
            "staged one item batch"
        );

        Ok(StagedBlob {
            key: key.to_string(),
            item_count: items.len(),
        })
    }
}
