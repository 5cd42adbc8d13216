use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use common::WaybillId;

use crate::Result;

/// Builds the object key for a proof-of-delivery upload.
///
/// Keys are `{waybill_id}/{unix_millis}.{ext}`, so repeated uploads for one
/// waybill never collide.
pub fn proof_key(waybill_id: WaybillId, at: DateTime<Utc>, ext: &str) -> String {
    format!("{}/{}.{}", waybill_id, at.timestamp_millis(), ext)
}

/// Blob storage for proof-of-delivery photos.
#[async_trait]
pub trait ProofStore: Send + Sync {
    /// Stores a blob under `key` and returns the public URL for it.
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String>;
}

/// In-memory proof store for testing.
#[derive(Clone, Default)]
pub struct InMemoryProofStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryProofStore {
    /// Creates a new empty proof store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored blob for a key, if any.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(key).cloned()
    }

    /// Number of stored blobs.
    pub async fn blob_count(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl ProofStore for InMemoryProofStore {
    async fn put(&self, key: &str, _content_type: &str, bytes: Vec<u8>) -> Result<String> {
        self.blobs.write().await.insert(key.to_string(), bytes);
        Ok(format!("memory://proof-of-delivery/{key}"))
    }
}
